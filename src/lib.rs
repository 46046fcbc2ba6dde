//! Configuration layer and CLI for driving mini-program CI operations
//! (build, upload, preview, sourcemap) from the command line.
//!
//! A single invocation resolves one configuration from four layers, later
//! layers winning key-by-key:
//!
//! ```text
//! built-in defaults
//!   ⊕ manifest-derived defaults   (project.config.json, package.json)
//!   ⊕ configuration file          (compacted first: falsy values drop out)
//!   ⊕ CLI overrides
//! ```
//!
//! The file layer comes from the first source found among an explicit
//! `--file`, `.minicirc` / `mini-ci.json` / `minici.json` in the working
//! directory, a `mini-ci` object in `package.json`, or the user-global
//! registry `~/.mini-ci.json`. The registry doubles as a profile store
//! managed by `mini-ci config`: named, fully resolved snapshots plus a
//! default-profile pointer, so any directory can run CI operations against
//! a registered project.
//!
//! Resolution itself is pure ([`resolve::resolve`] over a
//! [`resolve::ResolveInput`]); file discovery, the registry and the
//! external toolchain sit behind their own modules and the
//! [`service::CiBackend`] trait.

pub mod aliases;
pub mod cli;
pub mod commands;
pub mod defaults;
pub mod discover;
pub mod error;
pub mod merge;
pub mod registry;
pub mod resolve;
pub mod service;
pub mod types;

pub use cli::Cli;
pub use commands::{Outcome, run};
pub use error::MiniCiError;
pub use registry::GlobalRegistry;
pub use resolve::{ResolveInput, resolve};
pub use types::{ConfigOptions, ConfigSource};
