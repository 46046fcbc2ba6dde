//! Command dispatch.
//!
//! `run` is the whole control flow of one invocation: resolve the
//! configuration (or open the registry), call the backend or registry
//! operation, and hand back an [`Outcome`] for the driver to print. Nothing
//! here exits the process or prints errors; exit codes are produced in one
//! place by `main`.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use colored::Colorize;

use crate::cli::{ActionArgs, Cli, Commands, ConfigAction};
use crate::discover::{discover, load_source};
use crate::error::MiniCiError;
use crate::registry::{GlobalRegistry, RegistryOutcome};
use crate::resolve::{ResolveInput, resolve};
use crate::service::{CiBackend, ProgressEvent, ProgressStatus, Project};
use crate::types::{ConfigOptions, QrcodeFormat};

/// What one successful invocation produced.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Uploaded {
        version: Option<String>,
        robot: u8,
    },
    Previewed {
        format: QrcodeFormat,
        dest: Option<PathBuf>,
    },
    Built,
    SourcemapSaved {
        path: PathBuf,
    },
    Registry(RegistryOutcome),
    Help(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let done = "[DONE]".green().bold();
        match self {
            Outcome::Uploaded { version, robot } => {
                let version = version.as_deref().unwrap_or("(unversioned)");
                write!(f, "{done} Uploaded version {version} with robot {robot}")
            }
            Outcome::Previewed { format, dest } => match (format, dest) {
                (QrcodeFormat::Terminal, _) => {
                    write!(f, "{done} Preview ready, scan the QR code above")
                }
                (_, Some(dest)) => {
                    write!(f, "{done} Preview QR code written to {}", dest.display())
                }
                (_, None) => write!(f, "{done} Preview ready"),
            },
            Outcome::Built => write!(f, "{done} npm dependencies built"),
            Outcome::SourcemapSaved { path } => {
                write!(f, "{done} Sourcemap saved to {}", path.display())
            }
            Outcome::Registry(outcome) => outcome.fmt(f),
            Outcome::Help(text) => f.write_str(text),
        }
    }
}

fn current_dir() -> Result<PathBuf, MiniCiError> {
    env::current_dir().map_err(|e| MiniCiError::Io {
        path: PathBuf::from("."),
        source: e,
    })
}

/// Discovery plus resolution for one action command. Root mode swaps the
/// file read for a registry profile lookup.
fn resolve_config(args: &ActionArgs, registry_path: &Path) -> Result<ConfigOptions, MiniCiError> {
    let cwd = current_dir()?;
    let source = discover(args.file.as_deref(), &cwd, registry_path)?;
    let (raw, is_root) = if source.is_root {
        let registry = GlobalRegistry::load(registry_path)?;
        (registry.project_config(args.name.as_deref())?, true)
    } else {
        (load_source(&source)?, false)
    };
    resolve(&ResolveInput {
        raw,
        cli: args.overrides.to_map(),
        is_root,
    })
}

/// Progress sink for backend operations; silent unless showProgressLog is
/// on.
fn progress_printer(show: bool) -> impl FnMut(ProgressEvent) {
    move |event| {
        if !show {
            return;
        }
        let tag = match event.status {
            ProgressStatus::Doing => "[INFO]".cyan().bold(),
            ProgressStatus::Done => "[DONE]".green().bold(),
            ProgressStatus::Failed => "[ERROR]".red().bold(),
        };
        println!("{tag} {}: {}", event.id, event.message);
    }
}

fn config_help() -> String {
    let mut root = Cli::command();
    match root.find_subcommand_mut("config") {
        Some(cmd) => cmd.render_help().to_string(),
        None => root.render_help().to_string(),
    }
}

/// Execute one parsed invocation end to end.
pub fn run(
    cli: Cli,
    backend: &dyn CiBackend,
    registry_path: &Path,
) -> Result<Outcome, MiniCiError> {
    match cli.command {
        Commands::Upload(args) => {
            let config = resolve_config(&args, registry_path)?;
            let project = Project::from_config(&config.project);
            let mut progress = progress_printer(config.base.show_progress_log);
            backend.upload(&project, &config.upload, &mut progress)?;
            Ok(Outcome::Uploaded {
                version: config.upload.version,
                robot: config.upload.robot,
            })
        }
        Commands::Preview(args) => {
            let config = resolve_config(&args, registry_path)?;
            let project = Project::from_config(&config.project);
            let mut progress = progress_printer(config.base.show_progress_log);
            backend.preview(&project, &config.preview, &mut progress)?;
            Ok(Outcome::Previewed {
                format: config.preview.qrcode_format,
                dest: config.preview.qrcode_output_dest,
            })
        }
        Commands::Build(args) => {
            let config = resolve_config(&args, registry_path)?;
            let project = Project::from_config(&config.project);
            let mut progress = progress_printer(config.base.show_progress_log);
            backend.pack_npm(&project, &config.build, &mut progress)?;
            Ok(Outcome::Built)
        }
        Commands::Sourcemap(args) => {
            let config = resolve_config(&args, registry_path)?;
            let project = Project::from_config(&config.project);
            let mut progress = progress_printer(config.base.show_progress_log);
            backend.sourcemap(&project, &config.sourcemap, &mut progress)?;
            Ok(Outcome::SourcemapSaved {
                path: config.sourcemap.source_map_save_path,
            })
        }
        Commands::Config(config) => {
            let Some(action) = config.action else {
                return Ok(Outcome::Help(config_help()));
            };
            let cwd = current_dir()?;
            let mut registry = GlobalRegistry::load(registry_path)?;
            let outcome = match action {
                ConfigAction::Ls => registry.ls()?,
                ConfigAction::Get { name } => registry.get(name.as_deref())?,
                ConfigAction::Set {
                    name,
                    path,
                    default,
                } => registry.set(name.as_deref(), path.as_deref(), default, &cwd)?,
                ConfigAction::Delete { name } => registry.delete(&name)?,
                ConfigAction::Default { name } => registry.set_default(name.as_deref())?,
                ConfigAction::Export { name, path } => {
                    registry.export(name.as_deref(), path.as_deref(), &cwd)?
                }
                ConfigAction::Clear => registry.clear()?,
            };
            Ok(Outcome::Registry(outcome))
        }
    }
}
