//! Command-line definition.
//!
//! Every override flag is its own clap argument, including the short alias
//! spellings (hidden from help). Keeping the aliases as separate arguments
//! instead of clap aliases lets the resolution layer see exactly which
//! spellings were supplied and break ties in its own documented order.
//!
//! `OverrideArgs` serializes straight into the flag-keyed JSON map the
//! resolver consumes; absent flags become `null` and are filtered there.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Parser)]
#[command(
    name = "mini-ci",
    version,
    about = "Build, upload and preview mini-program projects from the command line"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload the project as a new development version
    Upload(ActionArgs),
    /// Generate a preview QR code for the current code
    Preview(ActionArgs),
    /// Build the project's npm dependencies
    Build(ActionArgs),
    /// Fetch the sourcemap of the latest upload
    Sourcemap(ActionArgs),
    /// Manage the user-global project registry
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ActionArgs {
    /// Configuration file to use instead of the search paths
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Registry profile to resolve against (root mode)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Per-invocation overrides, highest layer of the merge.
#[derive(Debug, Default, Args, Serialize)]
pub struct OverrideArgs {
    /// Appid of the mini-program
    #[arg(long)]
    pub appid: Option<String>,
    #[arg(long, hide = true)]
    pub id: Option<String>,

    /// Root directory of the project sources
    #[arg(long = "projectPath", value_name = "PATH")]
    #[serde(rename = "projectPath")]
    pub project_path: Option<String>,
    #[arg(long = "proPath", hide = true)]
    #[serde(rename = "proPath")]
    pub pro_path: Option<String>,

    /// Path of the upload private key
    #[arg(long = "privateKeyPath", value_name = "PATH")]
    #[serde(rename = "privateKeyPath")]
    pub private_key_path: Option<String>,
    #[arg(long = "keyPath", hide = true)]
    #[serde(rename = "keyPath")]
    pub key_path: Option<String>,

    /// Project type (miniProgram, miniProgramPlugin, miniGame, miniGamePlugin)
    #[arg(long = "type", short = 't')]
    #[serde(rename = "type")]
    pub project_type: Option<String>,

    /// Glob patterns excluded from the compiled package
    #[arg(long, value_delimiter = ',')]
    pub ignores: Option<Vec<String>>,
    #[arg(long, hide = true, value_delimiter = ',')]
    pub ig: Option<Vec<String>>,
    /// Build-only ignore patterns
    #[arg(long, hide = true, value_delimiter = ',')]
    pub igno: Option<Vec<String>>,

    /// Version string for the upload
    #[arg(long)]
    pub version: Option<String>,
    #[arg(long, hide = true)]
    pub ver: Option<String>,

    /// Mark the upload as a test version
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub test: Option<bool>,

    /// Description attached to the upload or preview
    #[arg(long, short = 'd')]
    pub desc: Option<String>,

    /// CI robot id (1-30)
    #[arg(long)]
    pub robot: Option<u8>,
    #[arg(short = 'r', hide = true)]
    pub r: Option<u8>,

    /// QR code output format: terminal, image or base64
    #[arg(long = "qrcodeFormat")]
    #[serde(rename = "qrcodeFormat")]
    pub qrcode_format: Option<String>,
    #[arg(long = "qrFormat", hide = true)]
    #[serde(rename = "qrFormat")]
    pub qr_format: Option<String>,
    #[arg(long, hide = true)]
    pub qrf: Option<String>,

    /// Where to write the generated QR code
    #[arg(long = "qrcodeOutputDest", value_name = "PATH")]
    #[serde(rename = "qrcodeOutputDest")]
    pub qrcode_output_dest: Option<String>,
    #[arg(long = "qrDest", hide = true)]
    #[serde(rename = "qrDest")]
    pub qr_dest: Option<String>,
    #[arg(long, hide = true)]
    pub qrd: Option<String>,

    /// Page the preview opens on
    #[arg(long = "pagePath")]
    #[serde(rename = "pagePath")]
    pub page_path: Option<String>,
    #[arg(long, hide = true)]
    pub pp: Option<String>,
    #[arg(short = 'p', hide = true)]
    pub p: Option<String>,

    /// Query string passed to the preview page
    #[arg(long = "searchQuery")]
    #[serde(rename = "searchQuery")]
    pub search_query: Option<String>,
    #[arg(long, hide = true)]
    pub sq: Option<String>,
    #[arg(short = 'q', hide = true)]
    pub q: Option<String>,

    /// Enable es6 transpilation
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub es6: Option<bool>,
    /// Enable es7 transpilation
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub es7: Option<bool>,
    /// Enable minification
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub minify: Option<bool>,
    /// Enable code protection
    #[arg(long = "codeProtect", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    #[serde(rename = "codeProtect")]
    pub code_protect: Option<bool>,
    /// Minify JS only
    #[arg(long = "minifyJS", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    #[serde(rename = "minifyJS")]
    pub minify_js: Option<bool>,
    /// Minify WXML only
    #[arg(long = "minifyWXML", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    #[serde(rename = "minifyWXML")]
    pub minify_wxml: Option<bool>,
    /// Minify WXSS only
    #[arg(long = "minifyWXSS", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    #[serde(rename = "minifyWXSS")]
    pub minify_wxss: Option<bool>,
    /// Auto-prefix WXSS
    #[arg(long = "autoPrefixWXSS", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    #[serde(rename = "autoPrefixWXSS")]
    pub auto_prefix_wxss: Option<bool>,

    /// Print backend progress while the operation runs
    #[arg(long = "showProgressLog", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    #[serde(rename = "showProgressLog")]
    pub show_progress_log: Option<bool>,
    #[arg(long, hide = true, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub spl: Option<bool>,
}

impl OverrideArgs {
    /// Flag-keyed map for the resolver. Absent flags serialize to `null`.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// List every stored project profile
    Ls,
    /// Show one stored profile
    Get {
        #[arg(long, short = 'n')]
        name: Option<String>,
    },
    /// Import a configuration file as a named profile
    Set {
        #[arg(long, short = 'n')]
        name: Option<String>,
        /// Configuration file to import
        #[arg(long, short = 'p', value_name = "PATH")]
        path: Option<PathBuf>,
        /// Also make this profile the default
        #[arg(long, visible_alias = "def")]
        default: bool,
    },
    /// Remove a stored profile
    Delete {
        #[arg(long, short = 'n')]
        name: String,
    },
    /// Show or change the default profile
    Default {
        #[arg(long, short = 'n')]
        name: Option<String>,
    },
    /// Write a flattened copy of a profile next to its project
    Export {
        #[arg(long, short = 'n')]
        name: Option<String>,
        /// Destination file
        #[arg(long, short = 'p', value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// Remove every stored profile
    Clear,
}
