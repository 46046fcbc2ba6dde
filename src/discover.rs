//! Configuration source discovery.
//!
//! One invocation resolves to exactly one source, tried in a fixed order:
//! an explicit `--file` argument, then `.minicirc`, `mini-ci.json` and
//! `minici.json` in the working directory, then a `mini-ci` object inside
//! the working directory's `package.json`, and finally the user-global
//! registry file. An explicit file that does not exist prints a warning and
//! falls through to the search rather than aborting.
//!
//! Registry placement honors the `MINI_CI_HOME` environment variable before
//! the real home directory, so tests can point the whole registry at a
//! scratch directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use directories::UserDirs;
use serde_json::{Map, Value};

use crate::error::MiniCiError;
use crate::types::ConfigSource;

pub const REGISTRY_FILE_NAME: &str = ".mini-ci.json";

const SEARCH_FILE_NAMES: [&str; 4] = [".minicirc", "mini-ci.json", "minici.json", "package.json"];

/// Environment override for the directory holding the registry file.
pub const HOME_ENV_VAR: &str = "MINI_CI_HOME";

/// Location of the user-global registry file.
pub fn registry_path() -> Result<PathBuf, MiniCiError> {
    if let Some(home) = env::var_os(HOME_ENV_VAR) {
        return Ok(PathBuf::from(home).join(REGISTRY_FILE_NAME));
    }
    let dirs = UserDirs::new().ok_or(MiniCiError::NoHomeDir)?;
    Ok(dirs.home_dir().join(REGISTRY_FILE_NAME))
}

/// Pick the configuration source for this invocation.
pub fn discover(
    file_arg: Option<&Path>,
    cwd: &Path,
    registry_path: &Path,
) -> Result<ConfigSource, MiniCiError> {
    if let Some(file) = file_arg {
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            cwd.join(file)
        };
        if path.is_file() {
            return Ok(ConfigSource {
                path,
                is_root: false,
            });
        }
        eprintln!(
            "{} config file {} does not exist, falling back to the search paths",
            "[WARN]".yellow().bold(),
            path.display()
        );
    }

    for name in SEARCH_FILE_NAMES {
        let path = cwd.join(name);
        if !path.is_file() {
            continue;
        }
        // package.json only counts when it actually carries a mini-ci object.
        if name == "package.json" && !package_has_config(&path) {
            continue;
        }
        return Ok(ConfigSource {
            path,
            is_root: false,
        });
    }

    if registry_path.is_file() {
        return Ok(ConfigSource {
            path: registry_path.to_path_buf(),
            is_root: true,
        });
    }

    Err(MiniCiError::ConfigSourceNotFound)
}

fn package_has_config(path: &Path) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(value) = serde_json::from_str::<Value>(&content) else {
        return false;
    };
    value.get("mini-ci").is_some_and(Value::is_object)
}

/// Read and parse a non-root source into its raw key/value map. For
/// `package.json` the `mini-ci` object is extracted; every other source is
/// parsed as a JSON object directly (including `.minicirc`).
pub fn load_source(source: &ConfigSource) -> Result<Map<String, Value>, MiniCiError> {
    let content = fs::read_to_string(&source.path).map_err(|e| MiniCiError::Io {
        path: source.path.clone(),
        source: e,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| MiniCiError::ParseError {
        path: source.path.clone(),
        reason: e.to_string(),
    })?;

    let object = if source.path.file_name().is_some_and(|n| n == "package.json") {
        value.get("mini-ci").cloned().unwrap_or(Value::Null)
    } else {
        value
    };

    match object {
        Value::Object(map) => Ok(map),
        _ => Err(MiniCiError::ParseError {
            path: source.path.clone(),
            reason: "expected a top-level JSON object".into(),
        }),
    }
}
