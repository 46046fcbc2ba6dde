//! The user-global profile registry behind `mini-ci config`.
//!
//! Profiles live in one JSON object at `~/.mini-ci.json`: each non-reserved
//! key maps a profile name to a fully resolved configuration snapshot, and
//! the reserved `_default` key points at the profile used when no `--name`
//! is given. The store is loaded once per process and every mutation
//! persists by rewriting the whole file (pretty-printed, 4-space indent).
//! Concurrent invocations can interleave rewrites; last writer wins.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::discover::load_source;
use crate::error::MiniCiError;
use crate::merge::flatten_profile;
use crate::resolve::{ResolveInput, resolve};
use crate::types::{ConfigOptions, ConfigSource};

/// Key holding the default profile pointer; never a profile name itself.
pub const RESERVED_KEY: &str = "_default";

const EXPORT_FILE_NAME: &str = "export-mini-ci.json";

pub struct GlobalRegistry {
    path: PathBuf,
    entries: Map<String, Value>,
}

/// One row of `config ls`.
#[derive(Debug, PartialEq)]
pub struct ProfileLine {
    pub name: String,
    pub is_default: bool,
    pub snapshot: String,
}

/// What a registry operation produced, rendered by the driver.
#[derive(Debug, PartialEq)]
pub enum RegistryOutcome {
    Listing(Vec<ProfileLine>),
    Snapshot {
        name: String,
        pretty: String,
        is_default: bool,
    },
    Stored {
        name: String,
        default: bool,
    },
    Deleted {
        name: String,
    },
    DefaultSet {
        name: String,
    },
    Exported {
        name: String,
        path: PathBuf,
    },
    Cleared,
}

impl fmt::Display for RegistryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryOutcome::Listing(lines) => {
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    let marker = if line.is_default {
                        "*".green().bold().to_string()
                    } else {
                        " ".to_string()
                    };
                    write!(f, "{} {}\n{}", marker, line.name.bold(), line.snapshot)?;
                }
                Ok(())
            }
            RegistryOutcome::Snapshot {
                name,
                pretty,
                is_default,
            } => {
                if *is_default {
                    write!(f, "{} {}\n{}", "default:".green().bold(), name.bold(), pretty)
                } else {
                    write!(f, "{}\n{}", name.bold(), pretty)
                }
            }
            RegistryOutcome::Stored { name, default } => {
                let suffix = if *default { " as the default project" } else { "" };
                write!(
                    f,
                    "{} Saved the configuration of project {}{}",
                    "[DONE]".green().bold(),
                    name.bold(),
                    suffix
                )
            }
            RegistryOutcome::Deleted { name } => write!(
                f,
                "{} Deleted the configuration of project {}",
                "[DONE]".green().bold(),
                name.bold()
            ),
            RegistryOutcome::DefaultSet { name } => write!(
                f,
                "{} The default project is now {}",
                "[DONE]".green().bold(),
                name.bold()
            ),
            RegistryOutcome::Exported { name, path } => write!(
                f,
                "{} Exported project {} to {}",
                "[DONE]".green().bold(),
                name.bold(),
                path.display()
            ),
            RegistryOutcome::Cleared => write!(
                f,
                "{} Cleared all project configurations",
                "[DONE]".green().bold()
            ),
        }
    }
}

/// Pretty-print with a 4-space indent, the store's on-disk shape.
fn pretty_json<T: Serialize>(value: &T) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    if value.serialize(&mut ser).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

impl GlobalRegistry {
    /// Open the registry, creating an empty store when the file is absent.
    pub fn load(path: &Path) -> Result<Self, MiniCiError> {
        if !path.is_file() {
            fs::write(path, "{}").map_err(|e| MiniCiError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        let content = fs::read_to_string(path).map_err(|e| MiniCiError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| MiniCiError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let Value::Object(entries) = value else {
            return Err(MiniCiError::ParseError {
                path: path.to_path_buf(),
                reason: "expected a top-level JSON object".into(),
            });
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    fn persist(&self) -> Result<(), MiniCiError> {
        fs::write(&self.path, pretty_json(&self.entries)).map_err(|e| MiniCiError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    fn default_name(&self) -> Option<&str> {
        self.entries.get(RESERVED_KEY).and_then(Value::as_str)
    }

    fn profile_names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys().filter(|k| *k != RESERVED_KEY)
    }

    fn ensure_not_empty(&self) -> Result<(), MiniCiError> {
        if self.profile_names().next().is_none() {
            return Err(MiniCiError::RegistryEmpty);
        }
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&Value, MiniCiError> {
        if name == RESERVED_KEY {
            return Err(MiniCiError::ReservedName { name: name.into() });
        }
        self.entries
            .get(name)
            .ok_or_else(|| MiniCiError::RegistryEntryNotFound { name: name.into() })
    }

    /// Root-mode synthesis: the raw map the merger resolves when the source
    /// is the registry itself. `--name` selects a profile explicitly,
    /// otherwise the default pointer is followed.
    pub fn project_config(&self, name: Option<&str>) -> Result<Map<String, Value>, MiniCiError> {
        self.ensure_not_empty()?;
        let key = match name {
            Some(name) => name.to_string(),
            None => self
                .default_name()
                .ok_or(MiniCiError::NoDefaultProfile)?
                .to_string(),
        };
        match self.entry(&key)? {
            Value::Object(map) => Ok(map.clone()),
            _ => Err(MiniCiError::RegistryEntryNotFound { name: key }),
        }
    }

    pub fn ls(&self) -> Result<RegistryOutcome, MiniCiError> {
        self.ensure_not_empty()?;
        let default = self.default_name().map(str::to_owned);
        let lines = self
            .profile_names()
            .map(|name| ProfileLine {
                name: name.clone(),
                is_default: default.as_deref() == Some(name),
                snapshot: pretty_json(&self.entries[name]),
            })
            .collect();
        Ok(RegistryOutcome::Listing(lines))
    }

    pub fn get(&self, name: Option<&str>) -> Result<RegistryOutcome, MiniCiError> {
        self.ensure_not_empty()?;
        let name = name.ok_or_else(|| MiniCiError::MissingArgument {
            hint: "Missing the project name, try 'mini-ci config get --name=projectName'".into(),
        })?;
        let value = self.entry(name)?;
        Ok(RegistryOutcome::Snapshot {
            name: name.to_string(),
            pretty: pretty_json(value),
            is_default: self.default_name() == Some(name),
        })
    }

    /// Import a project's configuration file as a named profile. The file
    /// goes through the full discovery-free resolution pipeline, so the
    /// stored snapshot is already merged and validated.
    pub fn set(
        &mut self,
        name: Option<&str>,
        path: Option<&Path>,
        make_default: bool,
        cwd: &Path,
    ) -> Result<RegistryOutcome, MiniCiError> {
        let name = name.ok_or_else(|| MiniCiError::MissingArgument {
            hint: "Missing the project name, try 'mini-ci config set --name=projectName --path=configPath'".into(),
        })?;
        let path = path.ok_or_else(|| MiniCiError::MissingArgument {
            hint: "Missing the config path, try 'mini-ci config set --name=projectName --path=configPath'".into(),
        })?;
        if name == RESERVED_KEY {
            return Err(MiniCiError::ReservedName { name: name.into() });
        }

        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        if !path.is_file() {
            return Err(MiniCiError::MissingSourceFile { path });
        }

        let source = ConfigSource {
            path,
            is_root: false,
        };
        let raw = load_source(&source)?;
        // Import with root semantics: the snapshot must not bake in
        // run-date desc strings or the manifest version of the moment.
        let config = resolve(&ResolveInput {
            raw,
            cli: Map::new(),
            is_root: true,
        })?;
        let snapshot = serde_json::to_value(&config).map_err(|e| MiniCiError::InvalidValue {
            key: name.into(),
            reason: e.to_string(),
        })?;

        self.entries.insert(name.to_string(), snapshot);
        if make_default {
            self.entries.insert(RESERVED_KEY.into(), json!(name));
        }
        self.persist()?;
        Ok(RegistryOutcome::Stored {
            name: name.to_string(),
            default: make_default,
        })
    }

    pub fn delete(&mut self, name: &str) -> Result<RegistryOutcome, MiniCiError> {
        self.ensure_not_empty()?;
        if name == RESERVED_KEY {
            return Err(MiniCiError::ReservedName { name: name.into() });
        }
        if self.entries.shift_remove(name).is_none() {
            return Err(MiniCiError::RegistryEntryNotFound { name: name.into() });
        }
        if self.default_name() == Some(name) {
            self.entries.shift_remove(RESERVED_KEY);
        }
        self.persist()?;
        Ok(RegistryOutcome::Deleted {
            name: name.to_string(),
        })
    }

    /// With a name: move the default pointer. Without: show the current
    /// default profile, like `get` on the pointer target.
    pub fn set_default(&mut self, name: Option<&str>) -> Result<RegistryOutcome, MiniCiError> {
        match name {
            Some(name) => {
                self.entry(name)?;
                if self.default_name() == Some(name) {
                    return Err(MiniCiError::AlreadyDefault { name: name.into() });
                }
                self.entries.insert(RESERVED_KEY.into(), json!(name));
                self.persist()?;
                Ok(RegistryOutcome::DefaultSet {
                    name: name.to_string(),
                })
            }
            None => {
                self.ensure_not_empty()?;
                let name = self
                    .default_name()
                    .ok_or(MiniCiError::NoDefaultProfile)?
                    .to_string();
                self.get(Some(&name))
            }
        }
    }

    /// Write the one-level flattened profile next to its project (or to an
    /// explicit destination).
    pub fn export(
        &self,
        name: Option<&str>,
        dest: Option<&Path>,
        cwd: &Path,
    ) -> Result<RegistryOutcome, MiniCiError> {
        self.ensure_not_empty()?;
        let name = match name {
            Some(name) => name.to_string(),
            None => self
                .default_name()
                .ok_or(MiniCiError::NoDefaultProfile)?
                .to_string(),
        };
        let profile: ConfigOptions = serde_json::from_value(self.entry(&name)?.clone())
            .map_err(|e| MiniCiError::InvalidValue {
                key: name.clone(),
                reason: e.to_string(),
            })?;

        let dest = match dest {
            Some(dest) if dest.is_absolute() => dest.to_path_buf(),
            Some(dest) => cwd.join(dest),
            None => profile.project.project_path.join(EXPORT_FILE_NAME),
        };
        if dest == self.path {
            return Err(MiniCiError::ExportPathConflict);
        }

        let flat = flatten_profile(&profile)?;
        fs::write(&dest, pretty_json(&flat)).map_err(|e| MiniCiError::Io {
            path: dest.clone(),
            source: e,
        })?;
        Ok(RegistryOutcome::Exported { name, path: dest })
    }

    pub fn clear(&mut self) -> Result<RegistryOutcome, MiniCiError> {
        self.entries.clear();
        self.persist()?;
        Ok(RegistryOutcome::Cleared)
    }
}
