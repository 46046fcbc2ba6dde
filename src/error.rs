use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MiniCiError {
    #[error("The config file was not found, please try again after configuration")]
    ConfigSourceNotFound,

    #[error("The project path must be configured")]
    ProjectPathMissing,

    #[error("The configured projectPath {path} does not exist")]
    ProjectPathNotFound { path: PathBuf },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project configuration is empty, please try again after configuration")]
    RegistryEmpty,

    #[error("There is no {name} project in the configuration")]
    RegistryEntryNotFound { name: String },

    #[error("There is no default project configuration")]
    NoDefaultProfile,

    #[error("The default project is already {name}")]
    AlreadyDefault { name: String },

    #[error("{hint}")]
    MissingArgument { hint: String },

    #[error("{name} is reserved and cannot be used as a profile name")]
    ReservedName { name: String },

    #[error("Project configuration file does not exist, the path is: {path}")]
    MissingSourceFile { path: PathBuf },

    #[error("The export path can't be the same as the registry file")]
    ExportPathConflict,

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("{message}")]
    ExternalOperation { message: String },

    #[error("Could not locate the user home directory")]
    NoHomeDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_path_not_found_names_the_path() {
        let err = MiniCiError::ProjectPathNotFound {
            path: "/tmp/missing".into(),
        };
        assert!(err.to_string().contains("/tmp/missing"));
    }

    #[test]
    fn registry_entry_not_found_names_the_profile() {
        let err = MiniCiError::RegistryEntryNotFound {
            name: "proj1".into(),
        };
        assert!(err.to_string().contains("proj1"));
    }

    #[test]
    fn missing_argument_surfaces_its_hint() {
        let err = MiniCiError::MissingArgument {
            hint: "try 'mini-ci config set --name=projectName'".into(),
        };
        assert!(err.to_string().contains("config set"));
    }
}
