use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::user::DeletePolicy;

pub const DEFAULT_DB_PATH: &str = ".todos/todos.sqlite";
pub const DEFAULT_CONFIG_PATH: &str = ".todos/config.toml";

/// Optional settings read from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub delete_policy: Option<DeletePolicy>,
}

/// Effective settings after merging flags, environment and config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: String,
    pub delete_policy: DeletePolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Reads the config file. An explicitly named file must exist; the default
/// location is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(FileConfig::default());
            }
            default
        }
    };

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse_file_config(&raw).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

pub fn parse_file_config(raw: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(raw)
}

/// Flags (and their env vars) win over the file, the file wins over defaults.
pub fn resolve(
    db_flag: Option<String>,
    policy_flag: Option<DeletePolicy>,
    file: FileConfig,
) -> Settings {
    Settings {
        db_path: db_flag
            .or(file.db_path)
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
        delete_policy: policy_flag.or(file.delete_policy).unwrap_or_default(),
    }
}
