use crate::config::schema::{PatchConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn at(self, path: &Path) -> Self {
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path.to_path_buf()),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read patch set {}: {}", path.display(), source)
            }
            ConfigError::Toml { path: Some(path), source } => {
                write!(f, "failed to parse patch set {}: {}", path.display(), source)
            }
            ConfigError::Toml { path: None, source } => {
                write!(f, "failed to parse patch set: {}", source)
            }
            ConfigError::Validation { path: Some(path), source } => {
                write!(f, "invalid patch set {}: {}", path.display(), source)
            }
            ConfigError::Validation { path: None, source } => {
                write!(f, "invalid patch set: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse and validate a patch set.
///
/// Structural problems (bad TOML, empty sequences, duplicate ids) reject the
/// whole set. A definition with an unsupported `mode` or `check` still loads:
/// it is reported here as a warning and fails on its own when applied, so the
/// rest of the set keeps working.
pub fn load_from_str(input: &str) -> Result<PatchConfig, ConfigError> {
    let config: PatchConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;

    for (id, error) in config.unusable_patches() {
        warn!(
            "Patch '{}' in set '{}' cannot be applied: {}",
            id, config.meta.name, error
        );
    }
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.at(path))
}
