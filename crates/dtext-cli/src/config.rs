use std::path::{Path, PathBuf};

use dtext_core::ParseOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {config_path}")]
    Read {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file at {config_path}")]
    Parse {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Loads default render options from a TOML file.
///
/// Keys match the command-line flags: `inline`, `base-url`, `domain` and
/// `disable-mentions`. Missing keys keep their defaults.
pub fn load(config_path: &Path) -> Result<ParseOptions, ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        config_path: config_path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        config_path: config_path.to_path_buf(),
        source,
    })
}
