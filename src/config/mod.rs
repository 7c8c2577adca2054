//! Configuration file loading and parsing.
//!
//! This module handles loading the optional user configuration file from
//! disk and parsing it into validated, type-safe structures. Everything has a
//! default, so the tool works without any configuration file at all.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path specified via `--config` CLI flag
//! 2. Default location:
//!    - **Linux/macOS:** `~/.kicad-jlc-manager/config.json`
//!    - **Windows:** `%USERPROFILE%\.kicad-jlc-manager\config.json`
//!
//! # Example Configuration
//!
//! ```json
//! {
//!     "generator": { "program": "JLC2KiCadLib", "args": ["--skip_existing"] },
//!     "api": { "enabled": true, "timeout_secs": 10 },
//!     "defaults": { "lib_dir": "jlclib", "lib_name": "JLC_Project" },
//!     "logging": { "level": "warn" }
//! }
//! ```

mod settings;

pub use settings::{
    default_lib_dir, default_lib_name, validate_lib_dir, ApiConfig, Config, DefaultsConfig,
    GeneratorConfig, LoggingConfig,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.kicad-jlc-manager/`
/// - **Windows:** `%USERPROFILE%\.kicad-jlc-manager\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".kicad-jlc-manager"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, the platform-specific default location is used, and a
/// missing file there yields [`Config::default`]. An explicitly requested file
/// must exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Fields are invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_dir_exists() {
        assert!(default_config_dir().is_some());
    }

    #[test]
    fn default_config_path_exists() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here/config.json")));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn explicit_file_is_parsed_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{ "defaults": { "lib_dir": "parts" } }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.defaults.lib_dir, "parts");

        std::fs::write(&path, r#"{ "defaults": { "lib_dir": "../escape" } }"#).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::ValidationError { .. })
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
