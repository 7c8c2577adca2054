//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::{Component, Path};

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// External generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Part metadata API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Defaults applied by `init` when no CLI option is given.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Base URL for the part detail links shown by `list --detailed`.
    #[serde(default = "default_part_url")]
    pub part_url: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            generator: GeneratorConfig::default(),
            api: ApiConfig::default(),
            defaults: DefaultsConfig::default(),
            part_url: default_part_url(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generator.program.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "generator.program must not be empty".to_string(),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "api.timeout_secs must be greater than zero".to_string(),
            });
        }

        validate_lib_dir(&self.defaults.lib_dir)?;

        if self.defaults.lib_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "defaults.lib_name must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Checks that a library directory is a plain relative path inside the project.
///
/// # Errors
///
/// Returns an error for empty, absolute or parent-escaping paths, and for
/// paths using `.` that could resolve to the project root itself.
pub fn validate_lib_dir(lib_dir: &str) -> Result<(), ConfigError> {
    let path = Path::new(lib_dir);
    // `sync` deletes this directory, so it must name a real subdirectory.
    let inside_project = !lib_dir.trim().is_empty()
        && path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)));

    if inside_project {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: format!(
                "Invalid library directory '{lib_dir}'. Must be a relative path inside the project"
            ),
        })
    }
}

/// External component generator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Executable name or path.
    /// Default: "`JLC2KiCadLib`"
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments appended after the fixed ones.
    #[serde(default = "default_generator_args")]
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_generator_args(),
        }
    }
}

fn default_program() -> String {
    "JLC2KiCadLib".to_string()
}

fn default_generator_args() -> Vec<String> {
    vec!["--skip_existing".to_string()]
}

/// Part metadata API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Fetch descriptions when adding components.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Product detail endpoint; the part number is passed as `productCode`.
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://wmsc.lcsc.com/ftps/wm/product/detail".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

/// Project defaults used by `init`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Library directory relative to the project root.
    #[serde(default = "default_lib_dir")]
    pub lib_dir: String,

    /// Library name registered in the library tables.
    #[serde(default = "default_lib_name")]
    pub lib_name: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lib_dir: default_lib_dir(),
            lib_name: default_lib_name(),
        }
    }
}

/// Default library directory name.
#[must_use]
pub fn default_lib_dir() -> String {
    "jlclib".to_string()
}

/// Default library display name.
#[must_use]
pub fn default_lib_name() -> String {
    "JLC_Project".to_string()
}

fn default_part_url() -> String {
    "https://jlcpcb.com/partdetail/".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
