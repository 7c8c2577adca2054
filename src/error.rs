//! Error types for kicad-jlc-manager.
//!
//! Two families live here:
//!
//! - [`ConfigError`] for the optional user configuration file
//! - [`ManagerError`] for everything a project command can fail with
//!
//! Description lookups never produce an error; see
//! [`Lookup`](crate::engine::Lookup).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for project commands.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that can occur while managing a project library.
#[derive(Error, Debug)]
pub enum ManagerError {
    /// No `.kicad_pro` file in the start directory or any ancestor.
    #[error("no KiCad project found in {start} or its parent directories")]
    NoProjectFound {
        /// Directory the search started from.
        start: PathBuf,
    },

    /// The project has no manifest yet.
    #[error("project at {root} is not initialised (run `jlcmgr init`)")]
    NotInitialized {
        /// Project root.
        root: PathBuf,
    },

    /// `init` was run on a project that already has a manifest.
    #[error("project already initialised: {path} exists")]
    AlreadyInitialized {
        /// Path of the existing manifest.
        path: PathBuf,
    },

    /// The identifier is not tracked by the manifest.
    #[error("component {identifier} is not tracked in the manifest")]
    EntryNotFound {
        /// Identifier that was looked up.
        identifier: String,
    },

    /// The identifier is already tracked by the manifest.
    #[error("component {identifier} is already tracked in the manifest")]
    DuplicateEntry {
        /// Identifier that was added twice.
        identifier: String,
    },

    /// The identifier is empty or otherwise unusable.
    #[error("invalid component identifier: {identifier:?}")]
    InvalidIdentifier {
        /// The rejected identifier.
        identifier: String,
    },

    /// Library settings given to `init` are unusable.
    #[error("invalid project settings: {message}")]
    InvalidSettings {
        /// What is wrong with them.
        message: String,
    },

    /// The manifest file exists but could not be decoded.
    #[error("manifest {path} is corrupt: {message}")]
    ManifestCorrupt {
        /// Path to the manifest.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// The external generator could not produce a component.
    #[error("failed to generate component {identifier}: {reason}")]
    GenerationFailed {
        /// Identifier passed to the generator.
        identifier: String,
        /// Generator failure.
        #[source]
        reason: GenerationError,
    },

    /// Failed to open or read a file.
    #[error("failed to read file: {path}")]
    FileRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write file: {path}")]
    FileWrite {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to create, list or delete a directory.
    #[error("directory operation failed: {path}")]
    Directory {
        /// Path to the directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ManagerError {
    /// Creates a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a directory error.
    pub fn directory(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt manifest error.
    pub fn manifest_corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors caused by how the tool was invoked rather
    /// than by a broken environment.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NoProjectFound { .. }
                | Self::NotInitialized { .. }
                | Self::AlreadyInitialized { .. }
                | Self::EntryNotFound { .. }
                | Self::DuplicateEntry { .. }
                | Self::InvalidIdentifier { .. }
                | Self::InvalidSettings { .. }
        )
    }
}

/// Failure reported by a [`Generator`](crate::engine::Generator).
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The generator executable could not be started.
    #[error("generator `{program}` not found (install it with `pip install JLC2KiCadLib`)")]
    ToolNotFound {
        /// Program that was looked up.
        program: String,
    },

    /// The generator ran and exited unsuccessfully.
    #[error("generator exited with {status}: {stderr}")]
    Failed {
        /// Exit status as reported by the OS.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// Any other I/O failure while running the generator.
    #[error("generator I/O error")]
    Io(#[from] io::Error),
}

impl GenerationError {
    /// Returns true if retrying with the same tool cannot succeed.
    #[must_use]
    pub const fn is_tool_missing(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}
