//! Results returned by engine operations.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::GenerationError;
use crate::kicad::TableUpdate;
use crate::manifest::ComponentEntry;

/// What `init` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// Project root.
    pub root: PathBuf,
    /// Project name.
    pub project_name: String,
    /// True if a project marker had to be created.
    pub bootstrapped: bool,
    /// Absolute library directory.
    pub lib_dir: PathBuf,
    /// Registered library name.
    pub lib_name: String,
    /// Outcome for `sym-lib-table`.
    pub symbol_table: TableUpdate,
    /// Outcome for `fp-lib-table`.
    pub footprint_table: TableUpdate,
    /// True if the ignore file was changed.
    pub ignore_updated: bool,
}

/// Result of `add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The part was generated and recorded.
    Added(ComponentEntry),
    /// The part was already tracked; nothing was done.
    AlreadyTracked,
}

/// One row of `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedComponent {
    /// Part identifier.
    pub identifier: String,
    /// Description, if known.
    pub description: Option<String>,
    /// Supplier page for the part.
    pub part_url: String,
}

/// A part `sync` could not regenerate.
#[derive(Debug)]
pub struct SyncFailure {
    /// Part identifier.
    pub identifier: String,
    /// Why generation failed.
    pub error: GenerationError,
}

/// Result of `sync`. Failures are partial success, not an error.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Identifiers generated successfully, in manifest order.
    pub succeeded: Vec<String>,
    /// Identifiers that failed, in manifest order.
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    /// Total number of entries processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns true if every entry was generated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Number of tracked entries.
    pub tracked: usize,
    /// Tracked identifiers absent from the generated library, in manifest order.
    pub missing: Vec<String>,
    /// Generated part numbers the manifest does not track, sorted.
    pub untracked: Vec<String>,
    /// Whether the library directory exists at all.
    pub lib_dir_exists: bool,
}

impl StatusReport {
    /// Returns true if the generated library matches the manifest.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.lib_dir_exists && self.missing.is_empty() && self.untracked.is_empty()
    }
}
