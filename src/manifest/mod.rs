//! Project manifest (`jlcproject.toml`) handling.
//!
//! The manifest is the declarative record of which parts a project uses. It
//! holds an ordered list of [`ComponentEntry`] values, unique by identifier,
//! and the [`ProjectSettings`] that say where the generated library lives.
//!
//! Every save rewrites the whole file atomically; nothing edits it in place.

mod codec;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::{default_lib_dir, default_lib_name};
use crate::error::{ManagerError, ManagerResult};
use crate::fsutil;

/// File name of the manifest inside the project root.
pub const MANIFEST_FILE: &str = "jlcproject.toml";

/// One tracked part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentEntry {
    identifier: String,
    /// Human-readable description, if one is known.
    pub description: Option<String>,
}

impl ComponentEntry {
    /// Creates an entry. Blank descriptions are stored as `None`.
    pub fn new(identifier: impl Into<String>, description: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            description: description.filter(|d| !d.trim().is_empty()),
        }
    }

    /// The part identifier (e.g. an LCSC code such as `C194349`).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// The `[project]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSettings {
    /// Library directory relative to the project root.
    pub lib_dir: String,
    /// Library name registered in the KiCad library tables.
    pub lib_name: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            lib_dir: default_lib_dir(),
            lib_name: default_lib_name(),
        }
    }
}

/// The declarative component list of a project.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: IndexMap<String, ComponentEntry>,
    /// Project settings.
    pub settings: ProjectSettings,
}

impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.settings == other.settings && self.entries().eq(other.entries())
    }
}

impl Eq for Manifest {}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new(settings: ProjectSettings) -> Self {
        Self {
            entries: IndexMap::new(),
            settings,
        }
    }

    /// Returns the manifest path for a project root.
    #[must_use]
    pub fn path(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILE)
    }

    /// Loads the manifest of the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::NotInitialized`] if the file does not exist
    /// - [`ManagerError::ManifestCorrupt`] if it cannot be decoded
    /// - [`ManagerError::FileRead`] for other I/O failures
    pub fn load(root: &Path) -> ManagerResult<Self> {
        let path = Self::path(root);
        let text = fsutil::read_optional(&path)?.ok_or_else(|| ManagerError::NotInitialized {
            root: root.to_path_buf(),
        })?;
        let manifest = Self::parse(&text, &path)?;
        debug!(path = %path.display(), entries = manifest.len(), "Loaded manifest");
        Ok(manifest)
    }

    /// Decodes manifest text without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ManifestCorrupt`] if the text cannot be decoded.
    pub fn parse(text: &str, path: &Path) -> ManagerResult<Self> {
        codec::decode(text, path)
    }

    /// Renders the canonical file contents.
    #[must_use]
    pub fn render(&self) -> String {
        codec::encode(self)
    }

    /// Writes the manifest into the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::FileWrite`] if the file cannot be replaced.
    pub fn save(&self, root: &Path) -> ManagerResult<()> {
        let path = Self::path(root);
        fsutil::write_atomic(&path, &self.render())?;
        debug!(path = %path.display(), entries = self.len(), "Saved manifest");
        Ok(())
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::DuplicateEntry`] if the identifier is already
    /// tracked; the manifest is left unchanged.
    pub fn add_entry(&mut self, entry: ComponentEntry) -> ManagerResult<()> {
        if self.contains(entry.identifier()) {
            return Err(ManagerError::DuplicateEntry {
                identifier: entry.identifier,
            });
        }
        self.entries.insert(entry.identifier.clone(), entry);
        Ok(())
    }

    /// Removes an entry, keeping the order of the others.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::EntryNotFound`] if the identifier is not tracked.
    pub fn remove_entry(&mut self, identifier: &str) -> ManagerResult<ComponentEntry> {
        self.entries
            .shift_remove(identifier)
            .ok_or_else(|| ManagerError::EntryNotFound {
                identifier: identifier.to_string(),
            })
    }

    /// Returns true if the identifier is tracked.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Looks up an entry by identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&ComponentEntry> {
        self.entries.get(identifier)
    }

    /// Entries in the order they were added.
    pub fn entries(&self) -> impl Iterator<Item = &ComponentEntry> {
        self.entries.values()
    }

    /// Identifiers in the order they were added.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of tracked components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
