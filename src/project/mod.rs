//! KiCad project detection and path layout.
//!
//! A project is any directory containing a `.kicad_pro` file. Everything the
//! manager reads or writes is derived from the project root:
//!
//! ```text
//! <root>/
//! ├── <name>.kicad_pro          project marker
//! ├── jlcproject.toml           manifest
//! ├── sym-lib-table             symbol library table
//! ├── fp-lib-table              footprint library table
//! ├── .gitignore
//! └── jlclib/                   library directory (generated)
//!     ├── symbol/jlc_project.kicad_sym
//!     ├── footprint/
//!     └── 3dmodels/
//! ```

mod ignore;

pub use ignore::{ensure_ignored, IGNORE_COMMENT};

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info};

use crate::error::{ManagerError, ManagerResult};
use crate::fsutil;
use crate::kicad::{project_uri, TableKind};
use crate::manifest::{Manifest, ProjectSettings};

/// Extension of the project marker file.
pub const MARKER_EXTENSION: &str = "kicad_pro";

/// Symbol subdirectory of the library directory.
pub const SYMBOL_DIR: &str = "symbol";

/// Footprint subdirectory of the library directory.
pub const FOOTPRINT_DIR: &str = "footprint";

/// 3D model subdirectory of the library directory.
pub const MODEL_DIR: &str = "3dmodels";

/// File stem of the generated symbol library.
pub const SYMBOL_LIB_STEM: &str = "jlc_project";

/// Ignore file updated by `init`.
pub const IGNORE_FILE: &str = ".gitignore";

/// Contents of a freshly created, empty symbol library.
const EMPTY_SYMBOL_LIB: &str =
    "(kicad_symbol_lib (version 20210201) (generator kicad-jlc-manager)\n)\n";

/// A located KiCad project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    root: PathBuf,
    name: String,
    settings: ProjectSettings,
}

/// Every path the manager uses, derived from a [`Project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// `jlcproject.toml`.
    pub manifest: PathBuf,
    /// Library directory.
    pub lib_dir: PathBuf,
    /// Symbol subdirectory.
    pub symbol_dir: PathBuf,
    /// Generated symbol library file.
    pub symbol_lib: PathBuf,
    /// Footprint subdirectory.
    pub footprint_dir: PathBuf,
    /// 3D model subdirectory.
    pub model_dir: PathBuf,
    /// `sym-lib-table`.
    pub symbol_table: PathBuf,
    /// `fp-lib-table`.
    pub footprint_table: PathBuf,
    /// `.gitignore`.
    pub ignore_file: PathBuf,
    /// Portable URI of the symbol library.
    pub symbol_uri: String,
    /// Portable URI of the footprint directory.
    pub footprint_uri: String,
}

impl Project {
    /// Creates a project with default library settings.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            settings: ProjectSettings::default(),
        }
    }

    /// Replaces the library settings, typically with those from the manifest.
    #[must_use]
    pub fn with_settings(mut self, settings: ProjectSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Absolute project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project name (marker file stem).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Library settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Returns true if the project has a manifest.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        Manifest::path(&self.root).is_file()
    }

    /// Derives all paths. Performs no I/O.
    #[must_use]
    pub fn paths(&self) -> ProjectPaths {
        let lib_rel = self.settings.lib_dir.trim_end_matches(['/', '\\']);
        let lib_dir = self.root.join(lib_rel);
        let symbol_dir = lib_dir.join(SYMBOL_DIR);
        let symbol_file = format!("{SYMBOL_LIB_STEM}.kicad_sym");

        ProjectPaths {
            manifest: Manifest::path(&self.root),
            symbol_lib: symbol_dir.join(&symbol_file),
            footprint_dir: lib_dir.join(FOOTPRINT_DIR),
            model_dir: lib_dir.join(MODEL_DIR),
            symbol_dir,
            lib_dir,
            symbol_table: self.root.join(TableKind::Symbol.file_name()),
            footprint_table: self.root.join(TableKind::Footprint.file_name()),
            ignore_file: self.root.join(IGNORE_FILE),
            symbol_uri: project_uri(&format!("{lib_rel}/{SYMBOL_DIR}/{symbol_file}")),
            footprint_uri: project_uri(&format!("{lib_rel}/{FOOTPRINT_DIR}")),
        }
    }

    /// Creates the library directory skeleton where missing.
    ///
    /// Returns true if anything was created.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the empty symbol library cannot be
    /// created.
    pub fn ensure_library_skeleton(&self) -> ManagerResult<bool> {
        let paths = self.paths();
        let mut created = false;

        for dir in [&paths.symbol_dir, &paths.footprint_dir, &paths.model_dir] {
            if !dir.is_dir() {
                std::fs::create_dir_all(dir).map_err(|e| ManagerError::directory(dir, e))?;
                created = true;
            }
        }

        if !paths.symbol_lib.exists() {
            fsutil::write_atomic(&paths.symbol_lib, EMPTY_SYMBOL_LIB)?;
            created = true;
        }

        if created {
            debug!(lib_dir = %paths.lib_dir.display(), "Created library skeleton");
        }
        Ok(created)
    }
}

/// Finds the project containing `start_dir`.
///
/// Searches `start_dir` and then each ancestor for a `.kicad_pro` file. When a
/// directory holds several, the alphabetically first one names the project.
///
/// # Errors
///
/// - [`ManagerError::NoProjectFound`] if no ancestor holds a marker
/// - [`ManagerError::Directory`] if `start_dir` cannot be resolved
pub fn find_project(start_dir: &Path) -> ManagerResult<Project> {
    let start = start_dir
        .canonicalize()
        .map_err(|e| ManagerError::directory(start_dir, e))?;

    for dir in start.ancestors() {
        if let Some(marker) = find_marker(dir) {
            let name = marker
                .file_stem()
                .map_or_else(|| "unknown".to_string(), |s| s.to_string_lossy().into_owned());
            debug!(root = %dir.display(), marker = %marker.display(), "Found KiCad project");
            return Ok(Project::new(dir, name));
        }
    }

    Err(ManagerError::NoProjectFound { start })
}

fn find_marker(dir: &Path) -> Option<PathBuf> {
    let pattern = format!(
        "{}/*.{MARKER_EXTENSION}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let mut markers: Vec<PathBuf> = glob::glob(&pattern)
        .ok()?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    markers.sort();
    markers.into_iter().next()
}

/// Turns `dir` into a project by writing a minimal marker file.
///
/// The project is named after the directory.
///
/// # Errors
///
/// Returns an error if `dir` cannot be resolved or the marker cannot be
/// written.
pub fn bootstrap_project(dir: &Path) -> ManagerResult<Project> {
    let root = dir
        .canonicalize()
        .map_err(|e| ManagerError::directory(dir, e))?;
    let name = root
        .file_name()
        .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned());

    let file_name = format!("{name}.{MARKER_EXTENSION}");
    let marker = root.join(&file_name);
    let contents = json!({
        "meta": {
            "filename": file_name,
            "version": 1,
        }
    });
    let text = serde_json::to_string_pretty(&contents)
        .map_err(|e| ManagerError::file_write(&marker, std::io::Error::other(e)))?;
    fsutil::write_atomic(&marker, &(text + "\n"))?;

    info!(marker = %marker.display(), "Created KiCad project marker");
    Ok(Project::new(root, name))
}
