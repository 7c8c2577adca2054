//! Reconciliation engine.
//!
//! The engine drives every project command. It treats the manifest as the
//! source of truth and the generated library as derived state: `add` and
//! `remove` edit the manifest, `sync` rebuilds the library from it.
//!
//! Each call starts from a fresh load of the project files; the engine keeps
//! no state of its own beyond its collaborators and [`EngineSettings`].
//!
//! # Example
//!
//! ```no_run
//! use kicad_jlc_manager::config::Config;
//! use kicad_jlc_manager::engine::{CommandGenerator, Engine, EngineSettings, Offline};
//! use std::path::Path;
//!
//! let config = Config::default();
//! let engine = Engine::new(
//!     CommandGenerator::from_config(&config.generator),
//!     Offline,
//!     EngineSettings::from_config(&config),
//! );
//! let report = engine.sync(Path::new("."))?;
//! println!("{} of {} components generated", report.succeeded.len(), report.total());
//! # Ok::<(), kicad_jlc_manager::error::ManagerError>(())
//! ```

mod generator;
mod metadata;
mod report;

pub use generator::{Artifacts, CommandGenerator, GenerationTargets, Generator};
pub use metadata::{clean_description, DescriptionSource, LcscClient, Lookup, Offline};
pub use report::{
    AddOutcome, InitReport, ListedComponent, StatusReport, SyncFailure, SyncReport,
};

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{self, Config};
use crate::error::{GenerationError, ManagerError, ManagerResult};
use crate::kicad::{ensure_entry, scan_part_numbers, LibEntry, TableKind, TableUpdate};
use crate::manifest::{ComponentEntry, Manifest, ProjectSettings};
use crate::project::{bootstrap_project, ensure_ignored, find_project, Project};

/// Settings the engine needs from the user configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Library settings used by `init` when none are given.
    pub defaults: ProjectSettings,
    /// Base URL for part detail links.
    pub part_url: String,
}

impl EngineSettings {
    /// Extracts engine settings from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            defaults: ProjectSettings {
                lib_dir: config.defaults.lib_dir.clone(),
                lib_name: config.defaults.lib_name.clone(),
            },
            part_url: config.part_url.clone(),
        }
    }

    fn part_url_for(&self, identifier: &str) -> String {
        if self.part_url.ends_with('/') {
            format!("{}{identifier}", self.part_url)
        } else {
            format!("{}/{identifier}", self.part_url)
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Options for `init`. `None` falls back to [`EngineSettings::defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Library directory relative to the project root.
    pub lib_dir: Option<String>,
    /// Library name for the KiCad tables.
    pub lib_name: Option<String>,
}

/// Project command driver.
#[derive(Debug)]
pub struct Engine<G, D> {
    generator: G,
    descriptions: D,
    settings: EngineSettings,
}

impl<G: Generator, D: DescriptionSource> Engine<G, D> {
    /// Creates an engine from its collaborators.
    pub const fn new(generator: G, descriptions: D, settings: EngineSettings) -> Self {
        Self {
            generator,
            descriptions,
            settings,
        }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The generator used for `add` and `sync`.
    #[must_use]
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Sets up a project for component management.
    ///
    /// When no project is found from `start_dir`, `start_dir` itself becomes
    /// one. Creates the library skeleton, an empty manifest, both library
    /// table entries and the ignore entry.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::AlreadyInitialized`] if a manifest already exists
    /// - [`ManagerError::InvalidSettings`] for an unusable library directory
    ///   or name
    /// - I/O errors from any of the writes
    pub fn init(&self, start_dir: &Path, options: &InitOptions) -> ManagerResult<InitReport> {
        let settings = self.resolve_settings(options)?;

        let (project, bootstrapped) = match find_project(start_dir) {
            Ok(project) => (project, false),
            Err(ManagerError::NoProjectFound { .. }) => {
                let manifest_path = Manifest::path(start_dir);
                if manifest_path.exists() {
                    return Err(ManagerError::AlreadyInitialized {
                        path: manifest_path,
                    });
                }
                (bootstrap_project(start_dir)?, true)
            }
            Err(e) => return Err(e),
        };

        if project.is_initialized() {
            return Err(ManagerError::AlreadyInitialized {
                path: Manifest::path(project.root()),
            });
        }

        let project = project.with_settings(settings.clone());
        project.ensure_library_skeleton()?;
        Manifest::new(settings.clone()).save(project.root())?;
        let (symbol_table, footprint_table) = register_tables(&project)?;
        let paths = project.paths();
        let ignore_updated = ensure_ignored(&paths.ignore_file, &settings.lib_dir)?;

        info!(
            root = %project.root().display(),
            lib_dir = %settings.lib_dir,
            lib_name = %settings.lib_name,
            "Initialised project"
        );

        Ok(InitReport {
            root: project.root().to_path_buf(),
            project_name: project.name().to_string(),
            bootstrapped,
            lib_dir: paths.lib_dir,
            lib_name: settings.lib_name,
            symbol_table,
            footprint_table,
            ignore_updated,
        })
    }

    /// Generates a part and records it in the manifest.
    ///
    /// Tracking an already tracked part is a no-op. The manifest is saved
    /// only after generation succeeded.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::InvalidIdentifier`] for a blank identifier
    /// - [`ManagerError::NoProjectFound`] / [`ManagerError::NotInitialized`]
    /// - [`ManagerError::GenerationFailed`] if the generator fails; the
    ///   manifest is left untouched
    pub fn add(&self, start_dir: &Path, identifier: &str) -> ManagerResult<AddOutcome> {
        let identifier = checked_identifier(identifier)?;
        let (project, mut manifest) = open(start_dir)?;

        if manifest.contains(identifier) {
            info!(%identifier, "Component already tracked");
            return Ok(AddOutcome::AlreadyTracked);
        }

        if project.ensure_library_skeleton()? {
            warn!(
                lib_dir = %project.paths().lib_dir.display(),
                "Library directory was incomplete, recreated it"
            );
        }

        let targets = GenerationTargets::from(&project.paths());
        let artifacts = self
            .generator
            .generate(identifier, &targets)
            .map_err(|reason| ManagerError::GenerationFailed {
                identifier: identifier.to_string(),
                reason,
            })?;
        debug!(%identifier, files = artifacts.created.len(), "Generated component");

        let description = match self.descriptions.describe(identifier) {
            Lookup::Found(description) => Some(description),
            Lookup::Unavailable => {
                debug!(%identifier, "No description available");
                None
            }
        };

        let entry = ComponentEntry::new(identifier, description);
        manifest.add_entry(entry.clone())?;
        manifest.save(project.root())?;

        info!(%identifier, "Added component");
        Ok(AddOutcome::Added(entry))
    }

    /// Lists tracked parts in manifest order. Reads only.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be found or its manifest
    /// cannot be loaded.
    pub fn list(&self, start_dir: &Path) -> ManagerResult<Vec<ListedComponent>> {
        let (_, manifest) = open(start_dir)?;
        Ok(manifest
            .entries()
            .map(|entry| ListedComponent {
                identifier: entry.identifier().to_string(),
                description: entry.description.clone(),
                part_url: self.settings.part_url_for(entry.identifier()),
            })
            .collect())
    }

    /// Rebuilds the library directory from the manifest.
    ///
    /// The directory is deleted and every entry regenerated in manifest
    /// order. Per-entry failures are collected in the report. Once the
    /// generator turns out to be missing, the remaining entries are marked
    /// failed without running it again.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be loaded or the library
    /// directory or tables cannot be written. Generation failures are not
    /// errors.
    pub fn sync(&self, start_dir: &Path) -> ManagerResult<SyncReport> {
        let (project, manifest) = open(start_dir)?;
        let paths = project.paths();

        clear_dir(&paths.lib_dir)?;
        project.ensure_library_skeleton()?;

        let targets = GenerationTargets::from(&paths);
        let mut report = SyncReport::default();
        let mut missing_tool: Option<String> = None;

        for entry in manifest.entries() {
            let identifier = entry.identifier();

            if let Some(program) = &missing_tool {
                report.failed.push(SyncFailure {
                    identifier: identifier.to_string(),
                    error: GenerationError::ToolNotFound {
                        program: program.clone(),
                    },
                });
                continue;
            }

            match self.generator.generate(identifier, &targets) {
                Ok(artifacts) => {
                    debug!(%identifier, files = artifacts.created.len(), "Regenerated component");
                    report.succeeded.push(identifier.to_string());
                }
                Err(error) => {
                    warn!(%identifier, %error, "Failed to regenerate component");
                    if let GenerationError::ToolNotFound { program } = &error {
                        missing_tool = Some(program.clone());
                    }
                    report.failed.push(SyncFailure {
                        identifier: identifier.to_string(),
                        error,
                    });
                }
            }
        }

        register_tables(&project)?;

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Synchronised library"
        );
        Ok(report)
    }

    /// Stops tracking a part.
    ///
    /// Generated files stay in the library directory until the next `sync`.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::EntryNotFound`] if the part is not tracked
    /// - project and I/O errors as for [`Engine::add`]
    pub fn remove(&self, start_dir: &Path, identifier: &str) -> ManagerResult<ComponentEntry> {
        let identifier = checked_identifier(identifier)?;
        let (project, mut manifest) = open(start_dir)?;

        let entry = manifest.remove_entry(identifier)?;
        manifest.save(project.root())?;

        info!(%identifier, "Removed component");
        Ok(entry)
    }

    /// Compares the manifest with the generated symbol library. Reads only.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be loaded or the symbol library
    /// cannot be read.
    pub fn status(&self, start_dir: &Path) -> ManagerResult<StatusReport> {
        let (project, manifest) = open(start_dir)?;
        let paths = project.paths();
        let generated = scan_part_numbers(&paths.symbol_lib)?;

        let missing = manifest
            .identifiers()
            .filter(|id| !generated.contains(*id))
            .map(str::to_string)
            .collect();
        let untracked = generated
            .iter()
            .filter(|id| !manifest.contains(id))
            .cloned()
            .collect();

        Ok(StatusReport {
            tracked: manifest.len(),
            missing,
            untracked,
            lib_dir_exists: paths.lib_dir.is_dir(),
        })
    }

    fn resolve_settings(&self, options: &InitOptions) -> ManagerResult<ProjectSettings> {
        let lib_dir = options
            .lib_dir
            .as_deref()
            .map_or_else(|| self.settings.defaults.lib_dir.clone(), |d| d.trim().to_string());
        let lib_name = options
            .lib_name
            .as_deref()
            .map_or_else(|| self.settings.defaults.lib_name.clone(), |n| n.trim().to_string());

        config::validate_lib_dir(&lib_dir).map_err(|e| ManagerError::InvalidSettings {
            message: e.to_string(),
        })?;
        if lib_name.is_empty() {
            return Err(ManagerError::InvalidSettings {
                message: "library name must not be empty".to_string(),
            });
        }

        Ok(ProjectSettings { lib_dir, lib_name })
    }
}

/// Locates the project and loads its manifest.
fn open(start_dir: &Path) -> ManagerResult<(Project, Manifest)> {
    let project = find_project(start_dir)?;
    let manifest = Manifest::load(project.root())?;
    let project = project.with_settings(manifest.settings.clone());
    Ok((project, manifest))
}

fn checked_identifier(identifier: &str) -> ManagerResult<&str> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(ManagerError::InvalidIdentifier {
            identifier: identifier.to_string(),
        });
    }
    Ok(trimmed)
}

fn register_tables(project: &Project) -> ManagerResult<(TableUpdate, TableUpdate)> {
    let paths = project.paths();
    let name = &project.settings().lib_name;

    let symbol = ensure_entry(
        &paths.symbol_table,
        TableKind::Symbol,
        &LibEntry::managed(TableKind::Symbol, name, &paths.symbol_uri),
    )?;
    let footprint = ensure_entry(
        &paths.footprint_table,
        TableKind::Footprint,
        &LibEntry::managed(TableKind::Footprint, name, &paths.footprint_uri),
    )?;
    Ok((symbol, footprint))
}

/// Deletes a directory tree. A missing directory is fine.
fn clear_dir(dir: &Path) -> ManagerResult<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "Removed library directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ManagerError::directory(dir, e)),
    }
}
