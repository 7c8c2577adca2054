//! External component generator.
//!
//! The manager never writes symbol, footprint or model files itself. It hands
//! a part identifier and the library directory to a [`Generator`]; the
//! production implementation runs `JLC2KiCadLib`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace};

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::project::{ProjectPaths, SYMBOL_LIB_STEM};

/// Longest stderr excerpt kept in a [`GenerationError::Failed`].
const MAX_STDERR_LEN: usize = 400;

/// Where generated files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTargets {
    /// Library directory root.
    pub lib_dir: PathBuf,
    /// Symbol subdirectory.
    pub symbol_dir: PathBuf,
    /// Footprint subdirectory.
    pub footprint_dir: PathBuf,
    /// 3D model subdirectory.
    pub model_dir: PathBuf,
    /// Stem of the symbol library file inside `symbol_dir`.
    pub symbol_lib: String,
}

impl From<&ProjectPaths> for GenerationTargets {
    fn from(paths: &ProjectPaths) -> Self {
        Self {
            lib_dir: paths.lib_dir.clone(),
            symbol_dir: paths.symbol_dir.clone(),
            footprint_dir: paths.footprint_dir.clone(),
            model_dir: paths.model_dir.clone(),
            symbol_lib: SYMBOL_LIB_STEM.to_string(),
        }
    }
}

/// Files produced by one generator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    /// Files that did not exist before the run.
    pub created: Vec<PathBuf>,
}

/// Produces library files for a part.
pub trait Generator {
    /// Generates symbol, footprint and model files for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the part could not be generated. No partial
    /// output guarantees are made.
    fn generate(
        &self,
        identifier: &str,
        targets: &GenerationTargets,
    ) -> Result<Artifacts, GenerationError>;
}

impl<G: Generator + ?Sized> Generator for &G {
    fn generate(
        &self,
        identifier: &str,
        targets: &GenerationTargets,
    ) -> Result<Artifacts, GenerationError> {
        (**self).generate(identifier, targets)
    }
}

/// Runs an external generator program.
///
/// The command line is
/// `<program> <identifier> -dir <lib_dir> -symbol_lib <stem> <args...>`.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Creates a generator for `program` with extra trailing arguments.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Creates a generator from configuration.
    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn command(&self, identifier: &str, targets: &GenerationTargets) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(identifier)
            .arg("-dir")
            .arg(&targets.lib_dir)
            .arg("-symbol_lib")
            .arg(&targets.symbol_lib)
            .args(&self.args);
        command
    }
}

impl Generator for CommandGenerator {
    fn generate(
        &self,
        identifier: &str,
        targets: &GenerationTargets,
    ) -> Result<Artifacts, GenerationError> {
        let before = snapshot(&targets.lib_dir);
        debug!(program = %self.program, %identifier, "Running generator");

        let output = match self.command(identifier, targets).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GenerationError::ToolNotFound {
                    program: self.program.clone(),
                });
            }
            Err(e) => return Err(GenerationError::Io(e)),
        };

        trace!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            "Generator output"
        );

        if !output.status.success() {
            return Err(GenerationError::Failed {
                status: output.status.to_string(),
                stderr: excerpt(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        let created = snapshot(&targets.lib_dir)
            .difference(&before)
            .cloned()
            .collect();
        Ok(Artifacts { created })
    }
}

/// Lists every file below `dir`.
fn snapshot(dir: &Path) -> BTreeSet<PathBuf> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
    glob::glob(&pattern)
        .map(|paths| paths.filter_map(Result::ok).filter(|p| p.is_file()).collect())
        .unwrap_or_default()
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= MAX_STDERR_LEN {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_STDERR_LEN).collect();
    cut.push_str("...");
    cut
}
