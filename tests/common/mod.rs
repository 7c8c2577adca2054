//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use kicad_jlc_manager::engine::{
    Artifacts, DescriptionSource, Engine, EngineSettings, GenerationTargets, Generator, Lookup,
};
use kicad_jlc_manager::error::GenerationError;
use tempfile::TempDir;

/// Creates a temporary directory inside `.tmp/` for test isolation.
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
///
/// Converts to an absolute path to avoid issues with parallel test execution.
pub fn test_temp_dir() -> TempDir {
    let tmp_root = Path::new(".tmp");
    fs::create_dir_all(tmp_root).expect("Failed to create .tmp directory");
    let tmp_root = tmp_root
        .canonicalize()
        .expect("Failed to canonicalize .tmp path");
    tempfile::tempdir_in(&tmp_root).expect("Failed to create temp dir")
}

/// Creates a temporary directory holding a `board.kicad_pro` marker.
pub fn kicad_project() -> TempDir {
    let dir = test_temp_dir();
    fs::write(dir.path().join("board.kicad_pro"), "{}\n").expect("Failed to write marker");
    dir
}

/// Generator that writes one symbol and one footprint per part.
#[derive(Default)]
pub struct FakeGenerator {
    pub calls: RefCell<Vec<String>>,
    pub failing: HashSet<String>,
}

impl FakeGenerator {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Generator for FakeGenerator {
    fn generate(
        &self,
        identifier: &str,
        targets: &GenerationTargets,
    ) -> Result<Artifacts, GenerationError> {
        self.calls.borrow_mut().push(identifier.to_string());
        if self.failing.contains(identifier) {
            return Err(GenerationError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("{identifier}: component not found"),
            });
        }

        let symbol_lib = targets
            .symbol_dir
            .join(format!("{}.kicad_sym", targets.symbol_lib));
        let mut text = fs::read_to_string(&symbol_lib).unwrap_or_default();
        text.push_str(&format!(
            "  (symbol \"{identifier}\" (property \"LCSC\" \"{identifier}\"))\n"
        ));
        fs::write(&symbol_lib, text)?;

        let footprint = targets.footprint_dir.join(format!("{identifier}.kicad_mod"));
        let model = targets.model_dir.join(format!("{identifier}.step"));
        fs::write(&footprint, format!("(footprint \"{identifier}\")\n"))?;
        fs::write(&model, "ISO-10303-21;\n")?;

        Ok(Artifacts {
            created: vec![footprint, model],
        })
    }
}

/// Description source backed by a fixed table.
#[derive(Default)]
pub struct FakeDescriptions(pub HashMap<String, String>);

impl FakeDescriptions {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(id, d)| ((*id).to_string(), (*d).to_string()))
                .collect(),
        )
    }
}

impl DescriptionSource for FakeDescriptions {
    fn describe(&self, identifier: &str) -> Lookup {
        self.0
            .get(identifier)
            .map_or(Lookup::Unavailable, |d| Lookup::Found(d.clone()))
    }
}

pub type TestEngine = Engine<FakeGenerator, FakeDescriptions>;

pub fn engine(generator: FakeGenerator, descriptions: FakeDescriptions) -> TestEngine {
    Engine::new(generator, descriptions, EngineSettings::default())
}

/// Lists every file below `dir`, relative to it, sorted.
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(relative) = path.strip_prefix(dir) {
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    files.sort();
    files
}
