//! End-to-end engine tests against real project directories.
//!
//! The external generator and the description API are replaced by fakes;
//! everything else (manifest, tables, library directory) is real file I/O.

mod common;

use std::fs;

use common::{engine, files_under, kicad_project, test_temp_dir, FakeDescriptions, FakeGenerator};
use kicad_jlc_manager::engine::{AddOutcome, InitOptions};
use kicad_jlc_manager::error::ManagerError;
use kicad_jlc_manager::kicad::{LibTable, TableKind};
use kicad_jlc_manager::manifest::Manifest;

fn read(path: impl AsRef<std::path::Path>) -> String {
    fs::read_to_string(path).expect("Failed to read file")
}

#[test]
fn scenario_init_fresh_directory() {
    let dir = test_temp_dir();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());

    let report = engine.init(dir.path(), &InitOptions::default()).unwrap();
    assert!(report.bootstrapped);

    let manifest = Manifest::load(dir.path()).unwrap();
    assert!(manifest.is_empty());

    let symbols = LibTable::parse(&read(dir.path().join("sym-lib-table")), TableKind::Symbol).unwrap();
    assert_eq!(symbols.names().collect::<Vec<_>>(), ["JLC_Project"]);
    assert_eq!(
        symbols.uri_of("JLC_Project"),
        Some("${KIPRJMOD}/jlclib/symbol/jlc_project.kicad_sym")
    );

    let footprints =
        LibTable::parse(&read(dir.path().join("fp-lib-table")), TableKind::Footprint).unwrap();
    assert_eq!(footprints.names().collect::<Vec<_>>(), ["JLC_Project"]);
    assert_eq!(footprints.uri_of("JLC_Project"), Some("${KIPRJMOD}/jlclib/footprint"));

    assert!(read(dir.path().join(".gitignore")).contains("jlclib/"));
}

#[test]
fn scenario_add_with_description() {
    let dir = kicad_project();
    let engine = engine(
        FakeGenerator::default(),
        FakeDescriptions::with(&[("C194349", "10k resistor")]),
    );
    engine.init(dir.path(), &InitOptions::default()).unwrap();

    engine.add(dir.path(), "C194349").unwrap();

    let manifest = Manifest::load(dir.path()).unwrap();
    let entries: Vec<_> = manifest.entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].identifier(), "C194349");
    assert_eq!(entries[0].description(), Some("10k resistor"));
}

#[test]
fn scenario_sync_repopulates_deleted_library() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    for id in ["C1", "C2", "C3"] {
        engine.add(dir.path(), id).unwrap();
    }

    fs::remove_dir_all(dir.path().join("jlclib")).unwrap();
    let report = engine.sync(dir.path()).unwrap();

    assert!(report.failed.is_empty());
    assert_eq!(report.succeeded, ["C1", "C2", "C3"]);
    for id in ["C1", "C2", "C3"] {
        assert!(dir.path().join(format!("jlclib/footprint/{id}.kicad_mod")).is_file());
        assert!(dir.path().join(format!("jlclib/3dmodels/{id}.step")).is_file());
    }
}

#[test]
fn scenario_add_uninitialised_project() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());

    let err = engine.add(dir.path(), "C194349").unwrap_err();
    assert!(matches!(err, ManagerError::NotInitialized { .. }));
    assert_eq!(files_under(dir.path()), ["board.kicad_pro"]);
    assert_eq!(engine_calls(&engine), 0);
}

#[test]
fn add_without_any_project() {
    let dir = test_temp_dir();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());

    let err = engine.add(dir.path(), "C194349").unwrap_err();
    assert!(matches!(err, ManagerError::NoProjectFound { .. }));
    assert!(files_under(dir.path()).is_empty());
}

#[test]
fn scenario_remove_untracked() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    engine.add(dir.path(), "C1").unwrap();
    let before = read(dir.path().join("jlcproject.toml"));

    let err = engine.remove(dir.path(), "C999").unwrap_err();
    assert!(matches!(err, ManagerError::EntryNotFound { ref identifier } if identifier == "C999"));
    assert_eq!(read(dir.path().join("jlcproject.toml")), before);
}

#[test]
fn add_twice_is_idempotent() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();

    assert!(matches!(engine.add(dir.path(), "C2040").unwrap(), AddOutcome::Added(_)));
    let once = read(dir.path().join("jlcproject.toml"));
    assert_eq!(engine.add(dir.path(), "C2040").unwrap(), AddOutcome::AlreadyTracked);

    assert_eq!(read(dir.path().join("jlcproject.toml")), once);
    assert_eq!(engine_calls(&engine), 1);
}

#[test]
fn failed_add_leaves_manifest_unchanged() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::failing(&["C404"]), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    engine.add(dir.path(), "C1").unwrap();
    let before = read(dir.path().join("jlcproject.toml"));

    let err = engine.add(dir.path(), "C404").unwrap_err();
    assert!(matches!(err, ManagerError::GenerationFailed { ref identifier, .. } if identifier == "C404"));
    assert_eq!(read(dir.path().join("jlcproject.toml")), before);
}

#[test]
fn entries_keep_insertion_order() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    for id in ["C3", "C1", "C2"] {
        engine.add(dir.path(), id).unwrap();
    }
    engine.remove(dir.path(), "C1").unwrap();
    engine.add(dir.path(), "C1").unwrap();

    let listed: Vec<String> = engine
        .list(dir.path())
        .unwrap()
        .into_iter()
        .map(|c| c.identifier)
        .collect();
    assert_eq!(listed, ["C3", "C2", "C1"]);
}

#[test]
fn sync_converges() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    engine.add(dir.path(), "C1").unwrap();
    engine.add(dir.path(), "C2").unwrap();

    let lib_dir = dir.path().join("jlclib");
    fs::write(lib_dir.join("footprint/stray.kicad_mod"), "(footprint)").unwrap();
    fs::create_dir_all(lib_dir.join("leftovers")).unwrap();
    fs::write(lib_dir.join("leftovers/notes.txt"), "old").unwrap();

    engine.sync(dir.path()).unwrap();
    let first = files_under(&lib_dir);
    let first_symbols = read(lib_dir.join("symbol/jlc_project.kicad_sym"));
    assert_eq!(
        first,
        [
            "3dmodels/C1.step",
            "3dmodels/C2.step",
            "footprint/C1.kicad_mod",
            "footprint/C2.kicad_mod",
            "symbol/jlc_project.kicad_sym",
        ]
    );

    engine.sync(dir.path()).unwrap();
    assert_eq!(files_under(&lib_dir), first);
    assert_eq!(read(lib_dir.join("symbol/jlc_project.kicad_sym")), first_symbols);
}

#[test]
fn remove_then_sync_drops_generated_files() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    engine.add(dir.path(), "C1").unwrap();
    engine.add(dir.path(), "C2").unwrap();

    engine.remove(dir.path(), "C1").unwrap();
    assert!(dir.path().join("jlclib/footprint/C1.kicad_mod").exists());

    engine.sync(dir.path()).unwrap();
    let files = files_under(&dir.path().join("jlclib"));
    assert!(files.iter().all(|f| !f.contains("C1")));
    assert!(files.iter().any(|f| f.contains("C2")));
}

#[test]
fn sync_reports_partial_failure() {
    let dir = kicad_project();
    let setup = engine(FakeGenerator::default(), FakeDescriptions::default());
    setup.init(dir.path(), &InitOptions::default()).unwrap();
    for id in ["C1", "C2", "C3"] {
        setup.add(dir.path(), id).unwrap();
    }

    let flaky = engine(FakeGenerator::failing(&["C2"]), FakeDescriptions::default());
    let report = flaky.sync(dir.path()).unwrap();
    assert_eq!(report.succeeded, ["C1", "C3"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].identifier, "C2");
    assert!(!report.is_complete());
    assert_eq!(Manifest::load(dir.path()).unwrap().len(), 3);
}

#[test]
fn tables_are_stable_across_commands() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    let symbols = read(dir.path().join("sym-lib-table"));
    let footprints = read(dir.path().join("fp-lib-table"));

    engine.add(dir.path(), "C1").unwrap();
    engine.sync(dir.path()).unwrap();
    engine.sync(dir.path()).unwrap();

    assert_eq!(read(dir.path().join("sym-lib-table")), symbols);
    assert_eq!(read(dir.path().join("fp-lib-table")), footprints);
}

#[test]
fn init_keeps_foreign_table_entries() {
    let dir = kicad_project();
    fs::write(
        dir.path().join("sym-lib-table"),
        "(sym_lib_table\n  (version 7)\n  (lib (name \"Vendor\")(type \"KiCad\")(uri \"/opt/vendor.kicad_sym\")(options \"\")(descr \"Vendor parts\")(hidden))\n)\n",
    )
    .unwrap();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());

    engine.init(dir.path(), &InitOptions::default()).unwrap();

    let text = read(dir.path().join("sym-lib-table"));
    let table = LibTable::parse(&text, TableKind::Symbol).unwrap();
    assert_eq!(table.names().collect::<Vec<_>>(), ["Vendor", "JLC_Project"]);
    assert!(text.contains("(hidden)"));
}

#[test]
fn custom_lib_dir_flows_everywhere() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    let options = InitOptions {
        lib_dir: Some("libs/jlc".to_string()),
        lib_name: Some("Board_Parts".to_string()),
    };
    engine.init(dir.path(), &options).unwrap();
    engine.add(dir.path(), "C1").unwrap();

    assert!(dir.path().join("libs/jlc/footprint/C1.kicad_mod").is_file());
    let manifest = read(dir.path().join("jlcproject.toml"));
    assert!(manifest.contains("lib-dir = \"libs/jlc\""));
    assert!(manifest.contains("lib-name = \"Board_Parts\""));

    let table = LibTable::parse(&read(dir.path().join("fp-lib-table")), TableKind::Footprint).unwrap();
    assert_eq!(table.uri_of("Board_Parts"), Some("${KIPRJMOD}/libs/jlc/footprint"));
    assert!(read(dir.path().join(".gitignore")).contains("libs/jlc/"));
}

#[test]
fn sync_refuses_project_root_as_lib_dir() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    engine.add(dir.path(), "C1").unwrap();

    let manifest = dir.path().join("jlcproject.toml");
    let edited = read(&manifest).replace("lib-dir = \"jlclib\"", "lib-dir = \".\"");
    fs::write(&manifest, &edited).unwrap();
    let before = files_under(dir.path());

    let err = engine.sync(dir.path()).unwrap_err();
    assert!(matches!(err, ManagerError::ManifestCorrupt { .. }));
    assert_eq!(files_under(dir.path()), before);
    assert!(dir.path().join("board.kicad_pro").is_file());
}

#[test]
fn commands_work_from_subdirectories() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    let nested = dir.path().join("docs/notes");
    fs::create_dir_all(&nested).unwrap();

    engine.init(&nested, &InitOptions::default()).unwrap();
    engine.add(&nested, "C1").unwrap();

    assert!(dir.path().join("jlcproject.toml").is_file());
    assert!(!nested.join("jlcproject.toml").exists());
    assert_eq!(engine.list(dir.path()).unwrap().len(), 1);
}

#[test]
fn status_tracks_drift() {
    let dir = kicad_project();
    let engine = engine(FakeGenerator::default(), FakeDescriptions::default());
    engine.init(dir.path(), &InitOptions::default()).unwrap();
    engine.add(dir.path(), "C1").unwrap();
    assert!(engine.status(dir.path()).unwrap().is_in_sync());

    fs::remove_dir_all(dir.path().join("jlclib")).unwrap();
    let status = engine.status(dir.path()).unwrap();
    assert!(!status.lib_dir_exists);
    assert_eq!(status.missing, ["C1"]);

    engine.sync(dir.path()).unwrap();
    assert!(engine.status(dir.path()).unwrap().is_in_sync());
}

fn engine_calls(engine: &common::TestEngine) -> usize {
    engine.generator().call_count()
}
