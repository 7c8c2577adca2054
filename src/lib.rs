//! kicad-jlc-manager: project-local JLC component libraries for KiCad
//!
//! This library keeps a KiCad project's JLC/LCSC parts reproducible. A
//! declarative manifest (`jlcproject.toml`) lists the parts; the generated
//! symbol, footprint and 3D model files are derived state that can be
//! rebuilt from it at any time.
//!
//! # Architecture
//!
//! - **Manifest**: ordered, unique part list plus library settings
//! - **Project**: marker discovery and the on-disk layout
//! - **KiCad tables**: idempotent `sym-lib-table` / `fp-lib-table` updates
//! - **Engine**: `init`, `add`, `list`, `sync`, `remove`, `status`
//!
//! Part files are produced by an external generator (`JLC2KiCadLib`); this
//! crate never writes symbol or footprint content itself.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`engine`] — Command driver and its collaborators
//! - [`error`] — Error types
//! - [`fsutil`] — Atomic file writes
//! - [`kicad`] — KiCad library tables and symbol inspection
//! - [`manifest`] — `jlcproject.toml` model and codec
//! - [`project`] — Project discovery and path layout

pub mod config;
pub mod engine;
pub mod error;
pub mod fsutil;
pub mod kicad;
pub mod manifest;
pub mod project;
