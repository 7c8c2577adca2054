//! KiCad file handling.
//!
//! This module covers the small part of KiCad's formats the manager touches:
//!
//! - `sym-lib-table` / `fp-lib-table`: library registration, see [`lib_table`]
//! - `.kicad_sym`: scanned for part numbers, see [`symbols`]
//!
//! Tables are read and written through [`sexpr`]; the symbol library is only
//! scanned with a regular expression.

pub mod lib_table;
pub mod sexpr;
pub mod symbols;

pub use lib_table::{ensure_entry, project_uri, LibEntry, LibTable, TableKind, TableUpdate};
pub use sexpr::{SExpr, SExprError};
pub use symbols::scan_part_numbers;
