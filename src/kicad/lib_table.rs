//! KiCad library tables (`sym-lib-table`, `fp-lib-table`).
//!
//! # File Format
//!
//! ```text
//! (sym_lib_table
//!   (version 7)
//!   (lib (name "JLC_Project")(type "KiCad")(uri "${KIPRJMOD}/jlclib/symbol/jlc_project.kicad_sym")(options "")(descr "Project-local JLC components"))
//! )
//! ```
//!
//! The footprint table has the same schema under `fp_lib_table`. Entries are
//! keyed by name. Entries this tool does not manage are kept as they are,
//! including fields it does not know about.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::sexpr::{SExpr, SExprError};
use crate::error::{ManagerError, ManagerResult};
use crate::fsutil;

/// Table version written into new files.
pub const TABLE_VERSION: u32 = 7;

/// Variable KiCad expands to the project directory.
pub const PROJECT_VAR: &str = "${KIPRJMOD}";

/// Fields making up the fixed record shape, in write order.
const MANAGED_FIELDS: [&str; 5] = ["name", "type", "uri", "options", "descr"];

/// Which of the two tables a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// `sym-lib-table`.
    Symbol,
    /// `fp-lib-table`.
    Footprint,
}

impl TableKind {
    /// Root list tag.
    #[must_use]
    pub const fn root_tag(self) -> &'static str {
        match self {
            Self::Symbol => "sym_lib_table",
            Self::Footprint => "fp_lib_table",
        }
    }

    /// File name inside the project root.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Symbol => "sym-lib-table",
            Self::Footprint => "fp-lib-table",
        }
    }

    /// Description written for the managed library.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Symbol => "Project-local JLC components",
            Self::Footprint => "Project-local JLC component footprints",
        }
    }
}

/// Builds a portable URI relative to the project directory.
///
/// ```
/// use kicad_jlc_manager::kicad::project_uri;
///
/// assert_eq!(project_uri("jlclib/footprint"), "${KIPRJMOD}/jlclib/footprint");
/// ```
#[must_use]
pub fn project_uri(relative: &str) -> String {
    let relative = relative.replace('\\', "/");
    let relative = relative.trim_start_matches("./").trim_start_matches('/');
    format!("{PROJECT_VAR}/{relative}")
}

/// One `(lib ...)` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibEntry {
    /// Library name as shown in KiCad.
    pub name: String,
    /// Library type tag.
    pub lib_type: String,
    /// Location of the library.
    pub uri: String,
    /// Plugin options.
    pub options: String,
    /// Description.
    pub descr: String,
}

impl LibEntry {
    /// Creates the entry this tool registers for a table kind.
    pub fn managed(kind: TableKind, name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lib_type: "KiCad".to_string(),
            uri: uri.into(),
            options: String::new(),
            descr: kind.description().to_string(),
        }
    }

    fn fields(&self) -> Vec<SExpr> {
        vec![
            SExpr::pair("name", &self.name),
            SExpr::pair("type", &self.lib_type),
            SExpr::pair("uri", &self.uri),
            SExpr::pair("options", &self.options),
            SExpr::pair("descr", &self.descr),
        ]
    }
}

/// What [`ensure_entry`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableUpdate {
    /// A new table file was written.
    Created,
    /// The entry was added to an existing table.
    Appended,
    /// An existing entry with the same name was rewritten.
    Replaced,
    /// The entry was already registered with identical values.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TableItem {
    Lib { name: String, fields: Vec<SExpr> },
    Other(SExpr),
}

/// An in-memory library table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibTable {
    kind: TableKind,
    items: Vec<TableItem>,
}

impl LibTable {
    /// Creates an empty table with a version header.
    #[must_use]
    pub fn new(kind: TableKind) -> Self {
        let version = SExpr::List(vec![
            SExpr::Atom("version".to_string()),
            SExpr::Atom(TABLE_VERSION.to_string()),
        ]);
        Self {
            kind,
            items: vec![TableItem::Other(version)],
        }
    }

    /// Parses table text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not an S-expression rooted at the
    /// kind's tag.
    pub fn parse(text: &str, kind: TableKind) -> Result<Self, SExprError> {
        let root = SExpr::parse(text)?;
        let wrong_root = || SExprError {
            offset: 0,
            message: format!("expected a ({} ...) document", kind.root_tag()),
        };
        if root.head() != Some(kind.root_tag()) {
            return Err(wrong_root());
        }
        let SExpr::List(children) = root else {
            return Err(wrong_root());
        };

        let items = children
            .into_iter()
            .skip(1)
            .map(|child| {
                if child.head() != Some("lib") {
                    return TableItem::Other(child);
                }
                let name = match &child {
                    SExpr::List(fields) => fields
                        .iter()
                        .find(|f| f.head() == Some("name"))
                        .and_then(SExpr::value_of)
                        .map(str::to_string),
                    _ => None,
                };
                match (name, child) {
                    (Some(name), SExpr::List(mut fields)) => {
                        fields.remove(0);
                        TableItem::Lib { name, fields }
                    }
                    (_, child) => TableItem::Other(child),
                }
            })
            .collect();

        Ok(Self { kind, items })
    }

    /// Names of all registered libraries, in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            TableItem::Lib { name, .. } => Some(name.as_str()),
            TableItem::Other(_) => None,
        })
    }

    /// Returns the `uri` of the named library.
    #[must_use]
    pub fn uri_of(&self, name: &str) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            TableItem::Lib { name: n, fields } if n == name => fields
                .iter()
                .find(|f| f.head() == Some("uri"))
                .and_then(SExpr::value_of),
            _ => None,
        })
    }

    /// Inserts or replaces the entry with `entry.name`.
    ///
    /// Unknown fields of an existing entry (such as `(disabled)`) are kept
    /// after the managed ones. Later entries with the same name are dropped.
    pub fn upsert(&mut self, entry: &LibEntry) -> TableUpdate {
        let mut fields = entry.fields();
        let mut outcome = TableUpdate::Appended;
        let mut position = None;

        for (index, item) in self.items.iter().enumerate() {
            if let TableItem::Lib { name, fields: old } = item {
                if *name == entry.name {
                    fields.extend(
                        old.iter()
                            .filter(|f| !f.head().is_some_and(|h| MANAGED_FIELDS.contains(&h)))
                            .cloned(),
                    );
                    outcome = if *old == fields {
                        TableUpdate::Unchanged
                    } else {
                        TableUpdate::Replaced
                    };
                    position = Some(index);
                    break;
                }
            }
        }

        let new_item = TableItem::Lib {
            name: entry.name.clone(),
            fields,
        };
        match position {
            Some(index) => {
                self.items[index] = new_item;
                let mut seen = 0;
                let before = self.items.len();
                self.items.retain(|item| match item {
                    TableItem::Lib { name, .. } if *name == entry.name => {
                        seen += 1;
                        seen == 1
                    }
                    _ => true,
                });
                if self.items.len() != before && outcome == TableUpdate::Unchanged {
                    outcome = TableUpdate::Replaced;
                }
            }
            None => self.items.push(new_item),
        }

        outcome
    }

    /// Renders the table in KiCad's layout.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "({}", self.kind.root_tag());
        for item in &self.items {
            match item {
                TableItem::Lib { fields, .. } => {
                    out.push_str("  (lib ");
                    for (i, field) in fields.iter().enumerate() {
                        if i > 0 && !matches!(field, SExpr::List(_)) {
                            out.push(' ');
                        }
                        let _ = write!(out, "{field}");
                    }
                    out.push_str(")\n");
                }
                TableItem::Other(expr) => {
                    let _ = writeln!(out, "  {expr}");
                }
            }
        }
        out.push_str(")\n");
        out
    }
}

/// Registers `entry` in the table at `table_path`.
///
/// The file is created if absent. If the named entry exists it is replaced in
/// place, otherwise appended. A file that cannot be parsed is moved aside to
/// a timestamped backup and replaced with a fresh table. The file is only
/// written when its bytes change, so repeating a call is a no-op.
///
/// # Errors
///
/// Returns an error if the file cannot be read, backed up or written.
pub fn ensure_entry(
    table_path: &Path,
    kind: TableKind,
    entry: &LibEntry,
) -> ManagerResult<TableUpdate> {
    let existing = fsutil::read_optional(table_path)?;

    let (mut table, created) = match existing.as_deref() {
        None => (LibTable::new(kind), true),
        Some(text) if text.trim().is_empty() => (LibTable::new(kind), true),
        Some(text) => match LibTable::parse(text, kind) {
            Ok(table) => (table, false),
            Err(e) => {
                let backup = backup_path(table_path);
                warn!(
                    path = %table_path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Library table is malformed, replacing it"
                );
                std::fs::copy(table_path, &backup)
                    .map_err(|e| ManagerError::file_write(&backup, e))?;
                (LibTable::new(kind), true)
            }
        },
    };

    let mut outcome = table.upsert(entry);
    if created {
        outcome = TableUpdate::Created;
    }

    let rendered = table.render();
    if existing.as_deref() == Some(rendered.as_str()) {
        debug!(path = %table_path.display(), library = %entry.name, "Library table up to date");
        return Ok(TableUpdate::Unchanged);
    }

    fsutil::write_atomic(table_path, &rendered)?;
    info!(
        path = %table_path.display(),
        library = %entry.name,
        outcome = ?outcome,
        "Updated library table"
    );
    Ok(outcome)
}

fn backup_path(table_path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S");
    let mut name = table_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let _ = write!(name, ".{stamp}.bak");
    table_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTHER_TABLE: &str = r#"(sym_lib_table
  (version 7)
  (lib (name "Other_Lib")(type "KiCad")(uri "/path/to/other.kicad_sym")(options "")(descr ""))
)
"#;

    fn jlc_entry(kind: TableKind) -> LibEntry {
        LibEntry::managed(
            kind,
            "JLC_Project",
            project_uri("jlclib/symbol/jlc_project.kicad_sym"),
        )
    }

    #[test]
    fn project_uri_is_portable() {
        assert_eq!(
            project_uri("jlclib/symbol/jlc_project.kicad_sym"),
            "${KIPRJMOD}/jlclib/symbol/jlc_project.kicad_sym"
        );
        assert_eq!(project_uri("./libs\\jlc"), "${KIPRJMOD}/libs/jlc");
    }

    #[test]
    fn new_table_renders_header() {
        let table = LibTable::new(TableKind::Footprint);
        assert_eq!(table.render(), "(fp_lib_table\n  (version 7)\n)\n");
    }

    #[test]
    fn render_matches_kicad_layout() {
        let mut table = LibTable::new(TableKind::Symbol);
        assert_eq!(table.upsert(&jlc_entry(TableKind::Symbol)), TableUpdate::Appended);
        assert_eq!(
            table.render(),
            r#"(sym_lib_table
  (version 7)
  (lib (name "JLC_Project")(type "KiCad")(uri "${KIPRJMOD}/jlclib/symbol/jlc_project.kicad_sym")(options "")(descr "Project-local JLC components"))
)
"#
        );
    }

    #[test]
    fn parse_keeps_foreign_entries() {
        let mut table = LibTable::parse(OTHER_TABLE, TableKind::Symbol).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), ["Other_Lib"]);
        // Re-rendering an untouched table reproduces the canonical text.
        assert_eq!(table.render(), OTHER_TABLE);

        table.upsert(&jlc_entry(TableKind::Symbol));
        let text = table.render();
        assert_eq!(text.matches("(lib ").count(), 2);
        assert!(text.contains("Other_Lib"));
    }

    #[test]
    fn parse_rejects_wrong_root() {
        assert!(LibTable::parse(OTHER_TABLE, TableKind::Footprint).is_err());
    }

    #[test]
    fn upsert_replaces_in_place_and_keeps_extra_fields() {
        let text = r#"(sym_lib_table
  (version 7)
  (lib (name "JLC_Project")(type "KiCad")(uri "/old/abs/path.kicad_sym")(options "")(descr "")(disabled))
  (lib (name "Other_Lib")(type "KiCad")(uri "/x")(options "")(descr ""))
)
"#;
        let mut table = LibTable::parse(text, TableKind::Symbol).unwrap();
        assert_eq!(table.upsert(&jlc_entry(TableKind::Symbol)), TableUpdate::Replaced);
        assert_eq!(table.names().collect::<Vec<_>>(), ["JLC_Project", "Other_Lib"]);
        assert_eq!(
            table.uri_of("JLC_Project"),
            Some("${KIPRJMOD}/jlclib/symbol/jlc_project.kicad_sym")
        );
        assert!(table.render().contains("(descr \"Project-local JLC components\")(disabled))"));

        assert_eq!(table.upsert(&jlc_entry(TableKind::Symbol)), TableUpdate::Unchanged);
    }

    #[test]
    fn upsert_collapses_duplicate_names() {
        let text = r#"(sym_lib_table
  (version 7)
  (lib (name "JLC_Project")(type "KiCad")(uri "a")(options "")(descr ""))
  (lib (name "JLC_Project")(type "KiCad")(uri "b")(options "")(descr ""))
)
"#;
        let mut table = LibTable::parse(text, TableKind::Symbol).unwrap();
        table.upsert(&jlc_entry(TableKind::Symbol));
        assert_eq!(table.names().count(), 1);
    }

    #[test]
    fn ensure_entry_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sym-lib-table");
        let entry = jlc_entry(TableKind::Symbol);

        assert_eq!(
            ensure_entry(&path, TableKind::Symbol, &entry).unwrap(),
            TableUpdate::Created
        );
        let first = std::fs::read(&path).unwrap();

        assert_eq!(
            ensure_entry(&path, TableKind::Symbol, &entry).unwrap(),
            TableUpdate::Unchanged
        );
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn ensure_entry_backs_up_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp-lib-table");
        std::fs::write(&path, "malformed content").unwrap();

        let entry = LibEntry::managed(
            TableKind::Footprint,
            "JLC_Project",
            project_uri("jlclib/footprint"),
        );
        assert_eq!(
            ensure_entry(&path, TableKind::Footprint, &entry).unwrap(),
            TableUpdate::Created
        );

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("(fp_lib_table"));
        assert!(text.contains("${KIPRJMOD}/jlclib/footprint"));

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(backups[0].path()).unwrap(),
            "malformed content"
        );
    }
}
