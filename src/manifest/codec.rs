//! `jlcproject.toml` decoding and encoding.
//!
//! # Accepted Shapes
//!
//! Entries of the `components` array may be bare identifiers, bare
//! identifiers followed by a `# description` comment on the same line, or
//! records:
//!
//! ```toml
//! components = [
//!     "C23107",
//!     "C2040",  # RP2040 microcontroller
//!     { identifier = "C194349", description = "10k resistor" },
//! ]
//! ```
//!
//! Older files may also carry a `[components]` table mapping identifiers to
//! descriptions. All of these decode into the same [`Manifest`].
//!
//! # Written Shape
//!
//! `components` is always written first, followed by `[project]`. A root key
//! emitted after a table header would belong to that table, so the order is
//! load-bearing.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use super::{ComponentEntry, Manifest, ProjectSettings};
use crate::config::{default_lib_dir, default_lib_name, validate_lib_dir};
use crate::error::{ManagerError, ManagerResult};

/// Indentation of entries inside the `components` array.
const INDENT: &str = "    ";

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    components: Option<RawComponents>,
    #[serde(default)]
    project: RawProject,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawComponents {
    List(Vec<RawEntry>),
    Table(IndexMap<String, String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Bare(String),
    Record {
        identifier: String,
        #[serde(default)]
        description: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawProject {
    lib_dir: Option<String>,
    lib_name: Option<String>,
}

/// Decodes manifest text. `path` is only used for error messages.
pub(super) fn decode(text: &str, path: &Path) -> ManagerResult<Manifest> {
    let raw: RawManifest =
        toml::from_str(text).map_err(|e| ManagerError::manifest_corrupt(path, e.message()))?;

    let settings = ProjectSettings {
        lib_dir: raw.project.lib_dir.unwrap_or_else(default_lib_dir),
        lib_name: raw.project.lib_name.unwrap_or_else(default_lib_name),
    };
    validate_lib_dir(&settings.lib_dir)
        .map_err(|e| ManagerError::manifest_corrupt(path, format!("project.lib-dir: {e}")))?;
    if settings.lib_name.trim().is_empty() {
        return Err(ManagerError::manifest_corrupt(
            path,
            "project.lib-name must not be empty",
        ));
    }

    let pairs: Vec<(String, Option<String>)> = match raw.components {
        None => Vec::new(),
        Some(RawComponents::Table(table)) => table.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        Some(RawComponents::List(list)) => {
            let comments = comment_descriptions(text);
            list.into_iter()
                .map(|entry| match entry {
                    RawEntry::Bare(identifier) => {
                        let description = comments.get(&identifier).cloned();
                        (identifier, description)
                    }
                    RawEntry::Record {
                        identifier,
                        description,
                    } => (identifier, description),
                })
                .collect()
        }
    };

    let mut manifest = Manifest::new(settings);
    for (identifier, description) in pairs {
        if identifier.trim().is_empty() {
            return Err(ManagerError::manifest_corrupt(
                path,
                "component identifiers must not be empty",
            ));
        }
        if manifest.contains(&identifier) {
            warn!(%identifier, path = %path.display(), "Ignoring duplicate manifest entry");
            continue;
        }
        manifest
            .entries
            .insert(identifier.clone(), ComponentEntry::new(identifier, description));
    }

    Ok(manifest)
}

/// Finds `"ID",  # description` lines written by older releases.
fn comment_descriptions(text: &str) -> HashMap<String, String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^\s*"([^"\\]+)"\s*,?\s*#\s*(.*?)\s*$"#).expect("valid regex")
    });

    pattern
        .captures_iter(text)
        .filter(|c| !c[2].is_empty())
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// Encodes a manifest in its canonical form.
pub(super) fn encode(manifest: &Manifest) -> String {
    let mut out = String::new();

    if manifest.is_empty() {
        out.push_str("components = []\n");
    } else {
        out.push_str("components = [\n");
        for entry in manifest.entries() {
            match entry.description() {
                Some(description) => {
                    let _ = writeln!(
                        out,
                        "{INDENT}{{ identifier = {}, description = {} }},",
                        quote(entry.identifier()),
                        quote(description)
                    );
                }
                None => {
                    let _ = writeln!(out, "{INDENT}{},", quote(entry.identifier()));
                }
            }
        }
        out.push_str("]\n");
    }

    out.push_str("\n[project]\n");
    let _ = writeln!(out, "lib-dir = {}", quote(&manifest.settings.lib_dir));
    let _ = writeln!(out, "lib-name = {}", quote(&manifest.settings.lib_name));

    out
}

/// Renders a TOML basic string.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
