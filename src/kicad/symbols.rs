//! Read-only inspection of the generated symbol library.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ManagerResult;
use crate::fsutil;

/// Collects the part numbers recorded in a `.kicad_sym` file.
///
/// The generator stores the LCSC code of every symbol in a property such as
/// `(property "LCSC" "C194349" ...)`. A missing file yields an empty set.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn scan_part_numbers(symbol_lib: &Path) -> ManagerResult<BTreeSet<String>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#"\(property\s+"(?:LCSC|JLCPCB|JLC)[^"]*"\s+"([^"]+)""#).expect("valid regex")
    });

    let Some(text) = fsutil::read_optional(symbol_lib)? else {
        return Ok(BTreeSet::new());
    };

    Ok(pattern
        .captures_iter(&text)
        .map(|c| c[1].trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}
