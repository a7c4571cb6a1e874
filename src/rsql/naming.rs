//! Field-name mapping shared by every backend.
//!
//! Filter identifiers and sort fields are written in the callers' camelCase;
//! stored columns and document fields are snake_case. Both compilers run
//! names through [`as_storage_name`] so one filter means the same thing on
//! either store.

use crate::error::{Result, StorageError};

/// Convert a camelCase, dot-separated name to its stored snake_case form.
///
/// An underscore is inserted before each uppercase letter once any
/// non-underscore character has been seen, the result is lowercased, a
/// `._` sequence collapses to `.` and one leading underscore is dropped.
pub fn as_storage_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    let mut seen_non_underscore = false;
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() && seen_non_underscore {
            out.push('_');
        }
        if c != '_' {
            seen_non_underscore = true;
        }
        out.push(c);
    }

    let lowered = out.to_lowercase().replace("._", ".");
    match lowered.strip_prefix('_') {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Prefix of every relation table/collection. Keeps relation targets apart
/// from the fixed tables whatever the aggregate type is called.
pub const RELATION_TARGET_PREFIX: &str = "rel_";

/// Physical table/collection name for per-aggregate-type targets.
///
/// Rejects anything that is not a plain identifier after mapping, since the
/// result is spliced into DDL.
pub fn as_target_name(aggregate_type: &str) -> Result<String> {
    let name = as_storage_name(aggregate_type).replace('.', "_");
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(format!("{RELATION_TARGET_PREFIX}{name}"))
    } else {
        Err(StorageError::InvalidTargetName(aggregate_type.to_string()))
    }
}
