//! Derives store identifiers from client filenames.
//!
//! Identifiers look like `<base>_<millis>` for images and
//! `<base>_<millis>.<ext>` for raw files. The store appends a matching
//! extension on image delivery by itself, but never does so for raw files,
//! so raw identifiers must carry it.

use crate::models::stored_object::ResourceKind;

/// Used when the client sends no usable filename.
pub const FALLBACK_FILENAME: &str = "file";

/// A client filename split into its sanitized parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameParts {
    pub base: String,
    /// Extension without the leading dot; empty when there is none.
    pub extension: String,
}

/// Split `filename` into base and extension.
///
/// Only the last path component is kept. A leading dot (`.env`) or a
/// trailing dot (`notes.`) does not start an extension.
pub fn split_filename(filename: &str) -> FilenameParts {
    let name = last_component(filename);
    if name.is_empty() {
        return FilenameParts {
            base: FALLBACK_FILENAME.to_string(),
            extension: String::new(),
        };
    }

    let (base, extension) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos + 1..]),
        _ => (name, ""),
    };
    let base = base.trim_end_matches('.');

    FilenameParts {
        base: sanitize(if base.is_empty() { FALLBACK_FILENAME } else { base }),
        extension: sanitize(extension),
    }
}

/// Last path component of a client filename, trimmed. Browsers on some
/// platforms send the full local path.
pub fn last_component(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
}

/// Build the namespace-relative identifier for an upload.
pub fn derive_identifier(filename: &str, kind: ResourceKind, timestamp_millis: i64) -> String {
    let parts = split_filename(filename);
    let mut identifier = format!("{}_{}", parts.base, timestamp_millis);
    if kind == ResourceKind::Raw && !parts.extension.is_empty() {
        identifier.push('.');
        identifier.push_str(&parts.extension);
    }
    identifier
}

/// Prefix an identifier with its namespace folder.
pub fn qualify(namespace: &str, identifier: &str) -> String {
    let namespace = namespace.trim_matches('/');
    if namespace.is_empty() {
        identifier.to_string()
    } else {
        format!("{}/{}", namespace, identifier)
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
