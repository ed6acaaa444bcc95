//! Canonicalization of free-text account and customer names.
//!
//! Two names normalize equal iff they are treated as the same account for
//! duplicate detection and cross-batch identity.

const LEGAL_SUFFIXES: &[&str] = &["inc.", "inc", "llc"];

const GARBAGE_NAMES: &[&str] = &["n/a", "tbd", "unknown", "test", "null", "undefined"];

/// Canonical form: lowercased, trailing legal-entity suffix stripped,
/// whitespace runs collapsed to a single space, trimmed.
pub fn normalize(name: &str) -> String {
    let mut canonical = collapse_whitespace(&name.to_lowercase());
    for suffix in LEGAL_SUFFIXES {
        if let Some(stripped) = canonical.strip_suffix(suffix) {
            canonical = stripped.trim_end().to_string();
            break;
        }
    }
    canonical
}

/// Rejects identifiers that must never form a duplicate-detection group or
/// a reporting row: empty strings, pure-numeric or pure-symbol strings, and
/// a fixed denylist of placeholder values.
pub fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return false;
    }
    if !trimmed.chars().any(|c| c.is_alphabetic()) {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    !GARBAGE_NAMES.contains(&lowered.as_str())
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
