//! Identifier utilities

use uuid::Uuid;

/// Generate a new opaque identifier (UUIDv4, hyphenated)
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Use the caller's identifier unless it is blank
pub fn or_generate(candidate: Option<&str>) -> String {
    match candidate.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate(),
    }
}
