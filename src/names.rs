//! Name normalization shared by every component.
//!
//! Three spellings of a name exist side by side:
//!
//! - the display name, exactly as the author wrote it,
//! - the lookup key ([`normalize`]): trimmed and lowercased,
//! - the identity key ([`identity_key`]): the lookup key with underscores
//!   removed, used to detect `total_revenue` / `TotalRevenue` collisions.
//!
//! Emitted SQL uses [`sql_identifier`].

/// Lookup key for tables, columns and most entities.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case- and underscore-insensitive identity key.
pub fn identity_key(name: &str) -> String {
    normalize(name).replace('_', "")
}

/// Identifier as it appears in generated DDL.
pub fn sql_identifier(name: &str) -> String {
    name.trim().to_uppercase()
}
