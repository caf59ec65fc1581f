//! Defer/Diff Engine.
//!
//! Compares the current manifest against a reference one (typically the
//! last production build), works out which views depend on what changed,
//! and redirects table locations when generated DDL should read from
//! another environment.

pub mod impact;
pub mod location;
pub mod snapshot;

pub use impact::impacted_views;
pub use location::apply_location_override;
pub use snapshot::{diff, CatalogSnapshot, ChangeSet, SnapshotEntry};
