//! # semview
//!
//! A semantic metadata compiler: validates dbt-style table metadata and
//! semantic definitions, then emits Snowflake `CREATE SEMANTIC VIEW` DDL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   manifest.json + per-table metadata YAML                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [catalog]
//! ┌─────────────────────────────────────────────────────────┐
//! │   CatalogIndex            DefinitionSet  ◄── [definitions]
//! │   (tables, columns)       (metrics, relationships, ...)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolver] {{ table() }} {{ metric() }} ...
//! ┌─────────────────────────────────────────────────────────┐
//! │                  EntityGraph                             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [validation]
//! ┌─────────────────────────────────────────────────────────┐
//! │                ValidationReport                          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [ddl]  (+ [defer] diff / location override)
//! ┌─────────────────────────────────────────────────────────┐
//! │            CREATE OR REPLACE SEMANTIC VIEW               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything between the catalog and the DDL is pure: [`project`] reads
//! the files and [`compile`] drives the stages.

pub mod catalog;
pub mod compile;
pub mod config;
pub mod ddl;
pub mod defer;
pub mod definitions;
pub mod graph;
pub mod names;
pub mod project;
pub mod resolver;
pub mod source;
pub mod template;
pub mod validation;

mod yaml;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{
        CatalogColumn, CatalogIndex, CatalogLoadError, CatalogTable, ColumnKind, TableLocation,
    };
    pub use crate::compile::{
        compile, compile_project, CompileError, CompileInputs, CompileOptions, CompileOutput,
        GeneratedView,
    };
    pub use crate::config::{Settings, SettingsError};
    pub use crate::ddl::{synthesize, SynthesisError, SynthesisOptions};
    pub use crate::defer::{
        apply_location_override, diff, impacted_views, CatalogSnapshot, ChangeSet,
    };
    pub use crate::definitions::{DefinitionSet, EntityId, EntityKind};
    pub use crate::graph::EntityGraph;
    pub use crate::project::{Project, ProjectError};
    pub use crate::resolver::{Resolver, SuggestionConfig, Target};
    pub use crate::source::SourceText;
    pub use crate::template::ReferenceSyntaxError;
    pub use crate::validation::{
        validate, Finding, ModelContext, Severity, ValidationOptions, ValidationReport,
    };
}

// Also export at crate root for convenience
pub use catalog::CatalogIndex;
pub use compile::{compile, CompileInputs, CompileOptions, CompileOutput};
pub use definitions::DefinitionSet;
pub use graph::EntityGraph;
pub use source::SourceText;
pub use validation::{Finding, Severity, ValidationReport};
