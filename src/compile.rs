//! End-to-end compilation from project sources to semantic view DDL.
//!
//! ```text
//! manifest + metadata ─► CatalogIndex ─┐
//! definitions ──────────► DefinitionSet ┴► Resolver ─► EntityGraph
//!                                                        │
//!                               ValidationReport ◄───────┤
//!                                      │ (gate)          │
//!                                      ▼                 │
//!                             CREATE SEMANTIC VIEW ◄─────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use semview::compile::{compile, CompileInputs, CompileOptions};
//!
//! let inputs = CompileInputs::new(manifest)
//!     .with_metadata(metadata)
//!     .with_definitions(definitions);
//! let output = compile(&inputs, &CompileOptions::default())?;
//! for view in &output.views {
//!     println!("{}", view.ddl);
//! }
//! ```

use std::collections::{BTreeSet, HashSet};

use crate::catalog::{CatalogIndex, CatalogLoadError};
use crate::config::Settings;
use crate::ddl::{synthesize, SynthesisError, SynthesisOptions};
use crate::definitions::DefinitionSet;
use crate::defer::{apply_location_override, diff, impacted_views, CatalogSnapshot, ChangeSet};
use crate::graph::EntityGraph;
use crate::names::identity_key;
use crate::project::Project;
use crate::resolver::{Resolver, SuggestionConfig};
use crate::source::SourceText;
use crate::validation::{validate, ModelContext, ValidationOptions, ValidationReport};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that abort a compilation. Problems in the sources themselves are
/// findings in the report, not errors.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("semantic view not found: {0}")]
    UnknownView(String),

    #[error("failed to fingerprint definitions: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Inputs and options
// ============================================================================

/// Source texts for one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileInputs {
    pub manifest: Option<SourceText>,
    pub metadata: Vec<SourceText>,
    pub definitions: Vec<SourceText>,
    /// Manifest of the environment to diff against.
    pub reference_manifest: Option<SourceText>,
}

impl CompileInputs {
    pub fn new(manifest: SourceText) -> Self {
        Self {
            manifest: Some(manifest),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<SourceText>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_definitions(mut self, definitions: Vec<SourceText>) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn with_reference_manifest(mut self, manifest: SourceText) -> Self {
        self.reference_manifest = Some(manifest);
        self
    }
}

impl From<Project> for CompileInputs {
    fn from(project: Project) -> Self {
        Self {
            manifest: project.manifest,
            metadata: project.metadata,
            definitions: project.definitions,
            reference_manifest: project.reference_manifest,
        }
    }
}

/// Options for compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Treat warnings as blocking.
    pub strict: bool,

    /// "Did you mean" tuning.
    pub suggestions: SuggestionConfig,

    /// Where generated views are created.
    pub synthesis: SynthesisOptions,

    /// Read tables from this database instead of the manifest's.
    pub defer_database: Option<String>,

    /// Views to generate; every view when empty.
    pub views: Vec<String>,

    /// Only generate views impacted by changes against the reference manifest.
    pub only_modified: bool,
}

impl CompileOptions {
    /// Options as configured in `semview.toml`.
    pub fn from_settings(settings: &Settings) -> Self {
        let synthesis = SynthesisOptions {
            database: settings.generation.database.clone(),
            schema: settings.generation.schema.clone(),
            location_override: None,
        };
        Self {
            strict: settings.validation.strict,
            suggestions: settings.validation.suggestion_config(),
            synthesis,
            defer_database: settings.defer.target_database.clone(),
            views: Vec::new(),
            only_modified: settings.defer.only_modified,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_synthesis(mut self, synthesis: SynthesisOptions) -> Self {
        self.synthesis = synthesis;
        self
    }

    pub fn with_defer_database(mut self, database: impl Into<String>) -> Self {
        self.defer_database = Some(database.into());
        self
    }

    pub fn with_views(mut self, views: Vec<String>) -> Self {
        self.views = views;
        self
    }

    pub fn with_only_modified(mut self, only_modified: bool) -> Self {
        self.only_modified = only_modified;
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// DDL for one semantic view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedView {
    pub name: String,
    pub ddl: String,
}

#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub report: ValidationReport,

    /// Generated views in definition order. Empty when validation failed.
    pub views: Vec<GeneratedView>,

    /// Differences against the reference manifest, when one was given.
    pub changes: Option<ChangeSet>,

    /// Views depending on a changed table.
    pub impacted: BTreeSet<String>,

    /// Fingerprint of the loaded definitions.
    pub fingerprint: String,
}

impl CompileOutput {
    pub fn view(&self, name: &str) -> Option<&GeneratedView> {
        let key = identity_key(name);
        self.views.iter().find(|v| identity_key(&v.name) == key)
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// Run the whole pipeline.
///
/// Fails only when the catalog cannot be built or a requested view does not
/// exist. When validation does not pass, the report is returned with no DDL.
#[tracing::instrument(skip_all)]
pub fn compile(inputs: &CompileInputs, options: &CompileOptions) -> CompileResult<CompileOutput> {
    let mut catalog = CatalogIndex::load(inputs.manifest.as_ref(), &inputs.metadata)?;
    if let Some(database) = &options.defer_database {
        tracing::info!(database = %database, "deferring table locations");
        catalog = apply_location_override(&catalog, database);
    }

    let definitions = DefinitionSet::load(&inputs.definitions);
    let resolver = Resolver::new(&catalog, &definitions, options.suggestions);
    let graph = EntityGraph::build(&resolver);

    let ctx = ModelContext::new(&resolver, &graph);
    let report = validate(&ctx, &ValidationOptions::default().strict(options.strict));

    let mut changes = None;
    let mut impacted = BTreeSet::new();
    if let (Some(current), Some(reference)) = (&inputs.manifest, &inputs.reference_manifest) {
        let changeset = diff(
            &CatalogSnapshot::from_manifest(current)?,
            &CatalogSnapshot::from_manifest(reference)?,
        );
        // Same definitions resolved against the reference catalog, so that
        // removed tables still lead to the views that used them.
        let baseline_catalog = CatalogIndex::load(Some(reference), &inputs.metadata)?;
        let baseline_resolver = Resolver::new(&baseline_catalog, &definitions, options.suggestions);
        let baseline = EntityGraph::build(&baseline_resolver);
        impacted = impacted_views(&changeset, &graph, &baseline);
        changes = Some(changeset);
    }

    let targets = target_views(&definitions, options, changes.as_ref(), &impacted)?;

    let mut views = Vec::new();
    if report.passed() {
        for name in targets {
            let ddl = synthesize(&name, &ctx, &report, &options.synthesis)?;
            views.push(GeneratedView { name, ddl });
        }
    } else {
        tracing::warn!(summary = %report.summary(), "validation failed; no views generated");
    }

    tracing::info!(
        views = views.len(),
        impacted = impacted.len(),
        "compilation finished"
    );

    let fingerprint = definitions.fingerprint()?;
    Ok(CompileOutput {
        report,
        views,
        changes,
        impacted,
        fingerprint,
    })
}

/// Load a project from disk and compile it with its own settings.
pub fn compile_project(project: Project, settings: &Settings) -> CompileResult<CompileOutput> {
    compile(&project.into(), &CompileOptions::from_settings(settings))
}

/// Names of the views to generate, in definition order.
fn target_views(
    definitions: &DefinitionSet,
    options: &CompileOptions,
    changes: Option<&ChangeSet>,
    impacted: &BTreeSet<String>,
) -> CompileResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names: Vec<String> = Vec::new();

    if options.views.is_empty() {
        for view in &definitions.views {
            let name = view.name.trim();
            if !name.is_empty() && seen.insert(identity_key(name)) {
                names.push(name.to_string());
            }
        }
    } else {
        for requested in &options.views {
            let view = definitions
                .view(requested)
                .ok_or_else(|| CompileError::UnknownView(requested.clone()))?;
            if seen.insert(identity_key(&view.name)) {
                names.push(view.name.trim().to_string());
            }
        }
    }

    // Without a reference there is nothing to compare against, so everything
    // counts as modified.
    if options.only_modified && changes.is_some() {
        let impacted: HashSet<String> = impacted.iter().map(|v| identity_key(v)).collect();
        names.retain(|name| impacted.contains(&identity_key(name)));
    }
    Ok(names)
}
