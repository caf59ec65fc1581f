//! TOML-based configuration for semview.
//!
//! Supports a config file (semview.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [project]
//! manifest = "target/manifest.json"
//! metadata_paths = ["models"]
//! definition_paths = ["snowflake_semantic_models"]
//! exclude = ["**/scratch/**"]
//!
//! [validation]
//! strict = false
//! suggestion_threshold = 0.6
//! max_suggestions = 3
//!
//! [generation]
//! database = "${SEMANTIC_DB}"
//! schema = "SEMANTIC_VIEWS"
//!
//! [defer]
//! target_database = "ANALYTICS_PROD"
//! state_path = "prod-artifacts"
//! only_modified = true
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolver::SuggestionConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SEMVIEW_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "semview.toml";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where sources live.
    pub project: ProjectSettings,

    /// Validation behaviour.
    pub validation: ValidationSettings,

    /// Where generated views are created.
    pub generation: GenerationSettings,

    /// Defer mode and change detection.
    pub defer: DeferSettings,
}

/// Source locations, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Path to the build tool's manifest.json.
    pub manifest: String,

    /// Directories holding per-table metadata YAML.
    pub metadata_paths: Vec<String>,

    /// Directories holding definition YAML.
    pub definition_paths: Vec<String>,

    /// Path globs to skip (`*`, `**`, `?`).
    pub exclude: Vec<String>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            manifest: "target/manifest.json".to_string(),
            metadata_paths: vec!["models".to_string()],
            definition_paths: vec!["snowflake_semantic_models".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// Validation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Treat warnings as errors.
    pub strict: bool,

    /// Minimum similarity (0.0 to 1.0) for "did you mean" suggestions.
    pub suggestion_threshold: f64,

    /// Maximum suggestions per unresolved reference.
    pub max_suggestions: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        let suggestions = SuggestionConfig::default();
        Self {
            strict: false,
            suggestion_threshold: suggestions.threshold,
            max_suggestions: suggestions.limit,
        }
    }
}

impl ValidationSettings {
    pub fn suggestion_config(&self) -> SuggestionConfig {
        SuggestionConfig {
            threshold: self.suggestion_threshold,
            limit: self.max_suggestions,
        }
    }
}

/// Target location of generated views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub database: Option<String>,
    pub schema: Option<String>,
}

/// Defer mode settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeferSettings {
    /// Database that generated DDL should read tables from.
    pub target_database: Option<String>,

    /// Directory holding the reference manifest.json.
    pub state_path: Option<String>,

    /// Only regenerate views impacted by changes against the reference.
    pub only_modified: bool,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Parse settings from TOML text, expanding environment variables.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        let settings = settings.expanded()?;
        settings.check()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. `explicit`, when given
    /// 2. Environment variable `SEMVIEW_CONFIG`
    /// 3. `./semview.toml`
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Copy with `${VAR}` / `$VAR` expanded in every string value.
    fn expanded(mut self) -> Result<Self, SettingsError> {
        let expand_all = |values: &mut Vec<String>| -> Result<(), SettingsError> {
            for value in values.iter_mut() {
                *value = expand_env_vars(value)?;
            }
            Ok(())
        };
        let expand_opt = |value: &mut Option<String>| -> Result<(), SettingsError> {
            if let Some(inner) = value.as_mut() {
                *inner = expand_env_vars(inner)?;
            }
            Ok(())
        };

        self.project.manifest = expand_env_vars(&self.project.manifest)?;
        expand_all(&mut self.project.metadata_paths)?;
        expand_all(&mut self.project.definition_paths)?;
        expand_all(&mut self.project.exclude)?;
        expand_opt(&mut self.generation.database)?;
        expand_opt(&mut self.generation.schema)?;
        expand_opt(&mut self.defer.target_database)?;
        expand_opt(&mut self.defer.state_path)?;
        Ok(self)
    }

    fn check(&self) -> Result<(), SettingsError> {
        let threshold = self.validation.suggestion_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SettingsError::InvalidConfig(format!(
                "validation.suggestion_threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        if self.project.manifest.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "project.manifest must not be empty".to_string(),
            ));
        }
        if self.defer.only_modified && self.defer.state_path.is_none() {
            return Err(SettingsError::InvalidConfig(
                "defer.only_modified requires defer.state_path".to_string(),
            ));
        }
        Ok(())
    }

    /// Reference manifest location when a defer state path is configured.
    pub fn reference_manifest(&self) -> Option<PathBuf> {
        self.defer
            .state_path
            .as_ref()
            .map(|dir| Path::new(dir).join("manifest.json"))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        // ${VAR}
        if chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }
            if !closed {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated variable reference in '{}'",
                    s
                )));
            }
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
            continue;
        }

        // $VAR (ends at non-alphanumeric/underscore)
        let mut var_name = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                var_name.push(ch);
                chars.next();
            } else {
                break;
            }
        }
        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
        } else {
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        }
    }

    Ok(result)
}
