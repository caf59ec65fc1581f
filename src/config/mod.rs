//! Configuration module for semview.
//!
//! Handles the `semview.toml` file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, DeferSettings, GenerationSettings, ProjectSettings, Settings,
    SettingsError, ValidationSettings, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE,
};
