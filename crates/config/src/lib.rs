//! Configuration loading, env substitution, and validation.
//!
//! Config files: `twitch-polly.toml`, `twitch-polly.yaml`, or
//! `twitch-polly.json`, searched in `./` then `~/.config/twitch-polly/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        ENV_AUTHORIZATION, ENV_BASE_URL, apply_env_overrides, config_dir, discover_and_load,
        find_config_file, find_or_default_config_path, load_config, save_config_to,
    },
    schema::AppConfig,
    validate::{Diagnostic, Severity, ValidationResult},
};
