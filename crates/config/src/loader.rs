use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::AppConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "twitch-polly.toml",
    "twitch-polly.yaml",
    "twitch-polly.yml",
    "twitch-polly.json",
];

/// Overrides `polly.base_url`.
pub const ENV_BASE_URL: &str = "TWITCH_POLLY_BASE_URL";
/// Overrides `polly.authorization`.
pub const ENV_AUTHORIZATION: &str = "TWITCH_POLLY_AUTHORIZATION";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./twitch-polly.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/twitch-polly/twitch-polly.{toml,yaml,yml,json}` (user-global)
///
/// Returns `AppConfig::default()` if no config file is found or it fails
/// to load.
pub fn discover_and_load() -> AppConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    AppConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/twitch-polly/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "twitch-polly").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("twitch-polly.toml")
}

/// Apply `TWITCH_POLLY_*` environment overrides on top of file values.
pub fn apply_env_overrides(config: &mut AppConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
        debug!(base_url = %base_url, "base URL overridden from environment");
        config.polly.base_url = base_url;
    }
    if let Some(token) = lookup(ENV_AUTHORIZATION).filter(|v| !v.is_empty()) {
        debug!("authorization overridden from environment");
        config.polly.authorization = Some(Secret::new(token));
    }
}

/// Serialize `config` to TOML and write it to `path`, creating parent
/// directories if needed.
pub fn save_config_to(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<AppConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Parse raw config text into a format-neutral value tree.
pub(crate) fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
