//! Configuration loading: JSON file first, then environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::schema::{Config, ProviderEntry};

/// Get the default configuration file path (`~/.docscout/config.json`).
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.json")
}

/// Get the data directory (`~/.docscout`).
pub fn get_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docscout")
}

/// Load configuration from `path` (or the default path).
///
/// A missing file yields the default configuration; an unreadable or
/// malformed file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Write `config` as pretty JSON, creating parent directories.
pub fn save_config(config: &Config, path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(path)
}

/// Overlay environment-style settings on `config`.
///
/// `lookup` returns the value of a variable; empty values count as absent.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(provider) = get("LLM_PROVIDER") {
        config.provider = Some(provider.to_ascii_lowercase());
    }
    if let Some(policy) = get("LLM_MOCK_FALLBACK") {
        match policy.parse() {
            Ok(p) => config.mock_fallback = p,
            Err(e) => warn!(error = %e, "Ignoring LLM_MOCK_FALLBACK"),
        }
    }

    overlay_entry(&mut config.providers.openai, "OPENAI", &get);
    overlay_entry(&mut config.providers.blackbox, "BLACKBOX", &get);
}

fn overlay_entry<G>(entry: &mut ProviderEntry, prefix: &str, get: &G)
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(key) = get(&format!("{}_API_KEY", prefix)) {
        entry.api_key = key;
    }
    if let Some(base) = get(&format!("{}_BASE_URL", prefix)) {
        entry.api_base = Some(base);
    }
    if let Some(model) = get(&format!("{}_MODEL", prefix)) {
        entry.model = Some(model);
    }
    if let Some(name) = get(&format!("{}_EXTRA_HEADER_NAME", prefix)) {
        entry.extra_header_name = Some(name);
    }
    if let Some(value) = get(&format!("{}_EXTRA_HEADER_VALUE", prefix)) {
        entry.extra_header_value = Some(value);
    }
}

/// Load the file configuration and apply the process environment on top.
pub fn load_with_env(path: Option<&Path>) -> Result<Config> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}
