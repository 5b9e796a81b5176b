//! Layered settings: defaults, then a JSON file, then environment variables.

use std::path::Path;

use hash_server::config::{ServerConfig, parse_origins};
use serde_json::Value;
use tracing::{debug, warn};

/// Errors that can occur when loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load settings from an optional JSON file, then apply env overrides.
pub fn load_settings(path: Option<&Path>) -> Result<ServerConfig, SettingsError> {
    let mut config = match path {
        Some(path) => load_settings_from_path(path)?,
        None => ServerConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Deep-merge the JSON file at `path` over the defaults.
pub fn load_settings_from_path(path: &Path) -> Result<ServerConfig, SettingsError> {
    debug!(?path, "loading settings from file");
    let defaults = serde_json::to_value(ServerConfig::default())?;
    let content = std::fs::read_to_string(path)?;
    let user: Value = serde_json::from_str(&content)?;
    Ok(serde_json::from_value(deep_merge(defaults, user))?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `HASH_MCP_*` (and `PORT`, `CORS_ORIGINS`) overrides from the process environment.
pub fn apply_env_overrides(config: &mut ServerConfig) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid or out-of-range values are ignored with a warning.
pub fn apply_overrides(config: &mut ServerConfig, lookup: impl Fn(&str) -> Option<String>) {
    let read_string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let read_u16 = |name: &str, min: u16, max: u16| {
        let val = read_string(name)?;
        let parsed = parse_range(&val, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        parsed
    };
    let read_u64 = |name: &str, min: u64, max: u64| {
        let val = read_string(name)?;
        let parsed = parse_range(&val, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        parsed
    };

    if let Some(v) = read_string("HASH_MCP_HOST") {
        config.host = v;
    }
    // The prefixed name wins over the conventional one.
    if let Some(v) = read_u16("HASH_MCP_PORT", 0, u16::MAX).or_else(|| read_u16("PORT", 0, u16::MAX)) {
        config.port = v;
    }
    if let Some(v) = read_u64("HASH_MCP_HEARTBEAT_SECS", 1, 3600) {
        config.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_string("HASH_MCP_CORS_ORIGINS").or_else(|| read_string("CORS_ORIGINS")) {
        config.allowed_origins = parse_origins(&v);
    }
}

/// Parse `val` as a number within `[min, max]`.
fn parse_range<T: std::str::FromStr + PartialOrd>(val: &str, min: T, max: T) -> Option<T> {
    let n: T = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
