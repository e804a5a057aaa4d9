//! Discovery of deployment defaults supplied by the build/deploy collaborator.
//!
//! Sources are consulted in order: `__PWA_DEFAULTS__` (inline JSON), `__PWA_DEFAULTS_PATH`
//! (path to a JSON file), then `PWA_CONFIG` (inline JSON, a path, or `key=value` pairs
//! separated by commas).

use std::env;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

fn pwa_defaults() -> Option<Value> {
    defaults_from_env().or_else(defaults_from_path)
}

fn defaults_from_env() -> Option<Value> {
    let raw = env::var("__PWA_DEFAULTS__").ok()?;
    parse_json_object(&raw)
}

fn defaults_from_path() -> Option<Value> {
    let path = env::var("__PWA_DEFAULTS_PATH").ok()?;
    let content = fs::read_to_string(path).ok()?;
    parse_json_object(&content)
}

fn parse_json_object(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(Value::is_object)
}

fn parse_config_source(raw: &str) -> Option<Value> {
    if let Some(json) = parse_json_object(raw) {
        return Some(json);
    }

    if let Some(path) = treat_as_path(raw) {
        if let Some(json) = fs::read_to_string(path)
            .ok()
            .and_then(|contents| parse_json_object(&contents))
        {
            return Some(json);
        }
    }

    parse_key_value_config(raw)
}

fn treat_as_path(raw: &str) -> Option<&str> {
    if raw.contains('=') {
        return None;
    }
    let trimmed = raw.trim();
    Path::new(trimmed).exists().then_some(trimmed)
}

fn parse_key_value_config(raw: &str) -> Option<Value> {
    let mut map = Map::new();
    for entry in raw.split(',') {
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    (!map.is_empty()).then_some(Value::Object(map))
}

/// Returns the deployment configuration as a JSON map when one was supplied.
pub fn default_config_json() -> Option<Map<String, Value>> {
    if let Some(defaults) = pwa_defaults() {
        if let Some(config) = defaults.get("config").and_then(Value::as_object) {
            return Some(config.clone());
        }
        return defaults.as_object().cloned();
    }

    let raw = env::var("PWA_CONFIG").ok()?;
    parse_config_source(&raw)?.as_object().cloned()
}

/// Reads a single non-empty override variable.
pub fn override_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
