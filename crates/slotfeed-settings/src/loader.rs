//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FeedSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `SLOTFEED_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::FeedSettings;

/// Resolve the path to the settings file (`~/.slotfeed/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".slotfeed").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FeedSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, or the merged result fails validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<FeedSettings> {
    let defaults = serde_json::to_value(FeedSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: FeedSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored (fall back to file/default).
pub fn apply_env_overrides(settings: &mut FeedSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Split out from [`apply_env_overrides`] so tests don't touch the process
/// environment.
pub fn apply_overrides(settings: &mut FeedSettings, lookup: impl Fn(&str) -> Option<String>) {
    let lookup: &dyn Fn(&str) -> Option<String> = &lookup;

    // ── Endpoint ────────────────────────────────────────────────────
    if let Some(v) = read_string(lookup, "SLOTFEED_URL") {
        settings.endpoint.url = v;
    }
    if let Some(v) = read_string(lookup, "SLOTFEED_TOKEN") {
        settings.endpoint.token = Some(v);
    }

    // ── Reconnect ───────────────────────────────────────────────────
    if let Some(v) = read_parsed(lookup, "SLOTFEED_MAX_RECONNECT_ATTEMPTS", |s| {
        parse_u32_range(s, 0, 1000)
    }) {
        settings.reconnect.max_attempts = v;
    }
    if let Some(v) = read_parsed(lookup, "SLOTFEED_RECONNECT_INTERVAL_MS", |s| {
        parse_u64_range(s, 10, 600_000)
    }) {
        settings.reconnect.interval_ms = v;
    }

    // ── Transport ───────────────────────────────────────────────────
    if let Some(v) = read_parsed(lookup, "SLOTFEED_CONNECT_TIMEOUT_MS", |s| {
        parse_u64_range(s, 100, 600_000)
    }) {
        settings.transport.connect_timeout_ms = v;
    }

    // ── Client ──────────────────────────────────────────────────────
    if let Some(v) = read_parsed(lookup, "SLOTFEED_AUTO_CONNECT", parse_bool) {
        settings.client.auto_connect = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_string(lookup, "SLOTFEED_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_parsed(lookup, "SLOTFEED_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

fn read_string(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.is_empty())
}

fn read_parsed<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let val = lookup(name)?;
    let result = parse(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
