//! Reconnect configuration.
//!
//! Reconnects use a constant interval: no exponential growth, no jitter.
//! The feed is low-volume and a short fixed wait keeps recovery latency
//! predictable while the attempt ceiling bounds the total effort.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default maximum reconnect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default wait between reconnect attempts in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 3000;

/// Configuration for automatic reconnects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay before each attempt in ms (default: 3000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl ReconnectConfig {
    /// Delay before every attempt.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
