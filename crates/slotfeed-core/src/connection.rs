//! Connection lifecycle state and the bounded retry counter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the single live transport session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket, or the last one has closed.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Socket open; frames can be sent.
    Connected,
}

impl ConnectionState {
    /// Whether outbound frames can be written.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Reconnect attempt counter against a fixed ceiling.
///
/// Reset on every successful connect, incremented once per scheduled retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryState {
    /// Retries scheduled since the last successful connect.
    pub attempts: u32,
    /// Maximum number of retries.
    pub ceiling: u32,
}

impl RetryState {
    /// Fresh counter with the given ceiling.
    pub fn new(ceiling: u32) -> Self {
        Self {
            attempts: 0,
            ceiling,
        }
    }

    /// Whether another retry may be scheduled.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.ceiling
    }

    /// Count one more retry and return the new attempt number (1-based).
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Zero the counter.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Connected.is_connected());
    }

    #[test]
    fn state_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, r#""connecting""#);
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }

    #[test]
    fn retry_state_counts_to_ceiling() {
        let mut retry = RetryState::new(2);
        assert!(retry.can_retry());
        assert_eq!(retry.record_attempt(), 1);
        assert!(retry.can_retry());
        assert_eq!(retry.record_attempt(), 2);
        assert!(!retry.can_retry());
        retry.reset();
        assert_eq!(retry.attempts, 0);
        assert!(retry.can_retry());
    }

    #[test]
    fn zero_ceiling_never_retries() {
        assert!(!RetryState::new(0).can_retry());
    }
}
