//! Reconnect policy.
//!
//! A synchronous state machine; the client driver feeds it transport
//! signals and timer expiries and acts on what it returns.
//!
//! ```text
//!  Idle ──connect──▶ AwaitingConnect ──connected──▶ Connected
//!   ▲                   │      ▲                        │
//!   │              lost │      │ backoff elapsed        │ lost
//!   │                   ▼      │                        ▼
//!   │              [attempts < ceiling] ──▶ BackoffWait ◀┘
//!   │              [attempts ≥ ceiling] ──▶ Exhausted (terminal)
//!   └──────────────── disconnect (from any phase) ──────────────
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotfeed_core::{ReconnectConfig, RetryState};

/// Policy state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyPhase {
    /// Not connected and not trying to be.
    #[default]
    Idle,
    /// A session is handshaking.
    AwaitingConnect,
    /// A session is open.
    Connected,
    /// Waiting out the fixed interval before the next attempt.
    BackoffWait,
    /// Ceiling reached; only an explicit connect restarts.
    Exhausted,
}

impl fmt::Display for PolicyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingConnect => write!(f, "awaiting_connect"),
            Self::Connected => write!(f, "connected"),
            Self::BackoffWait => write!(f, "backoff_wait"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// What to do after a connection is lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossDecision {
    /// Wait `delay`, then open a new session.
    Retry {
        /// 1-based attempt number.
        attempt: u32,
        /// Fixed wait.
        delay: Duration,
    },
    /// Stop. Reported once.
    Exhausted {
        /// Attempts made.
        attempts: u32,
    },
    /// Signal arrived in a phase that doesn't react to it.
    Ignored,
}

/// Bounded, fixed-interval reconnect state machine.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    phase: PolicyPhase,
    retry: RetryState,
    interval: Duration,
}

impl ReconnectPolicy {
    /// New policy in `Idle`.
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            phase: PolicyPhase::Idle,
            retry: RetryState::new(config.max_attempts),
            interval: config.interval(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> PolicyPhase {
        self.phase
    }

    /// Attempt counter and ceiling.
    pub fn retry(&self) -> RetryState {
        self.retry
    }

    /// Explicit connect request.
    ///
    /// Starts a fresh retry budget from `Idle` or `Exhausted`. Returns
    /// `false`, leaving everything untouched, when a session is already
    /// live or scheduled.
    pub fn request_connect(&mut self) -> bool {
        match self.phase {
            PolicyPhase::Idle | PolicyPhase::Exhausted => {
                self.retry.reset();
                self.phase = PolicyPhase::AwaitingConnect;
                true
            }
            PolicyPhase::AwaitingConnect | PolicyPhase::Connected | PolicyPhase::BackoffWait => {
                false
            }
        }
    }

    /// Transport reported a completed handshake.
    pub fn on_connected(&mut self) -> bool {
        if self.phase == PolicyPhase::AwaitingConnect {
            self.phase = PolicyPhase::Connected;
            self.retry.reset();
            true
        } else {
            false
        }
    }

    /// Transport reported a disconnect or error for the live session.
    pub fn on_connection_lost(&mut self) -> LossDecision {
        match self.phase {
            PolicyPhase::Connected | PolicyPhase::AwaitingConnect => {
                if self.retry.can_retry() {
                    let attempt = self.retry.record_attempt();
                    self.phase = PolicyPhase::BackoffWait;
                    LossDecision::Retry {
                        attempt,
                        delay: self.interval,
                    }
                } else {
                    self.phase = PolicyPhase::Exhausted;
                    LossDecision::Exhausted {
                        attempts: self.retry.attempts,
                    }
                }
            }
            PolicyPhase::Idle | PolicyPhase::BackoffWait | PolicyPhase::Exhausted => {
                LossDecision::Ignored
            }
        }
    }

    /// Backoff timer fired. Returns `true` if a new session should be opened.
    pub fn on_backoff_elapsed(&mut self) -> bool {
        if self.phase == PolicyPhase::BackoffWait {
            self.phase = PolicyPhase::AwaitingConnect;
            true
        } else {
            false
        }
    }

    /// Explicit disconnect: back to `Idle` from anywhere.
    pub fn disconnect(&mut self) {
        self.phase = PolicyPhase::Idle;
    }
}
