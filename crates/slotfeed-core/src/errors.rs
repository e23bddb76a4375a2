//! Error taxonomy for the booking feed client.
//!
//! Nothing here is fatal to the host process. Every variant maps to one of
//! four outcomes:
//!
//! - [`TransportError`]: connection-level failure, feeds the reconnect policy
//! - [`ProtocolError`]: malformed inbound frame, the frame is dropped
//! - [`FeedError::RetryExhausted`]: reconnect ceiling reached, reported once
//! - [`HandlerError`]: an observer failed, caught at the dispatch boundary

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed error returned by observer callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Category
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse classification used in logs and status reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Socket or handshake failure.
    Transport,
    /// Bad frame on the wire.
    Protocol,
    /// Reconnect ceiling reached.
    RetryExhausted,
    /// Observer callback failure.
    Handler,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Protocol => write!(f, "protocol"),
            Self::RetryExhausted => write!(f, "retry_exhausted"),
            Self::Handler => write!(f, "handler"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TransportError
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of the underlying socket.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint could not be turned into a handshake request.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint {
        /// Endpoint URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Handshake failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Endpoint URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// Handshake did not finish in time.
    #[error("connecting to {url} timed out after {timeout_ms}ms")]
    Timeout {
        /// Endpoint URL.
        url: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Read or write failed on an open socket.
    #[error("socket error: {0}")]
    Socket(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// ProtocolError
// ─────────────────────────────────────────────────────────────────────────────

/// A frame that could not be decoded or encoded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not JSON, or not a JSON object.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Object without a string `type` field.
    #[error("frame has no string `type` field")]
    MissingKind,

    /// Known kind whose payload does not have the expected shape.
    #[error("invalid `{kind}` payload: {reason}")]
    InvalidPayload {
        /// Envelope kind.
        kind: String,
        /// Decoder message.
        reason: String,
    },

    /// Outbound message could not be built.
    #[error("invalid outbound message: {0}")]
    InvalidOutbound(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// HandlerError
// ─────────────────────────────────────────────────────────────────────────────

/// An observer callback returned an error or panicked.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("handler `{handler}` failed: {message}")]
pub struct HandlerError {
    /// Callback name, e.g. `on_created`.
    pub handler: String,
    /// Error text or panic message.
    pub message: String,
}

impl HandlerError {
    /// Create a handler error.
    pub fn new(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FeedError
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error reported to observers through `on_error`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// Connection-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Dropped inbound frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No more automatic reconnects will be attempted.
    #[error("gave up reconnecting after {attempts} attempts")]
    RetryExhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Observer failure.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl FeedError {
    /// Category for logs and metrics.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::RetryExhausted { .. } => ErrorCategory::RetryExhausted,
            Self::Handler(_) => ErrorCategory::Handler,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn transport_error_display() {
        let err = TransportError::Timeout {
            url: "ws://h/ws".into(),
            timeout_ms: 500,
        };
        assert_eq!(err.to_string(), "connecting to ws://h/ws timed out after 500ms");
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::InvalidPayload {
            kind: "booking_created".into(),
            reason: "missing field `id`".into(),
        };
        assert!(err.to_string().contains("booking_created"));
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn feed_error_from_conversions() {
        let err: FeedError = ProtocolError::MissingKind.into();
        assert_matches!(err, FeedError::Protocol(ProtocolError::MissingKind));

        let err: FeedError = HandlerError::new("on_created", "boom").into();
        assert_eq!(err.category(), ErrorCategory::Handler);
        assert_eq!(err.to_string(), "handler `on_created` failed: boom");
    }

    #[test]
    fn categories() {
        assert_eq!(
            FeedError::Transport(TransportError::Socket("x".into())).category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            FeedError::RetryExhausted { attempts: 5 }.category(),
            ErrorCategory::RetryExhausted
        );
        assert_eq!(ErrorCategory::RetryExhausted.to_string(), "retry_exhausted");
    }
}
