//! Transport layer: one physical connection and its lifecycle signals.
//!
//! A [`Connector`] knows how to reach an [`Endpoint`] and hands back a raw
//! frame sink/stream pair. [`TransportSession`] owns that pair for the
//! lifetime of one connection and reports what happens to it as
//! [`TransportEvent`]s. Retry decisions live elsewhere.

pub mod session;
pub mod websocket;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use slotfeed_core::TransportError;
use slotfeed_settings::EndpointSettings;
use tokio::sync::mpsc;

pub use session::{Outbox, SessionOptions, TransportSession};

/// Outbound half of a connected socket.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
/// Inbound half of a connected socket.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<InboundFrame, TransportError>> + Send>>;
/// Where sessions report their lifecycle.
pub type EventSink = mpsc::UnboundedSender<TransportEvent>;

/// Feed endpoint and optional bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    token: Option<String>,
}

impl Endpoint {
    /// Endpoint without credentials.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
        }
    }

    /// Attach a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// `WebSocket` URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl From<&EndpointSettings> for Endpoint {
    fn from(settings: &EndpointSettings) -> Self {
        Self {
            url: settings.url.clone(),
            token: settings.token.clone(),
        }
    }
}

/// Opens raw sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Perform the handshake and return the connected frame halves.
    async fn connect(&self, endpoint: &Endpoint) -> Result<(FrameSink, FrameStream), TransportError>;
}

/// A frame read from the socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundFrame {
    /// Text payload.
    Text(String),
    /// Peer sent a close frame.
    Close {
        /// Close code, when present.
        code: Option<u16>,
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// Identifies one physical connection. Monotonic per client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws_{}", self.0)
    }
}

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer sent a close frame.
    ClosedByPeer {
        /// Close code, when present.
        code: Option<u16>,
        /// Close reason, possibly empty.
        reason: String,
    },
    /// Inbound stream ended without a close frame.
    StreamEnded,
    /// [`TransportSession::close`] was called.
    ClosedLocally,
    /// The handshake or an I/O operation failed; a `TransportSignal::Error` precedes this.
    Failed,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClosedByPeer { code: Some(code), reason } if !reason.is_empty() => {
                write!(f, "closed by peer ({code}: {reason})")
            }
            Self::ClosedByPeer { code: Some(code), .. } => write!(f, "closed by peer ({code})"),
            Self::ClosedByPeer { .. } => write!(f, "closed by peer"),
            Self::StreamEnded => write!(f, "stream ended"),
            Self::ClosedLocally => write!(f, "closed locally"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle signal emitted by a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportSignal {
    /// Handshake completed; frames can be sent.
    Connected,
    /// A text frame arrived.
    Frame(String),
    /// Connection failed or broke.
    Error(TransportError),
    /// Session is over. Always the last signal.
    Disconnected(DisconnectReason),
}

/// A signal tagged with the session that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportEvent {
    /// Originating session.
    pub session: SessionId,
    /// What happened.
    pub signal: TransportSignal,
}

/// Result of a fire-and-forget send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for the socket.
    Sent,
    /// Not connected, or the outbound buffer is full.
    Dropped,
}

impl SendOutcome {
    /// Whether the frame was queued.
    pub fn is_sent(self) -> bool {
        self == Self::Sent
    }
}
