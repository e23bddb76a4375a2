//! # slotfeed-client
//!
//! Client for a server-pushed booking feed over `WebSocket`.
//!
//! - [`transport`]: one physical connection per [`TransportSession`], lifecycle signals
//! - [`reconnect`]: bounded, fixed-interval [`ReconnectPolicy`]
//! - [`protocol`]: JSON frame codec and typed [`InboundMessage`]s
//! - [`dispatch`]: routes each decoded frame to exactly one handler
//! - [`reconciler`]: the local ordered booking collection
//! - [`observer`]: typed subscription interface for UI layers
//! - [`client`]: [`FeedClient`], the owned handle that ties it together
//!
//! All state changes run on a single driver task; the handle only sends
//! commands and reads shared snapshots.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod notification;
pub mod observer;
pub mod protocol;
pub mod reconciler;
pub mod reconnect;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::{ConnectionStatus, FeedClient};
pub use config::ClientConfig;
pub use dispatch::{Dispatcher, Route};
pub use notification::{Notification, NotificationLevel};
pub use observer::{FeedObserver, HandlerResult, ObserverSet};
pub use protocol::{Envelope, InboundMessage, OutboundRequest};
pub use reconciler::{BookingsView, Reconciler, UpdateOutcome};
pub use reconnect::{LossDecision, PolicyPhase, ReconnectPolicy};
pub use transport::{
    Connector, DisconnectReason, Endpoint, SendOutcome, SessionId, TransportSession,
    TransportSignal, websocket::WebSocketConnector,
};
