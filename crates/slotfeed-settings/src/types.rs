//! Settings types.
//!
//! Every field has a default so a partial `settings.json` is always valid.

use std::fmt;

use serde::{Deserialize, Serialize};
use slotfeed_core::ReconnectConfig;

use crate::errors::{Result, SettingsError};

/// Default feed endpoint.
pub const DEFAULT_URL: &str = "ws://localhost:8000/ws/admin/bookings/";

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedSettings {
    /// Where to connect.
    pub endpoint: EndpointSettings,
    /// Automatic reconnect behaviour.
    pub reconnect: ReconnectConfig,
    /// Socket-level limits.
    pub transport: TransportSettings,
    /// Client behaviour switches.
    pub client: ClientSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl FeedSettings {
    /// Reject values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = self.endpoint.url.as_str();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(SettingsError::InvalidValue(format!(
                "endpoint.url must use ws:// or wss://, got {url}"
            )));
        }
        if self.reconnect.interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "reconnect.intervalMs must be positive".into(),
            ));
        }
        if self.transport.outbound_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "transport.outboundBuffer must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Feed endpoint and credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointSettings {
    /// WebSocket URL.
    pub url: String,
    /// Bearer token sent during the handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            token: None,
        }
    }
}

impl fmt::Debug for EndpointSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSettings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Socket-level limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportSettings {
    /// Handshake timeout in ms.
    pub connect_timeout_ms: u64,
    /// Outbound frames buffered before `send` starts dropping.
    pub outbound_buffer: usize,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            outbound_buffer: 64,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

/// Client behaviour switches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Connect as soon as the client is built.
    pub auto_connect: bool,
    /// Send `get_bookings` after every successful open.
    pub request_snapshot_on_connect: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            auto_connect: true,
            request_snapshot_on_connect: true,
        }
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = FeedSettings::default();
        assert_eq!(s.endpoint.url, DEFAULT_URL);
        assert!(s.endpoint.token.is_none());
        assert_eq!(s.reconnect.max_attempts, 5);
        assert_eq!(s.reconnect.interval_ms, 3000);
        assert_eq!(s.transport.connect_timeout_ms, 10_000);
        assert_eq!(s.transport.outbound_buffer, 64);
        assert!(s.client.auto_connect);
        assert!(s.client.request_snapshot_on_connect);
        assert_eq!(s.logging.level, "info");
        assert!(!s.logging.json);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: FeedSettings =
            serde_json::from_str(r#"{"reconnect":{"maxAttempts":2},"client":{"autoConnect":false}}"#)
                .unwrap();
        assert_eq!(s.reconnect.max_attempts, 2);
        assert_eq!(s.reconnect.interval_ms, 3000);
        assert!(!s.client.auto_connect);
        assert!(s.client.request_snapshot_on_connect);
        assert_eq!(s.endpoint.url, DEFAULT_URL);
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let endpoint = EndpointSettings {
            url: "ws://h/ws".into(),
            token: Some("s3cret".into()),
        };
        let debug = format!("{endpoint:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn validate_rejects_http_url() {
        let mut s = FeedSettings::default();
        s.endpoint.url = "http://localhost:8000".into();
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut s = FeedSettings::default();
        s.reconnect.interval_ms = 0;
        assert!(s.validate().is_err());
    }
}
