//! Client configuration.

use std::time::Duration;

use slotfeed_core::ReconnectConfig;
use slotfeed_settings::FeedSettings;

/// Runtime configuration for a [`FeedClient`](crate::FeedClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Reconnect ceiling and interval.
    pub reconnect: ReconnectConfig,
    /// Handshake timeout.
    pub connect_timeout: Duration,
    /// Outbound frames buffered per session before `send` drops.
    pub outbound_buffer: usize,
    /// Largest inbound message accepted by the `WebSocket` connector.
    pub max_message_size: usize,
    /// Send `get_bookings` after every successful open.
    pub request_snapshot_on_connect: bool,
    /// Connect as soon as the client is built from settings.
    pub auto_connect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&FeedSettings::default())
    }
}

impl From<&FeedSettings> for ClientConfig {
    fn from(settings: &FeedSettings) -> Self {
        Self {
            reconnect: settings.reconnect.clone(),
            connect_timeout: Duration::from_millis(settings.transport.connect_timeout_ms),
            outbound_buffer: settings.transport.outbound_buffer.max(1),
            max_message_size: settings.transport.max_message_size,
            request_snapshot_on_connect: settings.client.request_snapshot_on_connect,
            auto_connect: settings.client.auto_connect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_settings_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.reconnect.max_attempts, 5);
        assert_eq!(cfg.reconnect.interval(), Duration::from_secs(3));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.outbound_buffer, 64);
        assert!(cfg.request_snapshot_on_connect);
        assert!(cfg.auto_connect);
    }

    #[test]
    fn from_custom_settings() {
        let mut settings = FeedSettings::default();
        settings.reconnect.max_attempts = 1;
        settings.transport.connect_timeout_ms = 250;
        settings.client.request_snapshot_on_connect = false;
        let cfg = ClientConfig::from(&settings);
        assert_eq!(cfg.reconnect.max_attempts, 1);
        assert_eq!(cfg.connect_timeout, Duration::from_millis(250));
        assert!(!cfg.request_snapshot_on_connect);
    }
}
