//! `WebSocket` connector backed by tokio-tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use slotfeed_core::TransportError;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

use super::{Connector, Endpoint, FrameSink, FrameStream, InboundFrame};
use crate::config::ClientConfig;

/// Default inbound frame limit.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Connects over `ws://` or `wss://`.
#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    max_message_size: usize,
}

impl WebSocketConnector {
    /// Connector with an explicit inbound message limit.
    pub fn new(max_message_size: usize) -> Self {
        Self { max_message_size }
    }

    /// Connector using the limits in `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_message_size)
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

/// Build the handshake request, adding `Authorization: Bearer` when the
/// endpoint carries a token.
pub fn handshake_request(endpoint: &Endpoint) -> Result<Request, TransportError> {
    let invalid = |reason: String| TransportError::InvalidEndpoint {
        url: endpoint.url().to_owned(),
        reason,
    };

    let mut request = endpoint
        .url()
        .into_client_request()
        .map_err(|e| invalid(e.to_string()))?;

    if let Some(token) = endpoint.token() {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| invalid("token is not a valid header value".into()))?;
        let _ = request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

fn connect_error(endpoint: &Endpoint, error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::Url(e) => TransportError::InvalidEndpoint {
            url: endpoint.url().to_owned(),
            reason: e.to_string(),
        },
        tungstenite::Error::Http(response) => TransportError::Connect {
            url: endpoint.url().to_owned(),
            reason: format!("handshake rejected with HTTP {}", response.status()),
        },
        other => TransportError::Connect {
            url: endpoint.url().to_owned(),
            reason: other.to_string(),
        },
    }
}

fn inbound(message: Result<Message, tungstenite::Error>) -> Option<Result<InboundFrame, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(InboundFrame::Text(text.as_str().to_owned()))),
        Ok(Message::Close(frame)) => Some(Ok(InboundFrame::Close {
            code: frame.as_ref().map(|f| u16::from(f.code)),
            reason: frame
                .map(|f| f.reason.as_str().to_owned())
                .unwrap_or_default(),
        })),
        // Pings are answered by tungstenite; binary frames are not part of the feed.
        Ok(_) => None,
        Err(e) => Some(Err(TransportError::Socket(e.to_string()))),
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<(FrameSink, FrameStream), TransportError> {
        let request = handshake_request(endpoint)?;
        let config = WebSocketConfig::default().max_message_size(Some(self.max_message_size));

        let (ws, response) = connect_async_with_config(request, Some(config), false)
            .await
            .map_err(|e| connect_error(endpoint, e))?;
        debug!(url = endpoint.url(), status = %response.status(), "websocket handshake complete");

        let (sink, stream) = ws.split();
        let sink: FrameSink = Box::pin(
            sink.sink_map_err(|e| TransportError::Socket(e.to_string()))
                .with(|frame: String| future::ready(Ok::<_, TransportError>(Message::text(frame)))),
        );
        let stream: FrameStream = Box::pin(stream.filter_map(|m| future::ready(inbound(m))));
        Ok((sink, stream))
    }
}
