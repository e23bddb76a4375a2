//! Frame encoding and decoding.

use serde_json::Value;
use slotfeed_core::ProtocolError;
use tracing::warn;

use super::messages::{Envelope, OutboundRequest, kinds};

/// Serialize an outbound request to a text frame.
///
/// For custom requests the request kind always wins over a `type` key in
/// the caller's fields.
pub fn encode(request: &OutboundRequest) -> Result<String, ProtocolError> {
    let value = match request {
        OutboundRequest::GetBookings => {
            serde_json::json!({ "type": kinds::GET_BOOKINGS })
        }
        OutboundRequest::Custom { kind, fields } => {
            let mut map = fields.clone();
            if let Some(shadowed) = map.insert("type".into(), Value::String(kind.clone())) {
                warn!(kind, ?shadowed, "custom fields carried a `type` key, overriding");
            }
            Value::Object(map)
        }
    };
    serde_json::to_string(&value).map_err(|e| ProtocolError::InvalidOutbound(e.to_string()))
}

/// Parse a raw text frame into an [`Envelope`].
pub fn decode(raw: &str) -> Result<Envelope, ProtocolError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(ProtocolError::MalformedFrame("expected a JSON object".into()));
    };
    let kind = match map.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => return Err(ProtocolError::MissingKind),
    };
    let payload = map.remove("data").unwrap_or(Value::Null);
    Ok(Envelope { kind, payload })
}
