//! Protocol message types.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use slotfeed_core::{BookingRecord, DeletedBooking, ProtocolError};

/// Message kind tags.
pub mod kinds {
    /// Outbound full-state request.
    pub const GET_BOOKINGS: &str = "get_bookings";
    /// A booking was created.
    pub const BOOKING_CREATED: &str = "booking_created";
    /// A booking was updated.
    pub const BOOKING_UPDATED: &str = "booking_updated";
    /// A booking was deleted.
    pub const BOOKING_DELETED: &str = "booking_deleted";
    /// Full snapshot response.
    pub const BOOKINGS_DATA: &str = "bookings_data";
}

/// Decoded `{kind, payload}` unit of one inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Value of the `type` field.
    pub kind: String,
    /// Value of the `data` field, `Null` when absent.
    pub payload: Value,
}

/// Typed inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    /// `booking_created`.
    BookingCreated(BookingRecord),
    /// `booking_updated`.
    BookingUpdated(BookingRecord),
    /// `booking_deleted`.
    BookingDeleted(DeletedBooking),
    /// `bookings_data`: ordered full snapshot.
    BookingsData(Vec<BookingRecord>),
    /// Any other kind. Ignored for forward compatibility.
    Unknown {
        /// The unrecognized kind.
        kind: String,
    },
}

impl InboundMessage {
    /// Kind tag of this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::BookingCreated(_) => kinds::BOOKING_CREATED,
            Self::BookingUpdated(_) => kinds::BOOKING_UPDATED,
            Self::BookingDeleted(_) => kinds::BOOKING_DELETED,
            Self::BookingsData(_) => kinds::BOOKINGS_DATA,
            Self::Unknown { kind } => kind,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload {
        kind: kind.to_owned(),
        reason: e.to_string(),
    })
}

impl TryFrom<Envelope> for InboundMessage {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Envelope { kind, payload: data } = envelope;
        Ok(match kind.as_str() {
            kinds::BOOKING_CREATED => Self::BookingCreated(payload(&kind, data)?),
            kinds::BOOKING_UPDATED => Self::BookingUpdated(payload(&kind, data)?),
            kinds::BOOKING_DELETED => Self::BookingDeleted(payload(&kind, data)?),
            kinds::BOOKINGS_DATA => Self::BookingsData(payload(&kind, data)?),
            _ => Self::Unknown { kind },
        })
    }
}

/// Outbound request.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundRequest {
    /// `{"type": "get_bookings"}`.
    GetBookings,
    /// Caller-defined `{"type": kind, ...fields}`.
    Custom {
        /// Value for `type`.
        kind: String,
        /// Remaining top-level fields.
        fields: Map<String, Value>,
    },
}

impl OutboundRequest {
    /// Build a custom request. `kind` must be non-empty.
    pub fn custom(kind: impl Into<String>, fields: Map<String, Value>) -> Result<Self, ProtocolError> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(ProtocolError::InvalidOutbound("kind must not be empty".into()));
        }
        Ok(Self::Custom { kind, fields })
    }

    /// Kind tag of this request.
    pub fn kind(&self) -> &str {
        match self {
            Self::GetBookings => kinds::GET_BOOKINGS,
            Self::Custom { kind, .. } => kind,
        }
    }
}
