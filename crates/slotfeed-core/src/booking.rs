//! Booking records as they travel over the feed.
//!
//! Only `id` is required. Everything else is defaulted when missing, and
//! fields this client does not model are kept verbatim in `extra` so a
//! record can be re-serialized without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::BookingId;

/// Customer attached to a booking.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDetails {
    /// Customer account id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Phone number.
    #[serde(default)]
    pub phone: String,
    /// Whether the account is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Account creation timestamp (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_joined: Option<String>,
    /// Profile gender, empty when unset.
    #[serde(default)]
    pub gender: String,
    /// Profile country, empty when unset.
    #[serde(default)]
    pub country: String,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserDetails {
    /// `"first last"`, or `None` when both names are blank.
    pub fn full_name(&self) -> Option<String> {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_owned())
    }
}

/// A booking in the local collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Stable identifier.
    pub id: BookingId,
    /// Booked service.
    #[serde(default)]
    pub service_name: String,
    /// Scheduled date as sent by the server.
    #[serde(default)]
    pub booking_date: String,
    /// Scheduled time as sent by the server.
    #[serde(default)]
    pub booking_time: String,
    /// Length of the slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// `upcoming`, `cancelled`, `completed`, or whatever the server adds later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Server-side creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Customer details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_details: Option<UserDetails>,
    /// Opaque remainder of the payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BookingRecord {
    /// Minimal record with only an id and a service.
    pub fn new(id: impl Into<BookingId>, service_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_name: service_name.into(),
            booking_date: String::new(),
            booking_time: String::new(),
            duration_minutes: None,
            status: None,
            notes: None,
            created_at: None,
            user_details: None,
            extra: Map::new(),
        }
    }

    /// Customer display name, if the payload carried one.
    pub fn customer_name(&self) -> Option<String> {
        self.user_details.as_ref().and_then(UserDetails::full_name)
    }
}

/// Payload of a deletion event.
///
/// The server sends the full record it just deleted, but only `id` is
/// guaranteed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeletedBooking {
    /// Id of the removed booking.
    pub id: BookingId,
    /// Customer details, when the server included them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_details: Option<UserDetails>,
    /// Anything else the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeletedBooking {
    /// Deletion payload carrying only an id.
    pub fn new(id: impl Into<BookingId>) -> Self {
        Self {
            id: id.into(),
            user_details: None,
            extra: Map::new(),
        }
    }
}
