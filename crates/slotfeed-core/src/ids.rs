//! Booking identifiers.
//!
//! The feed server emits primary keys as JSON numbers, but nothing in the
//! protocol forbids textual ids. [`BookingId`] accepts both and compares them
//! by their canonical text, so `1` and `"1"` name the same booking.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identifier of a booking, unique within a collection and stable across updates.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingId {
    /// Numeric id as sent by the server.
    Number(i64),
    /// Textual id.
    Text(String),
}

impl BookingId {
    /// Canonical text form used for equality and hashing.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl PartialEq for BookingId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(n), Self::Text(t)) | (Self::Text(t), Self::Number(n)) => {
                *t == n.to_string()
            }
        }
    }
}

impl Eq for BookingId {}

impl Hash for BookingId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for BookingId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for BookingId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for BookingId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
