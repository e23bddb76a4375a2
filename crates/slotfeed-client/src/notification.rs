//! User-facing notifications derived from feed events.

use std::fmt;

use serde::{Deserialize, Serialize};
use slotfeed_core::{BookingRecord, DeletedBooking, UserDetails};

/// Name shown when a payload carries no customer details.
pub const UNKNOWN_CUSTOMER: &str = "Unknown customer";

/// Severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    /// Something was added.
    Success,
    /// Something changed.
    Info,
    /// Something was removed.
    Warning,
    /// The feed is gone.
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A title/body pair for a UI banner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short heading.
    pub title: String,
    /// One-line description.
    pub body: String,
    /// Severity.
    pub level: NotificationLevel,
}

fn customer(details: Option<&UserDetails>) -> String {
    details
        .and_then(UserDetails::full_name)
        .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_owned())
}

impl Notification {
    /// `booking_created`.
    pub fn created(record: &BookingRecord) -> Self {
        Self {
            title: "New Booking Created".into(),
            body: format!(
                "{} booked {} for {} at {}",
                customer(record.user_details.as_ref()),
                record.service_name,
                record.booking_date,
                record.booking_time
            ),
            level: NotificationLevel::Success,
        }
    }

    /// `booking_updated`.
    pub fn updated(record: &BookingRecord) -> Self {
        Self {
            title: "Booking Updated".into(),
            body: format!(
                "Booking for {} has been updated",
                customer(record.user_details.as_ref())
            ),
            level: NotificationLevel::Info,
        }
    }

    /// `booking_deleted`.
    pub fn deleted(deleted: &DeletedBooking) -> Self {
        Self {
            title: "Booking Deleted".into(),
            body: format!(
                "Booking for {} has been deleted",
                customer(deleted.user_details.as_ref())
            ),
            level: NotificationLevel::Warning,
        }
    }

    /// Reconnect ceiling reached.
    pub fn retry_exhausted(attempts: u32) -> Self {
        Self {
            title: "Connection Lost".into(),
            body: format!("Max reconnection attempts reached ({attempts})"),
            level: NotificationLevel::Error,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.title, self.body)
    }
}
