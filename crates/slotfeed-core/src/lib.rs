//! # slotfeed-core
//!
//! Foundation types, errors, and utilities for the slotfeed booking client.
//!
//! This crate provides the shared vocabulary that the other slotfeed crates depend on:
//!
//! - **Booking ids**: [`BookingId`] accepting numeric or textual ids from the wire
//! - **Records**: [`BookingRecord`], [`UserDetails`], [`DeletedBooking`]
//! - **Connection state**: [`ConnectionState`] and the bounded [`RetryState`]
//! - **Errors**: [`FeedError`] taxonomy via `thiserror`
//! - **Reconnect config**: fixed-interval [`ReconnectConfig`]
//! - **Logging**: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod booking;
pub mod connection;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod retry;

pub use booking::{BookingRecord, DeletedBooking, UserDetails};
pub use connection::{ConnectionState, RetryState};
pub use errors::{
    BoxError, ErrorCategory, FeedError, HandlerError, ProtocolError, TransportError,
};
pub use ids::BookingId;
pub use retry::ReconnectConfig;
