//! Wire protocol: JSON text frames.
//!
//! Inbound frames are `{"type": <kind>, "data": <payload>}`. Outbound frames
//! are flat: `{"type": <kind>, ...fields}`.

pub mod codec;
pub mod messages;

pub use codec::{decode, encode};
pub use messages::{Envelope, InboundMessage, OutboundRequest, kinds};
