//! Persistent duplex connections.
//!
//! A [`Connection`] enforces the `connecting -> open -> closed` lifecycle on
//! top of a host channel: data only flows after `accept`, nothing is sent
//! after a close, and every inbound event is checked against the current
//! state.

mod connection;
mod error;
mod handler;
mod message;

// Re-export public items
pub use connection::{Connection, ConnectionState};
pub use error::Error;
pub use handler::{Session, WebSocketHandler};
pub use message::{close_code, Message, Payload};
