//! Error types for persistent connections.

use thiserror::Error;

use crate::websocket::ConnectionState;

/// Protocol violations on a persistent connection.
///
/// These are fatal to the one connection that raised them.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation is not valid in the current state.
    #[error("Cannot {operation} a connection that is {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    /// Both text and bytes were supplied for one message.
    #[error("Only one of text and bytes may be set on an outgoing message")]
    AmbiguousPayload,

    /// Neither text nor bytes were supplied.
    #[error("Outgoing message carries neither text nor bytes")]
    EmptyPayload,

    /// The host delivered an event that is not valid in the current state.
    #[error("Expected {expected}, got {got}")]
    UnexpectedEvent {
        expected: &'static str,
        got: &'static str,
    },

    /// The peer disconnected while a message was expected.
    #[error("Peer disconnected with code {0}")]
    Disconnected(u16),

    /// The underlying channel is gone.
    #[error("Channel closed")]
    ChannelClosed,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
