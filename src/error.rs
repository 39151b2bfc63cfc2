//! Crate-level error type.

use thiserror::Error;

use crate::routing::Error as RouteError;
use crate::websocket::Error as ConnectionError;

/// Errors surfaced by handlers and the dispatcher.
///
/// Configuration problems arrive as [`Error::Route`] and are fatal to startup;
/// everything else is scoped to the single request or connection that raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid route registration.
    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    /// Protocol violation on a persistent connection.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The method token is not a known HTTP method.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A handler produced a response that fails [`HttpResponse::validate`](crate::HttpResponse::validate).
    #[error("Handler for {path} returned an invalid response: {reason}")]
    InvalidResponse { path: String, reason: String },

    /// The scope handed over by the host is unusable.
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// The request body is not valid UTF-8.
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] std::str::Utf8Error),

    /// The request body exceeded the configured limit.
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Handler-defined failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
