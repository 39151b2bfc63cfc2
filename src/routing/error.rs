//! Error types for route registration.

use thiserror::Error;

/// Configuration errors raised while building a router.
///
/// All of these surface at registration time, before any traffic is served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The path template is malformed.
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A variable segment names a cast that is not registered.
    #[error("Unknown cast: {0}")]
    UnknownCast(String),

    /// A different cast is already registered under this name.
    #[error("Cast {0} is already registered with a different pattern")]
    DuplicateCast(String),

    /// Two registries define the same cast name with different patterns.
    #[error("Cast {name} conflicts on merge: {existing:?} vs {incoming:?}")]
    CastConflict {
        name: String,
        existing: String,
        incoming: String,
    },

    /// The cast pattern is not a valid regular expression.
    #[error("Invalid pattern for cast {name}: {reason}")]
    InvalidPattern { name: String, reason: String },

    /// A binding name appears more than once along one path.
    #[error("Binding {binding} appears more than once in {path}")]
    DuplicateBinding { path: String, binding: String },

    /// The same cast is already bound under another name at this trie level.
    #[error("Cast {cast} at {path} is already bound as {existing}, not {incoming}")]
    BindingConflict {
        path: String,
        cast: String,
        existing: String,
        incoming: String,
    },

    /// An endpoint already exists at this path.
    #[error("An endpoint is already registered at {0}")]
    EndpointConflict(String),

    /// The method (or the persistent-connection slot) already has a handler.
    #[error("{method} handler is already registered for {path}")]
    DuplicateMethod { path: String, method: String },

    /// A path parameter needed to render a URL is missing.
    #[error("Missing parameter {binding} for {path}")]
    MissingParam { path: String, binding: String },

    /// A path parameter cannot be rendered by its cast.
    #[error("Parameter {binding} cannot be rendered as {cast}")]
    ParamMismatch { binding: String, cast: String },
}
