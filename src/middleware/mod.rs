//! Middleware composition.
//!
//! A middleware is an [`App`] that owns the next stage and calls it. A
//! [`Layer`] builds one around a given inner app; [`build_chain`] folds an
//! ordered list of layers around the dispatcher so the first declared layer
//! sees inbound scopes first and outbound events last.
//!
//! Layers may rewrite outbound events but must keep HTTP framing intact: one
//! `http.response.start` followed by exactly one terminating
//! `http.response.body`.

mod access_log;
mod cors;
mod error_pages;

use std::sync::Arc;

use crate::app::SharedApp;

pub use access_log::AccessLog;
pub use cors::Cors;
pub use error_pages::ErrorPages;

/// Builds a middleware around an inner app.
pub trait Layer: Send + Sync + 'static {
    fn wrap(&self, inner: SharedApp) -> SharedApp;
}

impl<F> Layer for F
where
    F: Fn(SharedApp) -> SharedApp + Send + Sync + 'static,
{
    fn wrap(&self, inner: SharedApp) -> SharedApp {
        self(inner)
    }
}

/// Wrap `core` in `layers`, the first layer ending up outermost.
pub fn build_chain(core: SharedApp, layers: &[Arc<dyn Layer>]) -> SharedApp {
    layers
        .iter()
        .rev()
        .fold(core, |inner, layer| layer.wrap(inner))
}
