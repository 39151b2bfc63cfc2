//! Application assembly and the top-level dispatcher.
//!
//! An [`Application`] collects routes, casts, mounted [`SubApp`]s and
//! middleware layers. [`Application::build`] freezes it into a [`SharedApp`]
//! the host calls once per scope.

mod application;
mod dispatcher;
mod tests;

use std::sync::Arc;

use async_trait::async_trait;

use crate::channel::{ReceiveFn, Scope, SendFn};
use crate::error::Error;

pub use application::{Application, Routes, SubApp};
pub use dispatcher::Dispatcher;

/// Something that can serve a scope: the dispatcher or a middleware around it.
#[async_trait]
pub trait App: Send + Sync + 'static {
    async fn call(&self, scope: Scope, receive: ReceiveFn, send: SendFn) -> Result<(), Error>;
}

/// A shareable, type-erased [`App`].
pub type SharedApp = Arc<dyn App>;
