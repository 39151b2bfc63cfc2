//! Handler capabilities bound to endpoints.

use std::future::Future;

use async_trait::async_trait;

use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};
use crate::routing::Params;
use crate::websocket::Connection;

/// Handles one HTTP request.
///
/// Closures are adapted with [`FnHandler`]; stateful handlers implement the
/// trait directly.
#[async_trait]
pub trait HttpHandler: Send + Sync + 'static {
    async fn handle(&self, request: HttpRequest, params: Params) -> Result<HttpResponse, Error>;
}

/// Drives one persistent connection from handshake to close.
#[async_trait]
pub trait StreamHandler: Send + Sync + 'static {
    async fn handle(&self, connection: Connection, params: Params) -> Result<(), Error>;
}

/// Adapts an async function into a handler.
#[derive(Debug, Clone, Copy)]
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> HttpHandler for FnHandler<F>
where
    F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, request: HttpRequest, params: Params) -> Result<HttpResponse, Error> {
        (self.0)(request, params).await
    }
}

#[async_trait]
impl<F, Fut> StreamHandler for FnHandler<F>
where
    F: Fn(Connection, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn handle(&self, connection: Connection, params: Params) -> Result<(), Error> {
        (self.0)(connection, params).await
    }
}
