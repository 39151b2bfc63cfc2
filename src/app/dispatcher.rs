use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, warn};

use super::App;
use crate::channel::{Inbound, ReceiveFn, Scope, ScopeType, SendFn};
use crate::config::AppConfig;
use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse, StatusCode};
use crate::routing::Router;
use crate::websocket::{Connection, Error as ConnectionError};

/// Routes each scope to its endpoint.
///
/// HTTP scopes get their body read, are matched, dispatched, and the response
/// is written back as a start event followed by one body event. Connection
/// scopes are wrapped in a [`Connection`] and handed to the endpoint's stream
/// handler. A path without an endpoint gets `404` in both cases.
pub struct Dispatcher {
    router: Arc<Router>,
    config: AppConfig,
}

impl Dispatcher {
    pub fn new(router: Router, config: AppConfig) -> Self {
        Self {
            router: Arc::new(router),
            config,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    async fn handle_http(&self, scope: Scope, receive: ReceiveFn, send: SendFn) -> Result<(), Error> {
        let body = match self.read_body(&receive).await {
            Ok(body) => body,
            Err(e @ Error::PayloadTooLarge(_)) => {
                warn!("Rejecting {}: {}", scope.path, e);
                let response = HttpResponse::text(StatusCode::PayloadTooLarge, "Payload too large");
                self.respond(&send, response).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let request = HttpRequest::from_scope(&scope, body)?;

        let Some(matched) = self.router.match_path(&request.path) else {
            warn!("No endpoint for {} {}", request.method, request.path);
            let response = HttpResponse::text(StatusCode::NotFound, format!("Not found: {}", request.path));
            return self.respond(&send, response).await;
        };

        let method = request.method.clone();
        let path = request.path.clone();
        debug!("{} {} -> {}", method, path, matched.endpoint.path());

        match matched.endpoint.dispatch(request, matched.params).await {
            Ok(response) => self.respond(&send, response).await,
            Err(e) => {
                error!("Error handling {} {}: {}", method, path, e);
                let response = HttpResponse::text(StatusCode::InternalServerError, "Internal server error");
                self.respond(&send, response).await?;
                Err(e)
            }
        }
    }

    async fn handle_websocket(&self, scope: Scope, receive: ReceiveFn, send: SendFn) -> Result<(), Error> {
        let connection = Connection::new(scope, receive, send);

        let Some(matched) = self.router.match_path(connection.path()) else {
            warn!("No endpoint for connection to {}", connection.path());
            connection.deny(StatusCode::NotFound).await?;
            return Ok(());
        };

        debug!("connection {} -> {}", connection.path(), matched.endpoint.path());
        let result = matched
            .endpoint
            .dispatch_stream(connection.clone(), matched.params)
            .await;
        if let Err(e) = &result {
            error!("Error handling connection to {}: {}", connection.path(), e);
        }
        result
    }

    /// Accumulate request body chunks up to the configured limit.
    async fn read_body(&self, receive: &ReceiveFn) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        loop {
            match receive().await? {
                Inbound::Request { body: chunk, more_body } => {
                    if body.len() + chunk.len() > self.config.max_body_size {
                        return Err(Error::PayloadTooLarge(self.config.max_body_size));
                    }
                    body.extend_from_slice(&chunk);
                    if !more_body {
                        return Ok(body);
                    }
                }
                Inbound::HttpDisconnect => return Err(ConnectionError::ChannelClosed.into()),
                other => {
                    return Err(ConnectionError::UnexpectedEvent {
                        expected: "http.request",
                        got: other.kind(),
                    }
                    .into())
                }
            }
        }
    }

    async fn respond(&self, send: &SendFn, mut response: HttpResponse) -> Result<(), Error> {
        if let Some(server) = &self.config.server_header {
            response.headers.set_default("server", server.clone());
        }
        for event in response.into_events() {
            send(event).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl App for Dispatcher {
    async fn call(&self, scope: Scope, receive: ReceiveFn, send: SendFn) -> Result<(), Error> {
        match scope.scope_type {
            ScopeType::Http => self.handle_http(scope, receive, send).await,
            ScopeType::WebSocket => self.handle_websocket(scope, receive, send).await,
        }
    }
}
