//! Endpoints: the handlers bound to one resolved path.
//!
//! An endpoint maps HTTP methods to handlers and may also hold a single
//! persistent-connection handler. Requests for methods without a handler
//! are answered locally: `OPTIONS` lists the allowed methods, anything else
//! gets a `405` with the same list.

mod handler;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, error, warn};

use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse, Method, StatusCode};
use crate::routing::{Error as RouteError, Params};
use crate::websocket::Connection;

pub use handler::{FnHandler, HttpHandler, StreamHandler};

/// Method token used for the persistent-connection slot in errors and logs.
pub const WEBSOCKET: &str = "WEBSOCKET";

/// The handlers bound to one trie node.
#[derive(Clone)]
pub struct Endpoint {
    path: String,
    handlers: BTreeMap<Method, Arc<dyn HttpHandler>>,
    stream: Option<Arc<dyn StreamHandler>>,
}

impl Endpoint {
    /// Create an endpoint without handlers for the template `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handlers: BTreeMap::new(),
            stream: None,
        }
    }

    /// The path template this endpoint was created for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Move the template beneath `prefix`, as happens when a sub-router is mounted.
    pub(crate) fn rebase(&mut self, prefix: &str) {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            return;
        }
        let rest = self.path.trim_start_matches('/');
        self.path = if rest.is_empty() {
            format!("/{prefix}")
        } else {
            format!("/{prefix}/{rest}")
        };
    }

    /// Bind `handler` to every method in `methods`.
    ///
    /// Nothing is bound if any of the methods already has a handler.
    pub fn add_handler(&mut self, methods: &[Method], handler: Arc<dyn HttpHandler>) -> Result<(), RouteError> {
        if let Some(taken) = methods.iter().find(|method| self.handlers.contains_key(*method)) {
            return Err(RouteError::DuplicateMethod {
                path: self.path.clone(),
                method: taken.to_string(),
            });
        }
        for method in methods {
            self.handlers.insert(*method, Arc::clone(&handler));
        }
        debug!("Bound {methods:?} at {}", self.path);
        Ok(())
    }

    /// Bind the persistent-connection handler. Only one may be bound.
    pub fn add_stream_handler(&mut self, handler: Arc<dyn StreamHandler>) -> Result<(), RouteError> {
        if self.stream.is_some() {
            return Err(RouteError::DuplicateMethod {
                path: self.path.clone(),
                method: WEBSOCKET.to_string(),
            });
        }
        self.stream = Some(handler);
        debug!("Bound {WEBSOCKET} at {}", self.path);
        Ok(())
    }

    /// Builder form of [`add_handler`](Self::add_handler).
    pub fn with_handler(mut self, methods: &[Method], handler: Arc<dyn HttpHandler>) -> Result<Self, RouteError> {
        self.add_handler(methods, handler)?;
        Ok(self)
    }

    /// Builder form of [`add_stream_handler`](Self::add_stream_handler).
    pub fn with_stream_handler(mut self, handler: Arc<dyn StreamHandler>) -> Result<Self, RouteError> {
        self.add_stream_handler(handler)?;
        Ok(self)
    }

    /// Methods with an explicit handler, in `allow` order.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.handlers.keys().copied()
    }

    /// Explicit methods plus `OPTIONS`, which is always answered.
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut allowed: Vec<Method> = self.methods().collect();
        if !allowed.contains(&Method::OPTIONS) {
            allowed.push(Method::OPTIONS);
            allowed.sort();
        }
        allowed
    }

    /// The `allow` header value.
    pub fn allow_header(&self) -> String {
        self.allowed_methods()
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_stream_handler(&self) -> bool {
        self.stream.is_some()
    }

    /// Route an HTTP request to the handler for its method.
    ///
    /// # Errors
    ///
    /// Handler errors are passed through. A handler response that fails
    /// [`HttpResponse::validate`] is reported as [`Error::InvalidResponse`].
    pub async fn dispatch(&self, request: HttpRequest, params: Params) -> Result<HttpResponse, Error> {
        let method = request.method().ok();
        let handler = method.and_then(|method| self.handlers.get(&method));

        let Some(handler) = handler else {
            return Ok(self.default_response(method, &request));
        };

        let response = handler.handle(request, params).await?;
        if let Err(reason) = response.validate() {
            error!("Handler for {} returned an invalid response: {reason}", self.path);
            return Err(Error::InvalidResponse {
                path: self.path.clone(),
                reason,
            });
        }
        Ok(response)
    }

    /// Hand a persistent connection to the bound handler.
    ///
    /// Without one, the connection is refused with `403` before the handshake.
    pub async fn dispatch_stream(&self, connection: Connection, params: Params) -> Result<(), Error> {
        match &self.stream {
            Some(handler) => handler.handle(connection, params).await,
            None => {
                warn!("No {WEBSOCKET} handler at {}, refusing connection", self.path);
                connection.deny(StatusCode::Forbidden).await?;
                Ok(())
            }
        }
    }

    fn default_response(&self, method: Option<Method>, request: &HttpRequest) -> HttpResponse {
        let allow = self.allow_header();
        if method == Some(Method::OPTIONS) {
            return HttpResponse::empty(StatusCode::NoContent).with_header("allow", allow);
        }

        debug!("Method {} not allowed for {}", request.method, request.path);
        HttpResponse::empty(StatusCode::MethodNotAllowed).with_header("allow", allow)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .field("websocket", &self.stream.is_some())
            .finish()
    }
}
