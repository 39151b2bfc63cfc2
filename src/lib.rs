//! A request-dispatch layer for async hosts.
//!
//! This library routes the scopes a host server hands over to handlers bound
//! on a prefix trie of path templates, and drives persistent connections
//! through a strict `connecting -> open -> closed` lifecycle.
//!
//! # Features
//!
//! - Path templates with typed bindings: `/users/{id:int}/posts/{slug}`
//! - Built-in `str`, `int`, `float` and `bool` casts, plus custom casts
//! - Literal segments always win over variable ones
//! - Automatic `OPTIONS` and `405 Method Not Allowed` answers with an `allow` header
//! - Sub-applications mounted under a prefix, with conflicts detected up front
//! - Persistent connections with checked state transitions
//! - Middleware layers: CORS, HTML error pages, access logging
//!
//! # Examples
//!
//! ## Routing
//!
//! ```
//! use microroute::Router;
//!
//! let mut router = Router::new();
//! router.endpoint_mut("/users/{id:int}").unwrap();
//!
//! let matched = router.match_path("/users/42").unwrap();
//! assert_eq!(matched.params.get_int("id"), Some(42));
//! assert!(router.match_path("/users/abc").is_none());
//! ```
//!
//! ## Sub-applications
//!
//! ```
//! use microroute::{Application, HttpResponse, Method, Routes, StatusCode, SubApp};
//!
//! let mut api = SubApp::new("/api");
//! api.route("/health", &[Method::GET], |_request, _params| async {
//!     Ok(HttpResponse::text(StatusCode::Ok, "ok"))
//! })
//! .unwrap();
//!
//! let mut app = Application::default();
//! app.mount(api).unwrap();
//! assert!(app.router().match_path("/api/health").is_some());
//! ```
//!
//! ## Error handling
//!
//! ```
//! use microroute::{RouteError, Router};
//!
//! let mut router = Router::new();
//! match router.endpoint_mut("/files/{name:path}") {
//!     Err(RouteError::UnknownCast(cast)) => println!("Unknown cast: {}", cast),
//!     Err(err) => println!("Other error: {}", err),
//!     Ok(_) => println!("Registered"),
//! }
//! ```

pub mod app;
pub mod channel;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routing;
pub mod timer;
pub mod websocket;

// Re-export commonly used items for convenience
pub use app::{App, Application, Dispatcher, Routes, SharedApp, SubApp};
pub use channel::{memory_channel, Inbound, Outbound, Peer, ReceiveFn, Scope, ScopeType, SendFn};
pub use config::AppConfig;
pub use endpoint::{Endpoint, FnHandler, HttpHandler, StreamHandler};
pub use error::Error;
pub use http::{Headers, HttpRequest, HttpResponse, Method, StatusCode};
pub use middleware::{AccessLog, Cors, ErrorPages, Layer};
pub use routing::{Cast, Error as RouteError, Params, Router, Value};
pub use timer::{set_interval, set_timeout, Timer};
pub use websocket::{
    close_code, Connection, ConnectionState, Error as ConnectionError, Message, Payload, Session,
    WebSocketHandler,
};
