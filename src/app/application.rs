use std::future::Future;
use std::sync::Arc;

use log::info;

use super::{Dispatcher, SharedApp};
use crate::config::AppConfig;
use crate::endpoint::{FnHandler, HttpHandler, StreamHandler, WEBSOCKET};
use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse, Method};
use crate::middleware::{build_chain, Layer};
use crate::routing::{Cast, Error as RouteError, Params, Router};
use crate::websocket::{Connection, Session, WebSocketHandler};

/// Route registration shared by [`Application`] and [`SubApp`].
///
/// Every method fails on the first invalid registration and returns `self`
/// otherwise, so calls can be chained with `?`.
pub trait Routes: Sized {
    fn router_mut(&mut self) -> &mut Router;

    /// Bind an async function to `methods` at `path`.
    fn route<F, Fut>(&mut self, path: &str, methods: &[Method], handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.route_handler(path, methods, FnHandler(handler))
    }

    fn route_handler<H: HttpHandler>(
        &mut self,
        path: &str,
        methods: &[Method],
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.router_mut().add_route(path, methods, Arc::new(handler))?;
        Ok(self)
    }

    /// Bind an async function driving a persistent connection at `path`.
    fn websocket<F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(Connection, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.websocket_handler(path, FnHandler(handler))
    }

    fn websocket_handler<H: StreamHandler>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.router_mut().add_stream_route(path, Arc::new(handler))?;
        Ok(self)
    }

    /// Bind a callback handler at `path`; `factory` runs once per connection.
    fn session<F, H>(&mut self, path: &str, factory: F) -> Result<&mut Self, RouteError>
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: WebSocketHandler,
    {
        self.websocket_handler(path, Session::new(factory))
    }

    fn register_cast(&mut self, name: &str, cast: impl Cast) -> Result<&mut Self, RouteError> {
        self.router_mut().register_cast(name, cast)?;
        Ok(self)
    }

    /// Graft `subapp` beneath its prefix.
    fn mount(&mut self, subapp: SubApp) -> Result<&mut Self, RouteError> {
        let SubApp { prefix, router } = subapp;
        self.router_mut().merge_router(&prefix, router)?;
        Ok(self)
    }
}

/// The top-level application.
///
/// # Example
///
/// ```
/// use microroute::{AppConfig, Application, HttpResponse, Method, Routes, StatusCode};
///
/// let mut app = Application::new(AppConfig::named("example"));
/// app.route("/users/{id:int}", &[Method::GET], |_request, params| async move {
///     let id = params.get_int("id").unwrap_or_default();
///     Ok(HttpResponse::text(StatusCode::Ok, format!("user {id}")))
/// })
/// .unwrap();
/// let _app = app.build();
/// ```
pub struct Application {
    config: AppConfig,
    router: Router,
    layers: Vec<Arc<dyn Layer>>,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            layers: Vec::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Add a middleware layer. The first layer added is the outermost.
    pub fn layer(&mut self, layer: impl Layer) -> &mut Self {
        self.layers.push(Arc::new(layer));
        self
    }

    pub fn url_for(&self, template: &str, params: &Params) -> Result<String, RouteError> {
        self.router.url_for(template, params)
    }

    /// Log every registered endpoint with its methods.
    pub fn display_routes(&self) {
        let routes = self.router.routes();
        info!("{}: {} endpoint(s)", self.config.name, routes.len());
        for route in routes {
            let mut methods: Vec<String> = route.methods.iter().map(Method::to_string).collect();
            if route.websocket {
                methods.push(WEBSOCKET.to_string());
            }
            info!("  {:<40} {}", route.path, methods.join(", "));
        }
    }

    /// Freeze the routes and wrap the dispatcher in the configured layers.
    pub fn build(self) -> SharedApp {
        self.display_routes();
        let core: SharedApp = Arc::new(Dispatcher::new(self.router, self.config));
        build_chain(core, &self.layers)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl Routes for Application {
    fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}

/// A group of routes registered under a common prefix, mounted onto an
/// [`Application`] or another `SubApp`.
#[derive(Debug, Default)]
pub struct SubApp {
    prefix: String,
    router: Router,
}

impl SubApp {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            router: Router::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl Routes for SubApp {
    fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}
