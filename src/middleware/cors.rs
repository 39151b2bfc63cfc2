use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::app::{App, SharedApp};
use crate::channel::{Outbound, ReceiveFn, Scope, ScopeType, SendFn};
use crate::error::Error;
use crate::http::{Headers, StatusCode};

const ALLOW_ORIGIN: &str = "access-control-allow-origin";
const ALLOW_METHODS: &str = "access-control-allow-methods";
const ALLOW_HEADERS: &str = "access-control-allow-headers";
const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
const EXPOSE_HEADERS: &str = "access-control-expose-headers";
const MAX_AGE: &str = "access-control-max-age";

/// Cross-origin resource sharing.
///
/// Preflight requests (`OPTIONS` with `access-control-request-method`) are
/// answered from the endpoint's own `allow` header, so the methods offered
/// are exactly those the route serves. Preflights that ask for a method,
/// header or origin that is not allowed are turned into `400 Bad Request`.
/// Simple requests only get the origin, credentials and expose headers added.
#[derive(Debug, Clone)]
pub struct Cors {
    allow_origins: Vec<String>,
    allow_origin_regex: Option<Regex>,
    allow_headers: Vec<String>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: u64,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            allow_origin_regex: None,
            allow_headers: Vec::new(),
            allow_credentials: false,
            expose_headers: Vec::new(),
            max_age: 86_400,
        }
    }
}

impl Cors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Origins allowed verbatim. `"*"` allows any origin.
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Origins allowed by a full-match regular expression.
    pub fn allow_origin_regex(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.allow_origin_regex = Some(Regex::new(&format!("^(?:{pattern})$"))?);
        Ok(self)
    }

    /// Request headers a preflight may ask for. `"*"` allows any header.
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers
            .into_iter()
            .map(|header| header.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expose_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Seconds a browser may cache a preflight answer.
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    fn allows_all_origins(&self) -> bool {
        self.allow_origins.iter().any(|origin| origin == "*")
    }

    fn allows_all_headers(&self) -> bool {
        self.allow_headers.iter().any(|header| header == "*")
    }

    fn is_allowed_origin(&self, origin: &str) -> bool {
        if let Some(regex) = &self.allow_origin_regex {
            if regex.is_match(origin) {
                return true;
            }
        }
        self.allow_origins.iter().any(|allowed| allowed == origin)
    }

    /// Set `access-control-allow-origin`. Returns `false` when the origin is
    /// rejected. `explicit` forces echoing the origin instead of `*`.
    fn apply_allow_origin(&self, origin: &str, headers: &mut Headers, explicit: bool) -> bool {
        if self.allows_all_origins() {
            if self.allow_credentials || explicit {
                headers.set(ALLOW_ORIGIN, origin);
                headers.set("vary", "origin");
            } else {
                headers.set(ALLOW_ORIGIN, "*");
            }
            return true;
        }
        if self.is_allowed_origin(origin) {
            headers.set(ALLOW_ORIGIN, origin);
            headers.set("vary", "origin");
            return true;
        }
        false
    }

    fn apply_common(&self, headers: &mut Headers) {
        if self.allow_credentials {
            headers.set(ALLOW_CREDENTIALS, "true");
        }
        if !self.expose_headers.is_empty() {
            headers.set(EXPOSE_HEADERS, self.expose_headers.join(", "));
        }
    }

    fn preflight(&self, request: &CorsRequest, status: StatusCode, headers: &mut Headers) -> StatusCode {
        let mut allowed = self.apply_allow_origin(&request.origin, headers, false);

        let methods: Vec<String> = headers
            .remove("allow")
            .map(|allow| {
                allow
                    .split(',')
                    .map(|method| method.trim().to_string())
                    .filter(|method| !method.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let requested_method = request.requested_method.as_deref().unwrap_or_default();
        allowed &= methods
            .iter()
            .any(|method| method.eq_ignore_ascii_case(requested_method));
        headers.set(ALLOW_METHODS, methods.join(", "));

        if let Some(requested) = request.requested_headers.as_deref() {
            if self.allows_all_headers() {
                headers.set(ALLOW_HEADERS, requested);
            } else {
                if !self.allow_headers.is_empty() {
                    headers.set(ALLOW_HEADERS, self.allow_headers.join(", "));
                }
                allowed &= requested
                    .split(',')
                    .map(|header| header.trim().to_ascii_lowercase())
                    .filter(|header| !header.is_empty())
                    .all(|header| self.allow_headers.contains(&header));
            }
        }

        headers.set(MAX_AGE, self.max_age.to_string());
        self.apply_common(headers);

        if allowed {
            status
        } else {
            StatusCode::BadRequest
        }
    }

    fn simple(&self, request: &CorsRequest, headers: &mut Headers) {
        // Cookies require an explicit origin even when any origin is allowed.
        self.apply_allow_origin(&request.origin, headers, request.has_cookie);
        self.apply_common(headers);
    }
}

impl super::Layer for Cors {
    fn wrap(&self, inner: SharedApp) -> SharedApp {
        Arc::new(CorsService {
            inner,
            cors: Arc::new(self.clone()),
        })
    }
}

struct CorsRequest {
    origin: String,
    requested_method: Option<String>,
    requested_headers: Option<String>,
    has_cookie: bool,
}

impl CorsRequest {
    fn from_scope(scope: &Scope) -> Option<Self> {
        let origin = scope.headers.get("origin")?;
        Some(Self {
            origin: origin.to_string(),
            requested_method: scope
                .headers
                .get("access-control-request-method")
                .map(str::to_string),
            requested_headers: scope
                .headers
                .get("access-control-request-headers")
                .map(str::to_string),
            has_cookie: scope.headers.contains("cookie"),
        })
    }
}

struct CorsService {
    inner: SharedApp,
    cors: Arc<Cors>,
}

#[async_trait]
impl App for CorsService {
    async fn call(&self, scope: Scope, receive: ReceiveFn, send: SendFn) -> Result<(), Error> {
        if scope.scope_type != ScopeType::Http {
            return self.inner.call(scope, receive, send).await;
        }
        let Some(request) = CorsRequest::from_scope(&scope) else {
            return self.inner.call(scope, receive, send).await;
        };

        let is_preflight = scope
            .method
            .as_deref()
            .is_some_and(|method| method.eq_ignore_ascii_case("OPTIONS"))
            && request.requested_method.is_some();

        let cors = Arc::clone(&self.cors);
        let inner_send = send;
        let send: SendFn = Arc::new(move |event| {
            let event = match event {
                Outbound::ResponseStart { status, mut headers } => {
                    let status = if is_preflight {
                        cors.preflight(&request, status, &mut headers)
                    } else {
                        cors.simple(&request, &mut headers);
                        status
                    };
                    Outbound::ResponseStart { status, headers }
                }
                event => event,
            };
            inner_send(event)
        });

        self.inner.call(scope, receive, send).await
    }
}
