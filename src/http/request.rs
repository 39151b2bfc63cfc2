use std::net::SocketAddr;

use serde::de::DeserializeOwned;

use crate::channel::{Scope, ScopeType};
use crate::error::Error;
use crate::http::{Headers, Method};

/// Represents an HTTP request handed to a handler.
///
/// Built from the inbound scope plus the fully accumulated request body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The method token, normalized to upper case.
    pub method: String,

    /// The request path, without the query string.
    pub path: String,

    /// Decoded query string pairs, in order of appearance.
    pub query: Vec<(String, String)>,

    /// The request headers.
    pub headers: Headers,

    /// Address of the remote peer, when the host knows it.
    pub client: Option<SocketAddr>,

    /// The HTTP version announced by the host, e.g. `1.1`.
    pub http_version: String,

    /// The request body.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a bodiless request for `method` and `path`.
    ///
    /// A `?` in `path` splits off the query string.
    pub fn new(method: impl AsRef<str>, path: impl AsRef<str>) -> Self {
        let (path, query_string) = match path.as_ref().split_once('?') {
            Some((path, query)) => (path, query),
            None => (path.as_ref(), ""),
        };
        Self {
            method: method.as_ref().trim().to_ascii_uppercase(),
            path: path.to_string(),
            query: parse_query(query_string),
            headers: Headers::new(),
            client: None,
            http_version: "1.1".to_string(),
            body: Vec::new(),
        }
    }

    /// Builds a request from an HTTP scope and its body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] when the scope is not an HTTP scope or
    /// carries no method.
    pub fn from_scope(scope: &Scope, body: Vec<u8>) -> Result<Self, Error> {
        if scope.scope_type != ScopeType::Http {
            return Err(Error::InvalidScope(format!(
                "expected an http scope, got {}",
                scope.scope_type
            )));
        }
        let method = scope
            .method
            .as_deref()
            .ok_or_else(|| Error::InvalidScope("http scope without a method".to_string()))?;

        Ok(Self {
            method: method.trim().to_ascii_uppercase(),
            path: scope.path.clone(),
            query: parse_query(&scope.query_string),
            headers: scope.headers.clone(),
            client: scope.client,
            http_version: scope.http_version.clone(),
            body,
        })
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The parsed method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMethod`] for tokens outside [`Method::ALL`].
    pub fn method(&self) -> Result<Method, Error> {
        self.method.parse()
    }

    /// Gets a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Checks if a header exists (case-insensitive).
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// First query value for `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Checks if the request has a JSON content type.
    pub fn is_json(&self) -> bool {
        self.get_header("content-type")
            .map(|content_type| content_type.starts_with("application/json"))
            .unwrap_or(false)
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<&str, Error> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

fn parse_query(query_string: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query_string.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
