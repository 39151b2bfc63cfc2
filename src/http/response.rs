//! HTTP response types and utilities.

use serde::Serialize;

use crate::channel::Outbound;
use crate::error::Error;
use crate::http::Headers;

/// HTTP status codes with their standard reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    SwitchingProtocols = 101,
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    PayloadTooLarge = 413,
    UnprocessableEntity = 422,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::SwitchingProtocols => "Switching Protocols",
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::SeeOther => "See Other",
            StatusCode::NotModified => "Not Modified",
            StatusCode::TemporaryRedirect => "Temporary Redirect",
            StatusCode::PermanentRedirect => "Permanent Redirect",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::UnprocessableEntity => "Unprocessable Entity",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// The numeric status code.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Whether this is a 4xx or 5xx status.
    pub fn is_error(&self) -> bool {
        self.as_u16() >= 400
    }

    /// Informational, `204` and `304` responses never carry a body.
    pub fn allows_body(&self) -> bool {
        let code = self.as_u16();
        !(100..200).contains(&code) && code != 204 && code != 304
    }
}

/// Represents an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers
    pub headers: Headers,
    /// The response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response with the given status code and no body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// A `text/plain` response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_content_type("text/plain; charset=utf-8")
            .with_body_string(body)
    }

    /// A `text/html` response.
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_content_type("text/html; charset=utf-8")
            .with_body_string(body)
    }

    /// An `application/json` response.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, Error> {
        Self::new(status).with_json(value)
    }

    /// A redirect to `location`, `307 Temporary Redirect` unless the status is changed.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(StatusCode::TemporaryRedirect)
            .with_header("location", location)
            .with_header("content-length", "0")
    }

    /// A bodiless response that still announces its length.
    pub fn empty(status: StatusCode) -> Self {
        if status.allows_body() {
            Self::new(status).with_header("content-length", "0")
        } else {
            Self::new(status)
        }
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.with_body_bytes(body.into().into_bytes())
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let content_length = self.body.len().to_string();
        self.with_header("content-length", content_length)
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("content-type", content_type)
    }

    /// Set the response body with a JSON value.
    ///
    /// This method serializes the provided value to JSON and sets it as the response body.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value)?;
        Ok(self
            .with_content_type("application/json")
            .with_body_bytes(json))
    }

    /// Check the response is well formed before it is handed to the host.
    ///
    /// Returns the reason it is not.
    pub fn validate(&self) -> Result<(), String> {
        if !self.status.allows_body() && !self.body.is_empty() {
            return Err(format!(
                "status {} must not carry a body ({} bytes given)",
                self.status.as_u16(),
                self.body.len()
            ));
        }

        if let Some(declared) = self.headers.get("content-length") {
            let declared: usize = declared
                .trim()
                .parse()
                .map_err(|_| format!("content-length {declared:?} is not a number"))?;
            if declared != self.body.len() {
                return Err(format!(
                    "content-length {declared} does not match body length {}",
                    self.body.len()
                ));
            }
        }

        Ok(())
    }

    /// Whether [`validate`](Self::validate) passes.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The start event followed by the single terminating body event.
    pub fn into_events(self) -> [Outbound; 2] {
        [
            Outbound::ResponseStart {
                status: self.status,
                headers: self.headers,
            },
            Outbound::ResponseBody {
                body: self.body,
                more_body: false,
            },
        ]
    }
}
