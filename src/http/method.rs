//! HTTP request methods.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// HTTP request methods as defined in RFC 7231 and common extensions.
///
/// The declaration order is the order used when listing methods in an
/// `allow` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// GET method: Requests a representation of the specified resource.
    GET,
    /// HEAD method: Same as GET but only transfers the status line and header section.
    HEAD,
    /// POST method: Submits data to be processed to the identified resource.
    POST,
    /// PUT method: Replaces all current representations of the target resource with the request payload.
    PUT,
    /// DELETE method: Deletes the specified resource.
    DELETE,
    /// PATCH method: Applies partial modifications to a resource.
    PATCH,
    /// OPTIONS method: Describes the communication options for the target resource.
    OPTIONS,
    /// TRACE method: Performs a message loop-back test along the path to the target resource.
    TRACE,
}

impl Method {
    /// Every method, in `allow` header order.
    pub const ALL: [Method; 8] = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::OPTIONS,
        Method::TRACE,
    ];

    /// The upper-case method token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
        }
    }
}

// Method tokens are matched case-insensitively and normalized to upper case.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase();
        Method::ALL
            .iter()
            .copied()
            .find(|method| method.as_str() == token)
            .ok_or_else(|| Error::InvalidMethod(s.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
