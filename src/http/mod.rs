//! Request and response collaborators consumed by the dispatcher.
//!
//! These types carry only what handlers and middleware need: the method
//! token, path, query, headers and body on the way in, and status, headers
//! and a single body on the way out. Wire framing stays with the host.

mod headers;
mod method;
mod request;
mod response;

// Re-export public items
pub use headers::Headers;
pub use method::Method;
pub use request::HttpRequest;
pub use response::{HttpResponse, StatusCode};
