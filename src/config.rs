//! Application configuration.

use serde::Deserialize;

/// Application configuration.
///
/// Every field has a default, so a partial document deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name used in log output.
    pub name: String,
    /// Value of the `server` header added to responses that lack one.
    pub server_header: Option<String>,
    /// Maximum accumulated request body size, in bytes.
    pub max_body_size: usize,
}

impl AppConfig {
    /// Default configuration with the given application name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            server_header: Some("microroute".to_string()),
            max_body_size: 1024 * 1024,
        }
    }
}
