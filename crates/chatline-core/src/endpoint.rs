//! Chat endpoint derivation.
//!
//! The endpoint lives at a fixed path on the host that served the page. Its
//! scheme follows the page's: secure pages connect over `wss`, insecure pages
//! over `ws`.

use std::fmt;

use crate::error::ConnectionError;

/// Path of the chat endpoint on the serving host.
pub const DEFAULT_PATH: &str = "/ws/chat/";

/// WebSocket URL of the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    secure: bool,
}

impl Endpoint {
    /// Derive the endpoint from a page origin such as `https://example.com`.
    ///
    /// Any path on the origin is discarded. `ws`/`wss` origins are accepted
    /// as-is so the client can be pointed straight at a socket server.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidOrigin` if the scheme is not one of
    ///   `http`, `https`, `ws`, `wss`, or the host is empty
    pub fn from_origin(origin: &str, path: &str) -> Result<Self, ConnectionError> {
        let origin = origin.trim();
        let Some((scheme, rest)) = origin.split_once("://") else {
            return Err(ConnectionError::InvalidOrigin(origin.to_string()));
        };

        let secure = match scheme.to_ascii_lowercase().as_str() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            _ => return Err(ConnectionError::InvalidOrigin(origin.to_string())),
        };

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(ConnectionError::InvalidOrigin(origin.to_string()));
        }

        let scheme = if secure { "wss" } else { "ws" };
        let url = if path.starts_with('/') {
            format!("{scheme}://{host}{path}")
        } else {
            format!("{scheme}://{host}/{path}")
        };

        Ok(Self { url, secure })
    }

    /// Full endpoint URL.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Whether the endpoint uses TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
