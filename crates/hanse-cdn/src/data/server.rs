//! Content server descriptions.

use std::fmt;

/// URL scheme a content server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one content endpoint.
///
/// A server either serves content directly or, when `use_as_proxy` is set
/// and a path template is present, fronts another server by rewriting the
/// request path. The template understands two tokens: `%host%` (the origin
/// host) and `%path%` (the command path, leading slash included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub use_as_proxy: bool,
    pub proxy_path_template: Option<String>,
}

impl Server {
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            use_as_proxy: false,
            proxy_path_template: None,
        }
    }

    /// A server that fronts origins through a rewriting path template.
    ///
    /// # Examples
    ///
    /// ```
    /// use hanse_cdn::{Scheme, Server};
    ///
    /// let lan = Server::proxy(Scheme::Http, "cache.lan", 8080, "/proxy/%host%%path%");
    /// assert!(lan.use_as_proxy);
    /// ```
    pub fn proxy(
        scheme: Scheme,
        host: impl Into<String>,
        port: u16,
        template: impl Into<String>,
    ) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            use_as_proxy: true,
            proxy_path_template: Some(template.into()),
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
