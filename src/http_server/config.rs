//! HTTP front end settings
//!
//! Built from the `httpHost`, `httpPort` and `corsOrigins` keys of an
//! environment section. Origins are parsed when the config is built, so a bad
//! entry fails the config load instead of vanishing from the CORS layer.

use axum::http::HeaderValue;

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Bind address and CORS policy
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    host: String,
    port: u16,
    /// Empty answers every origin with `*`
    cors_origins: Vec<HeaderValue>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_HOST, DEFAULT_HTTP_PORT)
    }
}

impl HttpServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            cors_origins: Vec::new(),
        }
    }

    /// Only answer CORS requests from `origins` (`http(s)://host[:port]`).
    pub fn with_cors_origins<I, S>(mut self, origins: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cors_origins = origins
            .into_iter()
            .map(|origin| parse_origin(origin.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn cors_origins(&self) -> &[HeaderValue] {
        &self.cors_origins
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origin(origin: &str) -> Result<HeaderValue, String> {
    let invalid = || format!("invalid CORS origin '{}'", origin);
    let rest = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
        .ok_or_else(invalid)?;
    if rest.is_empty() || rest.contains('/') {
        return Err(invalid());
    }
    HeaderValue::from_str(origin).map_err(|_| invalid())
}
