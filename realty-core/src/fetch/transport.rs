//! Transports turn a resolved request into a response body.
//!
//! Strategies own the parsing; a transport only moves bytes. Swapping the
//! transport (HTTP vs. synthetic) never changes how a body is interpreted.

use super::error::FetchError;
use super::strategy::StrategyKind;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("realty/", env!("CARGO_PKG_VERSION"));

/// One outgoing request.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub index: &'a str,
    pub kind: StrategyKind,
    pub endpoint: &'a str,
    pub query: &'a [(String, String)],
    /// Only set for scrape requests.
    pub selector: Option<&'a str>,
}

/// Source of response bodies.
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, request: &Request<'_>) -> Result<String, FetchError>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, request: &Request<'_>) -> Result<String, FetchError> {
        let mut builder = self.client.get(request.endpoint);
        if !request.query.is_empty() {
            builder = builder.query(request.query);
        }

        let resp = builder
            .send()
            .map_err(|e| FetchError::Transport(format!("{}: {e}", request.index)))?;
        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(FetchError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "HTTP {status} for {}",
                request.index
            )));
        }

        resp.text()
            .map_err(|e| FetchError::Transport(format!("{}: reading body: {e}", request.index)))
    }
}
