//! HTTP transport

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::TransportError;
use crate::request::{ApiRequest, ApiResponse, Method};
use crate::Result;

/// Upper bound for any single backend call, so startup cannot hang forever.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Sends one request to the backend. Implementations return `Ok` for every
/// response the server produced, whatever its status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;

        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme: {}",
                base_url.scheme()
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `path` to the base URL, keeping any base path prefix (`/api`).
    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.endpoint(&request.path)?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(
                method = request.method.as_str(),
                path = %request.path,
                error = %e,
                "Request did not reach server"
            );
            TransportError::from(e)
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        tracing::debug!(
            method = request.method.as_str(),
            path = %request.path,
            status,
            "Request completed"
        );

        Ok(ApiResponse { status, body })
    }
}
