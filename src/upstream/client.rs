//! HTTP client for the upstream completions service.
//!
//! # Responsibilities
//! - POST completions with the `X-API-Key` header
//! - Probe `/ping`
//! - Turn non-2xx statuses and transport failures into `UpstreamError`

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::UpstreamConfig;
use crate::upstream::types::{CompletionResponse, UpstreamError};
use crate::upstream::Upstream;

/// reqwest-backed upstream client.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpUpstream {
    /// Build a client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut base_url: Url = config.base_url.parse().map_err(|e| {
            UpstreamError::Transport(format!("Invalid upstream URL '{}': {}", config.base_url, e))
        })?;
        // Endpoints are joined relative to the base, so keep its path as a directory.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        tracing::info!(base_url = %base_url, "Upstream client initialized");
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::Transport(format!("Invalid upstream path '{}': {}", path, e)))
    }
}

fn transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Transport(format!("timeout: {}", e))
    } else {
        UpstreamError::Transport(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = status.as_u16(), body = %body, "Upstream response error");
    Err(UpstreamError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call_completions(&self, body: &Value, api_key: &str) -> Result<CompletionResponse, UpstreamError> {
        let url = self.endpoint("completions")?;
        tracing::debug!(url = %url, "Upstream request");

        let response = self
            .client
            .post(url)
            .header("X-API-Key", api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    async fn ping(&self) -> Result<Value, UpstreamError> {
        let url = self.endpoint("ping")?;
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        response.json::<Value>().await.map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base_url: &str) -> HttpUpstream {
        HttpUpstream::new(&UpstreamConfig { base_url: base_url.to_string(), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_endpoint_on_bare_host() {
        let upstream = client_for("http://fastapi-service:8000");
        assert_eq!(upstream.endpoint("completions").unwrap().as_str(), "http://fastapi-service:8000/completions");
        assert_eq!(upstream.endpoint("ping").unwrap().as_str(), "http://fastapi-service:8000/ping");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let upstream = client_for("http://fastapi:8000/api");
        assert_eq!(upstream.endpoint("completions").unwrap().as_str(), "http://fastapi:8000/api/completions");

        let upstream = client_for("http://fastapi:8000/api/");
        assert_eq!(upstream.endpoint("ping").unwrap().as_str(), "http://fastapi:8000/api/ping");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpUpstream::new(&UpstreamConfig { base_url: "not a url".to_string(), ..Default::default() });
        assert!(matches!(result, Err(UpstreamError::Transport(_))));
    }
}
