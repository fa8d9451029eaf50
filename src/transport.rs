//! HTTP transport seam.
//!
//! The executor and token source talk to the remote endpoint through this
//! trait so tests can substitute a scripted transport. The reqwest adapter is
//! the only implementation used at runtime.

use async_trait::async_trait;
use http::HeaderMap;
use thiserror::Error;
use url::Url;

/// Connection-level faults. A value of this type means no usable response was
/// received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Minimal response representation shared by the executor and classifier.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Contract for posting JSON bodies to the gated endpoints.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError>;
}

/// Reqwest-backed transport.
///
/// The client is built without a cookie store: session cookies are owned by
/// [`SessionState`] and attached explicitly per request.
///
/// [`SessionState`]: crate::session::SessionState
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| TransportError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(url.as_str())
            .headers(headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
