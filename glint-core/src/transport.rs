//! Network side of the fetch path.

use std::time::Duration;

use reqwest::Client;

use crate::error::{LoaderError, Result};

/// Blocking-from-the-caller's-view "get the bytes at this URL" primitive.
///
/// Implementations must report every failure, including non-success HTTP
/// statuses, as [`LoaderError::Network`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Transfer the full body at `url`.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Default request timeout for [`HttpTransport`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed transport with a pooled client. Makes one attempt per
/// call; failures are final.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Client with [`DEFAULT_TIMEOUT`] and reqwest's default user agent.
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_TIMEOUT, None)
    }

    /// Client with an explicit timeout and optional `User-Agent` header.
    pub fn with_config(
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder.build().map_err(|e| {
            LoaderError::Internal(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client })
    }

    /// Wrap a preconfigured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoaderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LoaderError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoaderError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
