//! HTTP fetcher for external guidelines

use reqwest::Client;
use sdk::errors::EngineError;
use std::time::Duration;
use tracing::{debug, info};

const CAPABILITY: &str = "fetch";

/// Largest body accepted from a remote resource
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("medmeter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET `url` and return the body as text
    pub async fn fetch(&self, url: &str) -> Result<String, EngineError> {
        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(EngineError::InvalidInput(format!(
                "Fetch needs an http(s) URL, got '{}'",
                url
            )));
        }

        info!("Fetching: {}", url);
        let mut resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::capability(CAPABILITY, format!("Timed out fetching {}", url))
            } else {
                EngineError::Network(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EngineError::capability(
                CAPABILITY,
                format!("Fetching {} failed with status {}", url, status.as_u16()),
            ));
        }

        let too_large = || {
            EngineError::capability(
                CAPABILITY,
                format!("Resource {} exceeds {} bytes", url, MAX_BODY_BYTES),
            )
        };

        if resp
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?
        {
            if bytes.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&bytes).into_owned();
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_http() {
        let fetcher = Fetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
