//! Source picture downloads.

use std::time::Duration;

use async_trait::async_trait;

use super::{AssetFetcher, TransferError};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads pictures over plain HTTP(S).
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("boardd/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let failed = |status: Option<u16>, message: String| TransferError {
            url: url.to_string(),
            status,
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(
                Some(status.as_u16()),
                format!("server answered {}", status),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| failed(Some(status.as_u16()), e.to_string()))?;
        tracing::debug!(url, size = bytes.len(), "Downloaded source picture");
        Ok(bytes.to_vec())
    }
}
