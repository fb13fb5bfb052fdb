use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{ExplorerError, Result};
use crate::timeframe::Timeframe;

/// Where a CSV table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    Http(Url),
    Local(PathBuf),
}

impl DataLocation {
    /// Parse an explicit file path or `http(s)://` URL.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if is_http(text) {
            let url = Url::parse(text)
                .map_err(|e| ExplorerError::Config(format!("invalid URL '{}': {}", text, e)))?;
            Ok(DataLocation::Http(url))
        } else {
            Ok(DataLocation::Local(PathBuf::from(text)))
        }
    }

    /// Location of `timeframe`'s file for `data_source` under `root`.
    pub fn resolve(root: &str, data_source: &str, timeframe: Timeframe) -> Result<Self> {
        let file_name = timeframe.file_name(data_source);
        let root = root.trim();
        if is_http(root) {
            let base = if root.ends_with('/') {
                root.to_string()
            } else {
                format!("{}/", root)
            };
            let url = Url::parse(&base)
                .and_then(|base| base.join(&file_name))
                .map_err(|e| ExplorerError::Config(format!("invalid data root '{}': {}", root, e)))?;
            Ok(DataLocation::Http(url))
        } else {
            Ok(DataLocation::Local(PathBuf::from(root).join(file_name)))
        }
    }
}

impl fmt::Display for DataLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataLocation::Http(url) => write!(f, "{}", url),
            DataLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

fn is_http(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Retrieves raw CSV text. One attempt per call; retrying is left to the user.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplorerError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn fetch_text(&self, location: &DataLocation) -> Result<String> {
        info!("📡 Fetching {}", location);
        let text = match location {
            DataLocation::Http(url) => self.fetch_http(url).await?,
            DataLocation::Local(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ExplorerError::Fetch {
                    location: location.to_string(),
                    reason: e.to_string(),
                })?,
        };
        debug!("Fetched {} bytes from {}", text.len(), location);
        Ok(text)
    }

    async fn fetch_http(&self, url: &Url) -> Result<String> {
        let fetch_error = |e: reqwest::Error| ExplorerError::Fetch {
            location: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExplorerError::HttpStatus {
                location: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(fetch_error)
    }
}
