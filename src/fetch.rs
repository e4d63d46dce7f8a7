use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;

use crate::config::App;
use crate::error::FetchError;

/// Reads talk sources: `http(s)` URLs over the network, anything else from
/// the content root on disk.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    content_root: PathBuf,
}

impl Fetcher {
    pub fn new(app: &App) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(app.fetch_timeout_seconds))
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                source: e,
            })?;

        Ok(Self {
            client,
            content_root: app.content_root.clone(),
        })
    }

    /// A fetcher for local sources only, rooted at `content_root`.
    pub fn local(content_root: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            content_root: content_root.into(),
        }
    }

    pub async fn fetch_text(&self, source: &str) -> Result<String, FetchError> {
        if is_remote(source) {
            self.fetch_remote(source).await
        } else {
            self.fetch_local(source).await
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url = %url, "fetching remote source");
        let response = self.client.get(url).send().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })
    }

    async fn fetch_local(&self, source: &str) -> Result<String, FetchError> {
        let path = self.local_path(source);
        tracing::debug!(path = ?path, "reading local source");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FetchError::Io { path, source: e })
    }

    fn local_path(&self, source: &str) -> PathBuf {
        let source = source.strip_prefix("file://").unwrap_or(source);
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.content_root.join(path)
        }
    }
}

fn is_remote(source: &str) -> bool {
    let lower = source.get(..8).unwrap_or(source).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
