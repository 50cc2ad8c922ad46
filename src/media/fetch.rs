//! Fetching asset bytes from URLs and the static root

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::classify::strip_query;

/// Bytes plus whatever content type the source reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No static root configured for local path: {0}")]
    NoStaticRoot(String),
    #[error("Path escapes the static root: {0}")]
    OutsideRoot(String),
}

/// Capability to turn a URL into bytes
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// Whether a URL is absolute http(s)
pub fn is_absolute_http(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Fetches over HTTP; site-relative paths are joined onto `base_url`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        self.base_url = Some(base.trim_end_matches('/').to_string());
        self
    }

    fn absolute_url(&self, url: &str) -> Result<String, FetchError> {
        if is_absolute_http(url) {
            return Ok(url.trim().to_string());
        }
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| FetchError::NoStaticRoot(url.to_string()))?;
        Ok(format!("{base}/{}", url.trim().trim_start_matches("./").trim_start_matches('/')))
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let target = self.absolute_url(url)?;
        tracing::debug!(url = %target, "Fetching asset");

        let response = self.client.get(&target).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target,
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let bytes = response.bytes().await?.to_vec();
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

/// Reads site-relative paths from a directory holding the static site
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a site-relative URL onto the root, refusing to leave it
    pub fn local_path(&self, url: &str) -> Result<PathBuf, FetchError> {
        let relative = strip_query(url.trim())
            .trim_start_matches("./")
            .trim_start_matches('/');
        let rel_path = Path::new(relative);
        if rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::OutsideRoot(url.to_string()));
        }
        Ok(self.root.join(rel_path))
    }
}

#[async_trait]
impl AssetFetcher for FsFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let path = self.local_path(url)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            })?;
        let content_type = mime_guess::from_path(&path)
            .first()
            .map(|m| m.essence_str().to_string());
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

/// Routes absolute URLs to HTTP and local paths to the static root
#[derive(Debug, Clone)]
pub struct SiteFetcher {
    http: HttpFetcher,
    local: Option<FsFetcher>,
}

impl SiteFetcher {
    pub fn new(http: HttpFetcher, local: Option<FsFetcher>) -> Self {
        Self { http, local }
    }
}

#[async_trait]
impl AssetFetcher for SiteFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        match &self.local {
            Some(local) if !is_absolute_http(url) => local.fetch(url).await,
            _ => self.http.fetch(url).await,
        }
    }
}
