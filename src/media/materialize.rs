//! Asset materialization
//!
//! Turns collected [`AssetDescriptor`]s into validated bytes. Handles are
//! read in place, blob URLs go through the per-export [`BlobCache`] and the
//! host's [`BlobRegistry`], data URLs are decoded, and everything else is
//! fetched. Failures are per asset: callers drop the asset and keep going.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::content::{is_blob_url, BinaryHandle, BlobRegistry};

use super::asset::{AssetDescriptor, AssetSource};
use super::classify::MediaKind;
use super::fetch::{AssetFetcher, FetchError};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Binary handle revoked or unknown: {0}")]
    HandleRevoked(String),
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Empty payload for {0}")]
    Empty(String),
    #[error("Expected an image for {path}, got {content_type}")]
    NotAnImage { path: String, content_type: String },
    #[error("Payload for {path} is {size} bytes (limit {limit})")]
    TooLarge { path: String, size: u64, limit: u64 },
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
    #[error("Timed out after {0}ms")]
    Timeout(u64),
    #[error("Cancelled")]
    Cancelled,
}

impl MaterializeError {
    /// Whether the failure is a revoked or missing handle
    pub fn is_revoked(&self) -> bool {
        matches!(self, MaterializeError::HandleRevoked(_))
    }
}

/// Validated bytes for one asset
#[derive(Debug, Clone)]
pub struct Materialized {
    pub bytes: Arc<[u8]>,
    pub content_type: Option<String>,
}

/// Blob URL → bytes memo, scoped to one export
#[derive(Debug, Clone, Default)]
pub struct BlobCache {
    entries: Arc<Mutex<HashMap<String, Arc<[u8]>>>>,
}

impl BlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Arc<[u8]>> {
        self.entries.lock().get(url).cloned()
    }

    pub fn insert(&self, url: impl Into<String>, bytes: Arc<[u8]>) {
        self.entries.lock().insert(url.into(), bytes);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Resolves descriptors to bytes
pub struct AssetMaterializer {
    fetcher: Arc<dyn AssetFetcher>,
    blobs: BlobRegistry,
    timeout: Duration,
    max_bytes: Option<u64>,
}

impl AssetMaterializer {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            blobs: BlobRegistry::new(),
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_bytes: None,
        }
    }

    pub fn with_registry(mut self, blobs: BlobRegistry) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Produce validated bytes for one descriptor
    pub async fn materialize(
        &self,
        descriptor: &AssetDescriptor,
        cache: &BlobCache,
    ) -> Result<Materialized, MaterializeError> {
        let materialized = match &descriptor.source {
            AssetSource::Handle(handle) => read_handle(handle, cache)?,
            AssetSource::Url(url) if is_blob_url(url) => self.read_blob_url(url, cache)?,
            AssetSource::Url(url) if url.trim_start().starts_with("data:") => decode_data_url(url)?,
            AssetSource::Url(url) => {
                let fetched = tokio::time::timeout(self.timeout, self.fetcher.fetch(url))
                    .await
                    .map_err(|_| MaterializeError::Timeout(self.timeout.as_millis() as u64))??;
                Materialized {
                    bytes: Arc::from(fetched.bytes),
                    content_type: fetched.content_type,
                }
            }
        };

        self.validate(descriptor, &materialized)?;
        Ok(materialized)
    }

    /// Materialize one descriptor unless `cancel` fires first
    pub async fn materialize_cancellable(
        &self,
        descriptor: &AssetDescriptor,
        cache: &BlobCache,
        cancel: &CancellationToken,
    ) -> Result<Materialized, MaterializeError> {
        if cancel.is_cancelled() {
            return Err(MaterializeError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MaterializeError::Cancelled),
            result = self.materialize(descriptor, cache) => result,
        }
    }

    /// Materialize many descriptors with at most `concurrency` in flight
    ///
    /// Items may carry extra data alongside the descriptor. Results come back
    /// in completion order; artifacts are keyed by path.
    pub async fn materialize_all<T>(
        &self,
        items: Vec<T>,
        cache: &BlobCache,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Vec<(T, Result<Materialized, MaterializeError>)>
    where
        T: AsRef<AssetDescriptor>,
    {
        stream::iter(items)
            .map(|item| async move {
                let result = self
                    .materialize_cancellable(item.as_ref(), cache, cancel)
                    .await;
                (item, result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }

    /// A URL the registry no longer knows is never served, even from the cache
    fn read_blob_url(&self, url: &str, cache: &BlobCache) -> Result<Materialized, MaterializeError> {
        match self.blobs.get(url) {
            Some(handle) => read_handle(&handle, cache),
            None => Err(MaterializeError::HandleRevoked(url.to_string())),
        }
    }

    fn validate(
        &self,
        descriptor: &AssetDescriptor,
        materialized: &Materialized,
    ) -> Result<(), MaterializeError> {
        let path = &descriptor.destination_path;
        if materialized.bytes.is_empty() {
            return Err(MaterializeError::Empty(path.clone()));
        }
        let size = materialized.bytes.len() as u64;
        if let Some(limit) = self.max_bytes.filter(|limit| size > *limit) {
            return Err(MaterializeError::TooLarge {
                path: path.clone(),
                size,
                limit,
            });
        }
        if descriptor.kind == MediaKind::Image {
            if let Some(content_type) = materialized
                .content_type
                .as_deref()
                .filter(|ct| !ct.starts_with("image/"))
            {
                return Err(MaterializeError::NotAnImage {
                    path: path.clone(),
                    content_type: content_type.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn read_handle(handle: &BinaryHandle, cache: &BlobCache) -> Result<Materialized, MaterializeError> {
    if handle.is_revoked() {
        return Err(MaterializeError::HandleRevoked(handle.url().to_string()));
    }
    let bytes = match cache.get(handle.url()) {
        Some(bytes) => bytes,
        None => {
            let bytes = handle
                .read()
                .ok_or_else(|| MaterializeError::HandleRevoked(handle.url().to_string()))?;
            cache.insert(handle.url(), bytes.clone());
            bytes
        }
    };
    Ok(Materialized {
        bytes,
        content_type: handle.mime().map(str::to_string),
    })
}

/// Decode `data:[<mime>][;base64],<payload>`
fn decode_data_url(url: &str) -> Result<Materialized, MaterializeError> {
    let invalid = || MaterializeError::InvalidDataUrl(url.chars().take(48).collect());
    let rest = url.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;

    let is_base64 = meta.ends_with(";base64");
    let mime = meta.trim_end_matches(";base64").split(';').next().unwrap_or("");
    let bytes = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| invalid())?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(Materialized {
        bytes: Arc::from(bytes),
        content_type: (!mime.is_empty()).then(|| mime.to_string()),
    })
}
