//! In-memory asset fetcher

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sitepack::media::{AssetFetcher, AssetMaterializer, FetchError, Fetched};
use sitepack::Exporter;

/// Serves registered URLs; anything else is a 404
#[derive(Default)]
pub struct MapFetcher {
    assets: Mutex<HashMap<String, (Vec<u8>, String)>>,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `url` with bytes and a content type guessed from the name
    pub fn serve(&self, url: &str, bytes: &[u8]) {
        let content_type = mime_guess::from_path(url)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        self.assets
            .lock()
            .insert(url.to_string(), (bytes.to_vec(), content_type));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn exporter(self: &Arc<Self>) -> Exporter {
        Exporter::new(AssetMaterializer::new(Arc::clone(self) as Arc<dyn AssetFetcher>))
    }
}

#[async_trait]
impl AssetFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.assets.lock().get(url) {
            Some((bytes, content_type)) => Ok(Fetched {
                bytes: bytes.clone(),
                content_type: Some(content_type.clone()),
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
