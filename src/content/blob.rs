//! Binary handles for locally picked files
//!
//! A [`BinaryHandle`] is the exporter's view of an in-memory file created by
//! the editing host (the equivalent of an object URL backing a preview).
//! The host owns the payload and may revoke it at any time; the exporter
//! only ever reads.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Scheme prefix used by blob URLs
pub const BLOB_SCHEME: &str = "blob:";

static NEXT_BLOB_ID: AtomicU64 = AtomicU64::new(1);

struct HandleInner {
    url: String,
    mime: Option<String>,
    data: RwLock<Option<Arc<[u8]>>>,
}

/// Shared reference to an externally owned in-memory payload
#[derive(Clone)]
pub struct BinaryHandle {
    inner: Arc<HandleInner>,
}

impl BinaryHandle {
    /// Create a handle with a freshly allocated `blob:` URL
    pub fn new(bytes: impl Into<Vec<u8>>, mime: Option<String>) -> Self {
        let id = NEXT_BLOB_ID.fetch_add(1, Ordering::Relaxed);
        Self::with_url(format!("{BLOB_SCHEME}sitepack/{id}"), bytes, mime)
    }

    /// Create a handle for a URL the host already allocated
    pub fn with_url(url: impl Into<String>, bytes: impl Into<Vec<u8>>, mime: Option<String>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            inner: Arc::new(HandleInner {
                url: url.into(),
                mime,
                data: RwLock::new(Some(Arc::from(bytes))),
            }),
        }
    }

    /// The blob URL identifying this handle
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// MIME type reported by the host, if any
    pub fn mime(&self) -> Option<&str> {
        self.inner.mime.as_deref()
    }

    /// Read the payload. Returns `None` once the handle has been revoked.
    pub fn read(&self) -> Option<Arc<[u8]>> {
        self.inner.data.read().clone()
    }

    /// Release the payload. Only the owning host should call this.
    pub fn revoke(&self) {
        *self.inner.data.write() = None;
    }

    pub fn is_revoked(&self) -> bool {
        self.inner.data.read().is_none()
    }

    /// Whether two handles refer to the same payload
    pub fn same_handle(&self, other: &BinaryHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.url == other.inner.url
    }
}

impl PartialEq for BinaryHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_handle(other)
    }
}

impl fmt::Debug for BinaryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.inner.data.read().as_ref().map(|d| d.len());
        f.debug_struct("BinaryHandle")
            .field("url", &self.inner.url)
            .field("mime", &self.inner.mime)
            .field("len", &len)
            .finish()
    }
}

/// Host-side registry of live blob URLs
///
/// Content trees sometimes carry only the blob URL string of a pending
/// file (for example after a round-trip through a form). The registry is
/// how the exporter finds the binary counterpart of such a URL.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    handles: Arc<RwLock<HashMap<String, BinaryHandle>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under its own URL
    pub fn register(&self, handle: BinaryHandle) {
        self.handles.write().insert(handle.url().to_string(), handle);
    }

    pub fn get(&self, url: &str) -> Option<BinaryHandle> {
        self.handles.read().get(url).cloned()
    }

    /// Revoke and forget a handle. Returns whether the URL was known.
    pub fn revoke(&self, url: &str) -> bool {
        match self.handles.write().remove(url) {
            Some(handle) => {
                handle.revoke();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}

/// Whether a string is a blob URL
pub fn is_blob_url(value: &str) -> bool {
    value.starts_with(BLOB_SCHEME)
}
