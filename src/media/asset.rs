//! Collected assets

use serde::Serialize;

use crate::content::{is_blob_url, BinaryHandle};

use super::classify::MediaKind;

/// Where an asset's bytes come from
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// In-memory handle picked during editing
    Handle(BinaryHandle),
    /// Blob URL, data URL, site-relative path, or absolute URL
    Url(String),
}

impl AssetSource {
    /// Stable textual identity used in logs and manifests
    pub fn location(&self) -> &str {
        match self {
            AssetSource::Handle(handle) => handle.url(),
            AssetSource::Url(url) => url,
        }
    }

    /// Whether the bytes live in memory rather than behind a fetch
    pub fn is_in_memory(&self) -> bool {
        match self {
            AssetSource::Handle(_) => true,
            AssetSource::Url(url) => is_blob_url(url),
        }
    }
}

impl PartialEq for AssetSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AssetSource::Handle(a), AssetSource::Handle(b)) => a.same_handle(b),
            (AssetSource::Url(a), AssetSource::Url(b)) => a == b,
            (AssetSource::Handle(h), AssetSource::Url(u))
            | (AssetSource::Url(u), AssetSource::Handle(h)) => h.url() == u,
        }
    }
}

/// One asset the package must contain
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDescriptor {
    /// Resolved path, relative, rooted at `<root_prefix>/img/`
    pub destination_path: String,
    pub source: AssetSource,
    pub original_name: String,
    /// Not present (with the same source) in the initial snapshot
    pub is_newly_added: bool,
    pub kind: MediaKind,
}

impl AssetDescriptor {
    pub fn new(destination_path: String, source: AssetSource, original_name: String) -> Self {
        let kind = match &source {
            AssetSource::Handle(handle) => handle
                .mime()
                .map(MediaKind::from_mime)
                .filter(|kind| *kind != MediaKind::Other)
                .unwrap_or_else(|| MediaKind::from_name(&destination_path)),
            AssetSource::Url(_) => MediaKind::from_name(&destination_path),
        };
        Self {
            destination_path,
            source,
            original_name,
            is_newly_added: true,
            kind,
        }
    }

    pub fn with_newly_added(mut self, is_newly_added: bool) -> Self {
        self.is_newly_added = is_newly_added;
        self
    }

    /// Manifest row for this asset
    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            path: self.destination_path.clone(),
            source: self.source.location().to_string(),
            name: self.original_name.clone(),
            kind: self.kind,
            newly_added: self.is_newly_added,
        }
    }
}

impl AsRef<AssetDescriptor> for AssetDescriptor {
    fn as_ref(&self) -> &AssetDescriptor {
        self
    }
}

/// Serializable view of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub path: String,
    pub source: String,
    pub name: String,
    pub kind: MediaKind,
    pub newly_added: bool,
}
