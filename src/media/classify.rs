//! Media reference classification
//!
//! Decides, from shape alone, whether a content node denotes a media asset
//! and in which lifecycle state. Classification never mutates its input and
//! has no hidden state: the same node always classifies the same way.
//! Anything that does not cleanly match a known pattern is [`MediaReference::Inert`].

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::content::{is_blob_url, BinaryHandle, ContentNode};

/// Folders whose contents are always treated as site assets
pub const DEFAULT_ASSET_FOLDERS: &[&str] = &[
    "assets/",
    "images/",
    "img/",
    "media/",
    "uploads/",
    "videos/",
    "old/img/",
    "new/img/",
];

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "avif", "bmp", "ico", "tif", "tiff",
];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv", "ogg"];

const ABSOLUTE_PREFIXES: &[&str] = &["http://", "https://", "//", "data:"];

const RESERVED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "sms:"];

const RESERVED_KEYWORDS: &[&str] = &["none", "auto", "inherit", "initial", "transparent", "unset"];

/// A classified media reference
#[derive(Debug, Clone, PartialEq)]
pub enum MediaReference {
    /// Object with a stable, non-blob media `url` and no binary handle
    PersistedPath { url: String },
    /// Object carrying a binary handle picked during editing
    PendingUpload {
        file: BinaryHandle,
        name: Option<String>,
        original_url: Option<String>,
    },
    /// Processable URL string (or blob URL object) not yet in the package
    RemoteOrLocalUrl(String),
    /// Not media
    Inert,
}

impl MediaReference {
    pub fn is_media(&self) -> bool {
        !matches!(self, MediaReference::Inert)
    }
}

/// Broad kind of a media asset, derived from its file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_name(name: &str) -> Self {
        match extension_of(name).as_deref() {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => MediaKind::Image,
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }

    /// Kind implied by a MIME type, if it names one
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

/// Allow-lists that decide whether a plain string is a processable asset path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    asset_folders: Vec<String>,
    media_extensions: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_ASSET_FOLDERS.iter().map(|s| s.to_string()),
            IMAGE_EXTENSIONS
                .iter()
                .chain(VIDEO_EXTENSIONS)
                .map(|s| s.to_string()),
        )
    }
}

impl ClassifierRules {
    pub fn new(
        asset_folders: impl IntoIterator<Item = String>,
        media_extensions: impl IntoIterator<Item = String>,
    ) -> Self {
        let asset_folders = asset_folders
            .into_iter()
            .map(|f| {
                let trimmed = f.trim().trim_start_matches("./").trim_start_matches('/');
                let mut folder = trimmed.to_lowercase();
                if !folder.ends_with('/') {
                    folder.push('/');
                }
                folder
            })
            .filter(|f| f != "/")
            .collect();
        let media_extensions = media_extensions
            .into_iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            asset_folders,
            media_extensions,
        }
    }

    pub fn asset_folders(&self) -> &[String] {
        &self.asset_folders
    }

    pub fn media_extensions(&self) -> &[String] {
        &self.media_extensions
    }

    /// Classify a content node
    pub fn classify(&self, node: &ContentNode) -> MediaReference {
        match node {
            ContentNode::String(s) if self.is_processable_path(s) => {
                MediaReference::RemoteOrLocalUrl(s.clone())
            }
            ContentNode::Object(_) => self.classify_object(node),
            _ => MediaReference::Inert,
        }
    }

    fn classify_object(&self, node: &ContentNode) -> MediaReference {
        if let Some(file) = node.get("file").and_then(ContentNode::as_blob) {
            return MediaReference::PendingUpload {
                file: file.clone(),
                name: node.get_str("name").map(str::to_string),
                original_url: node
                    .get_str("originalUrl")
                    .filter(|u| !u.is_empty())
                    .map(str::to_string),
            };
        }

        match node.get_str("url").map(str::trim) {
            Some(url) if is_blob_url(url) => MediaReference::RemoteOrLocalUrl(url.to_string()),
            Some(url) if self.is_media_url(url) => MediaReference::PersistedPath {
                url: url.to_string(),
            },
            // links such as `{label, url: "/about"}` are not media
            _ => MediaReference::Inert,
        }
    }

    /// Whether an object's `url` points at media: a processable path, an
    /// absolute URL with a media extension, or an image/video data URL
    fn is_media_url(&self, url: &str) -> bool {
        if self.is_processable_path(url) {
            return true;
        }
        let lower = url.to_lowercase();
        if lower.starts_with("data:image/") || lower.starts_with("data:video/") {
            return true;
        }
        let is_absolute = ["http://", "https://", "//"].iter().any(|p| lower.starts_with(p));
        is_absolute
            && extension_of(&lower).is_some_and(|ext| self.media_extensions.iter().any(|e| *e == ext))
    }

    /// Whether a string is a relative asset path worth packaging
    pub fn is_processable_path(&self, value: &str) -> bool {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains('\n') {
            return false;
        }

        let lower = trimmed.to_lowercase();
        if is_blob_url(&lower)
            || lower.contains("://")
            || ABSOLUTE_PREFIXES.iter().any(|p| lower.starts_with(p))
        {
            return false;
        }
        if lower.starts_with('#')
            || RESERVED_SCHEMES.iter().any(|s| lower.starts_with(s))
            || RESERVED_KEYWORDS.contains(&lower.as_str())
        {
            return false;
        }

        let path = strip_query(&lower);
        let relative = path.trim_start_matches("./").trim_start_matches('/');
        if self.asset_folders.iter().any(|f| relative.starts_with(f.as_str())) {
            return true;
        }
        extension_of(relative).is_some_and(|ext| self.media_extensions.iter().any(|e| *e == ext))
    }
}

/// Classify with the built-in allow-lists
pub fn classify(node: &ContentNode) -> MediaReference {
    static RULES: OnceLock<ClassifierRules> = OnceLock::new();
    RULES.get_or_init(ClassifierRules::default).classify(node)
}

/// Drop any `?query` or `#fragment` suffix
pub fn strip_query(value: &str) -> &str {
    let end = value.find(|c: char| c == '?' || c == '#').unwrap_or(value.len());
    &value[..end]
}

/// Lowercased extension of the last path segment
pub fn extension_of(name: &str) -> Option<String> {
    let path = strip_query(name);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
