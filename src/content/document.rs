//! Named documents and their content types

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::blob::{BinaryHandle, BLOB_SCHEME};
use super::node::ContentNode;

/// Documents tracked by a site export, in package order
pub const TRACKED_DOCUMENTS: &[&str] = &[
    "combined_data",
    "nav",
    "services",
    "about_page",
    "all_blocks_showcase",
    "sentiment_reviews",
    "colors_output",
];

/// Semantic bucket a document's media is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Main,
    Navbar,
    About,
    Services,
    Showcase,
    #[default]
    Default,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Main => "main",
            ContentType::Navbar => "navbar",
            ContentType::About => "about",
            ContentType::Services => "services",
            ContentType::Showcase => "showcase",
            ContentType::Default => "default",
        }
    }

    /// Parse from string; unknown names map to `Default`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "main" => ContentType::Main,
            "navbar" | "nav" => ContentType::Navbar,
            "about" => ContentType::About,
            "services" => ContentType::Services,
            "showcase" => ContentType::Showcase,
            _ => ContentType::Default,
        }
    }

    /// Content type a tracked document gets when nothing overrides it
    pub fn for_document(name: &str) -> Self {
        match name {
            "combined_data" => ContentType::Main,
            "nav" => ContentType::Navbar,
            "services" => ContentType::Services,
            "about_page" => ContentType::About,
            "all_blocks_showcase" => ContentType::Showcase,
            _ => ContentType::Default,
        }
    }
}

/// Per-document content type assignments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    overrides: BTreeMap<String, ContentType>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, document: impl Into<String>, content_type: ContentType) -> Self {
        self.overrides.insert(document.into(), content_type);
        self
    }

    pub fn set(&mut self, document: impl Into<String>, content_type: ContentType) {
        self.overrides.insert(document.into(), content_type);
    }

    pub fn get(&self, document: &str) -> ContentType {
        self.overrides
            .get(document)
            .copied()
            .unwrap_or_else(|| ContentType::for_document(document))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Referenced file not found: {}", .0.display())]
    MissingFile(PathBuf),
}

/// A set of named content trees
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
    documents: BTreeMap<String, ContentNode>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, tree: ContentNode) -> Self {
        self.insert(name, tree);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, tree: ContentNode) -> Option<ContentNode> {
        self.documents.insert(name.into(), tree)
    }

    pub fn get(&self, name: &str) -> Option<&ContentNode> {
        self.documents.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ContentNode> {
        self.documents.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ContentNode> {
        self.documents.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentNode)> {
        self.documents.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Load every `<name>.json` file in a directory
    ///
    /// Objects whose `file` field is a string are treated as locally picked
    /// files: the path (relative to `dir`) is read into a [`BinaryHandle`].
    /// A handle's URL is derived from the file's canonical path and content,
    /// so loading the same directory twice yields equal handles.
    pub fn load_dir(dir: &Path) -> Result<Self, LoadError> {
        let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut picked = PickedFiles::default();
        let mut set = DocumentSet::new();
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let contents = fs::read_to_string(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let value: Value = serde_json::from_str(&contents).map_err(|source| LoadError::Json {
                path: path.clone(),
                source,
            })?;
            let tree = picked.hydrate(value, dir)?;
            tracing::debug!(document = name, path = %path.display(), "Loaded document");
            set.insert(name, tree);
        }
        Ok(set)
    }
}

/// Handles for picked files, one per canonical path
#[derive(Default)]
struct PickedFiles {
    handles: HashMap<PathBuf, BinaryHandle>,
}

impl PickedFiles {
    /// Convert JSON into a content tree, loading `file` path strings into handles
    fn hydrate(&mut self, value: Value, base_dir: &Path) -> Result<ContentNode, LoadError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.hydrate(item, base_dir))
                .collect::<Result<Vec<_>, _>>()
                .map(ContentNode::Array),
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (key, value) in map {
                    let node = match (key.as_str(), value) {
                        ("file", Value::String(rel)) => ContentNode::Blob(self.load(base_dir, &rel)?),
                        (_, other) => self.hydrate(other, base_dir)?,
                    };
                    out.insert(key, node);
                }
                Ok(ContentNode::Object(out))
            }
            other => Ok(ContentNode::from(other)),
        }
    }

    fn load(&mut self, base_dir: &Path, rel: &str) -> Result<BinaryHandle, LoadError> {
        let path = base_dir.join(rel.trim_start_matches('/'));
        if !path.is_file() {
            return Err(LoadError::MissingFile(path));
        }
        let canonical = fs::canonicalize(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        if let Some(handle) = self.handles.get(&canonical) {
            return Ok(handle.clone());
        }

        let bytes = fs::read(&canonical).map_err(|source| LoadError::Io {
            path: canonical.clone(),
            source,
        })?;
        let mime = mime_guess::from_path(&canonical)
            .first()
            .map(|m| m.essence_str().to_string());
        let handle = BinaryHandle::with_url(picked_file_url(&canonical, &bytes), bytes, mime);
        self.handles.insert(canonical, handle.clone());
        Ok(handle)
    }
}

/// `blob:file/<canonical path>#<content digest>`
fn picked_file_url(canonical: &Path, bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let short: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("{BLOB_SCHEME}file/{}#{short}", canonical.display())
}
