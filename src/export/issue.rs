use serde::Serialize;
use thiserror::Error;

/// Package namespace an artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Old,
    New,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Old => "old",
            Namespace::New => "new",
        }
    }
}

/// Fatal export failure
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Document '{document}' is a {kind}, not a traversable tree")]
    NotTraversable { document: String, kind: &'static str },
    #[error("Root prefix '{0}' cannot name the old namespace")]
    InvalidRootPrefix(String),
}

/// Non-fatal problem recorded during an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportIssue {
    /// Two distinct assets resolved to one path; the later one was kept
    PathCollision {
        namespace: Namespace,
        path: String,
        kept: String,
        replaced: String,
    },
    /// Fetch/read error or invalid payload; the asset was dropped
    MaterializationFailed {
        namespace: Namespace,
        path: String,
        source: String,
        error: String,
    },
    /// The binary handle was released before it could be read
    HandleRevoked {
        namespace: Namespace,
        path: String,
        source: String,
    },
    /// The export was cancelled before this asset resolved
    Cancelled { namespace: Namespace, path: String },
}

impl ExportIssue {
    pub fn path(&self) -> &str {
        match self {
            ExportIssue::PathCollision { path, .. }
            | ExportIssue::MaterializationFailed { path, .. }
            | ExportIssue::HandleRevoked { path, .. }
            | ExportIssue::Cancelled { path, .. } => path,
        }
    }

    /// Whether the referenced asset is missing from the package
    pub fn drops_asset(&self) -> bool {
        !matches!(self, ExportIssue::PathCollision { .. })
    }
}

impl std::fmt::Display for ExportIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportIssue::PathCollision {
                namespace,
                path,
                kept,
                replaced,
            } => write!(
                f,
                "[{}] path collision at {path}: kept {kept}, replaced {replaced}",
                namespace.as_str()
            ),
            ExportIssue::MaterializationFailed {
                namespace,
                path,
                source,
                error,
            } => write!(
                f,
                "[{}] dropped {path} (from {source}): {error}",
                namespace.as_str()
            ),
            ExportIssue::HandleRevoked {
                namespace,
                path,
                source,
            } => write!(
                f,
                "[{}] dropped {path}: handle {source} was revoked",
                namespace.as_str()
            ),
            ExportIssue::Cancelled { namespace, path } => {
                write!(f, "[{}] cancelled before {path} resolved", namespace.as_str())
            }
        }
    }
}
