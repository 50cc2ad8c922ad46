//! Editing session: the immutable initial snapshot plus the live tree

use super::blob::BlobRegistry;
use super::document::DocumentSet;

/// Holds both trees an export needs
///
/// The initial snapshot is a deep clone taken once at session start.
/// Binary handles are shared references, so a handle present at start is
/// the same handle in both trees until the host swaps it out.
#[derive(Debug, Clone)]
pub struct EditSession {
    initial: DocumentSet,
    current: DocumentSet,
    blobs: BlobRegistry,
}

impl EditSession {
    /// Start a session, snapshotting `documents` as the initial state
    pub fn start(documents: DocumentSet) -> Self {
        Self::with_registry(documents, BlobRegistry::new())
    }

    pub fn with_registry(documents: DocumentSet, blobs: BlobRegistry) -> Self {
        tracing::debug!(documents = documents.len(), "Starting edit session");
        Self {
            initial: documents.clone(),
            current: documents,
            blobs,
        }
    }

    pub fn initial(&self) -> &DocumentSet {
        &self.initial
    }

    pub fn current(&self) -> &DocumentSet {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut DocumentSet {
        &mut self.current
    }

    /// Blob URLs the host has handed out during this session
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Whether anything changed since the session started
    pub fn is_dirty(&self) -> bool {
        self.initial != self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BinaryHandle, ContentNode};

    #[test]
    fn mutations_do_not_touch_initial_snapshot() {
        let docs = DocumentSet::new().with(
            "nav",
            ContentNode::object([("logo", ContentNode::string("/assets/images/logo.png"))]),
        );
        let mut session = EditSession::start(docs);
        assert!(!session.is_dirty());

        let handle = BinaryHandle::new(b"new".to_vec(), None);
        session
            .current_mut()
            .get_mut("nav")
            .and_then(ContentNode::as_object_mut)
            .unwrap()
            .insert("logo".into(), ContentNode::object([("file", ContentNode::Blob(handle))]));

        assert!(session.is_dirty());
        assert_eq!(
            session.initial().get("nav").and_then(|n| n.get_str("logo")),
            Some("/assets/images/logo.png")
        );
    }
}
