//! Content trees, binary handles, and editing sessions

pub mod blob;
pub mod document;
pub mod node;
pub mod session;

pub use blob::{is_blob_url, BinaryHandle, BlobRegistry, BLOB_SCHEME};
pub use document::{ContentType, ContentTypes, DocumentSet, LoadError, TRACKED_DOCUMENTS};
pub use node::ContentNode;
pub use session::EditSession;
