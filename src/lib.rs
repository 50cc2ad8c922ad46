pub mod config;
pub mod content;
pub mod export;
pub mod media;
pub mod util;

pub use config::Config;
pub use content::{BinaryHandle, ContentNode, ContentType, ContentTypes, DocumentSet, EditSession};
pub use export::{ExportError, ExportIssue, Exporter, Package, PackageSink};
pub use media::{classify, resolve, AssetDescriptor, MediaReference};
