//! Snapshot diff export: walk, collect, materialize, package

pub mod accumulator;
pub mod issue;
pub mod orchestrator;
pub mod package;
pub mod rules;
pub mod sink;
pub mod walker;

pub use accumulator::{AssetAccumulator, AssetIndex, PathCollision, PushOutcome};
pub use issue::{ExportError, ExportIssue, Namespace};
pub use orchestrator::{Exporter, WalkedSet, DEFAULT_ROOT_PREFIX};
pub use package::{Package, PackageAsset, PackageManifest, PackageSide, PACKAGE_SCHEMA_VERSION};
pub use rules::{FieldRule, FieldRules};
pub use sink::{DirSink, MemorySink, PackageSink, Payload, SinkError, ZipSink};
pub use walker::{TreeWalker, WalkContext};
