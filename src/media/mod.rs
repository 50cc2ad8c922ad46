//! Media references: classification, destination paths, and byte resolution

pub mod asset;
pub mod classify;
pub mod fetch;
pub mod materialize;
pub mod path;

pub use asset::{AssetDescriptor, AssetSource, AssetSummary};
pub use classify::{classify, ClassifierRules, MediaKind, MediaReference};
pub use fetch::{AssetFetcher, FetchError, Fetched, FsFetcher, HttpFetcher, SiteFetcher};
pub use materialize::{AssetMaterializer, BlobCache, MaterializeError, Materialized};
pub use path::{resolve, ServiceContext};
