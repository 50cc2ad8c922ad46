//! Export package layout
//!
//! ```text
//! old/jsons/<document>.json   every document, rewritten (initial snapshot)
//! old/img/...                 every asset the initial snapshot references
//! new/jsons/<document>.json   every document, rewritten (current state)
//! new/img/...                 only assets added since the snapshot
//! manifest.json
//! README
//! ```
//!
//! The old namespace directory is named after the root prefix, so the
//! `/<root>/img/...` URLs in the JSON resolve inside the package.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::media::path::rebase;
use crate::media::{AssetDescriptor, AssetSummary};

use super::issue::{ExportIssue, Namespace};
use super::sink::{PackageSink, Payload, SinkError};

pub const PACKAGE_SCHEMA_VERSION: u32 = 1;

const JSONS_DIR: &str = "jsons";
const MANIFEST_JSON: &str = "manifest.json";
const README: &str = "README";

const README_TEXT: &str = "\
This package holds two views of the site content.

old/  the content as it was when the editing session started.
      old/jsons has every document; old/img has every asset they reference.
      A configured root prefix renames old/; manifest.json records it as root.
new/  the content as it is now.
      new/jsons has every document; new/img has only assets added since.

Lay new/img over old/img to get the current site. manifest.json lists every
artifact, the documents that changed, and any assets that were dropped.
";

/// One materialized asset ready to write
#[derive(Debug, Clone)]
pub struct PackageAsset {
    pub descriptor: AssetDescriptor,
    pub bytes: Arc<[u8]>,
    pub content_type: Option<String>,
}

/// Documents and assets of one namespace
#[derive(Debug, Clone, Default)]
pub struct PackageSide {
    pub documents: BTreeMap<String, Value>,
    /// Sorted by destination path
    pub assets: Vec<PackageAsset>,
}

impl PackageSide {
    pub fn asset(&self, destination_path: &str) -> Option<&PackageAsset> {
        self.assets
            .iter()
            .find(|a| a.descriptor.destination_path == destination_path)
    }

    pub fn asset_paths(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|a| a.descriptor.destination_path.as_str())
    }

    fn sort(&mut self) {
        self.assets
            .sort_by(|a, b| a.descriptor.destination_path.cmp(&b.descriptor.destination_path));
    }
}

/// The assembled export, before it is written to a sink
#[derive(Debug, Clone)]
pub struct Package {
    pub old: PackageSide,
    pub new: PackageSide,
    /// Documents whose rewritten form differs between old and new
    pub changed_documents: Vec<String>,
    /// Namespace the resolved paths are rooted at
    pub root_prefix: String,
    pub issues: Vec<ExportIssue>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceManifest {
    pub documents: Vec<String>,
    pub assets: Vec<AssetSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageManifest {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub app_version: String,
    /// Directory of the old namespace
    pub root: String,
    pub old: NamespaceManifest,
    pub new: NamespaceManifest,
    pub changed_documents: Vec<String>,
    pub issues: Vec<ExportIssue>,
}

impl Package {
    pub fn new(
        mut old: PackageSide,
        mut new: PackageSide,
        root_prefix: impl Into<String>,
        issues: Vec<ExportIssue>,
    ) -> Self {
        old.sort();
        new.sort();
        let changed_documents = new
            .documents
            .iter()
            .filter(|(name, doc)| old.documents.get(*name) != Some(*doc))
            .map(|(name, _)| name.clone())
            .collect();
        Self {
            old,
            new,
            changed_documents,
            root_prefix: root_prefix.into(),
            issues,
            created_at: Utc::now(),
        }
    }

    pub fn side(&self, namespace: Namespace) -> &PackageSide {
        match namespace {
            Namespace::Old => &self.old,
            Namespace::New => &self.new,
        }
    }

    /// Whether `name` is a top-level entry the package always writes
    pub fn is_reserved_entry(name: &str) -> bool {
        name == Namespace::New.as_str() || name == MANIFEST_JSON || name == README
    }

    /// Top-level directory of a namespace
    pub fn namespace_dir(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Old => &self.root_prefix,
            Namespace::New => Namespace::New.as_str(),
        }
    }

    /// Location of a document inside the package
    pub fn document_path(&self, namespace: Namespace, document: &str) -> String {
        format!("{}/{JSONS_DIR}/{document}.json", self.namespace_dir(namespace))
    }

    /// Location of an asset inside the package
    ///
    /// Descriptors are resolved against the root prefix; the new namespace
    /// carries them at the same relative location under `new/`.
    pub fn asset_path(&self, namespace: Namespace, descriptor: &AssetDescriptor) -> String {
        rebase(
            &descriptor.destination_path,
            &self.root_prefix,
            self.namespace_dir(namespace),
        )
    }

    pub fn manifest(&self) -> PackageManifest {
        let side = |side: &PackageSide| NamespaceManifest {
            documents: side.documents.keys().cloned().collect(),
            assets: side.assets.iter().map(|a| a.descriptor.summary()).collect(),
        };
        PackageManifest {
            schema_version: PACKAGE_SCHEMA_VERSION,
            created_at: self.created_at,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            root: self.root_prefix.clone(),
            old: side(&self.old),
            new: side(&self.new),
            changed_documents: self.changed_documents.clone(),
            issues: self.issues.clone(),
        }
    }

    /// Write every artifact and close the sink
    pub fn write_to(&self, sink: &mut dyn PackageSink) -> Result<(), SinkError> {
        for namespace in [Namespace::Old, Namespace::New] {
            let side = self.side(namespace);
            for (name, document) in &side.documents {
                sink.write(&self.document_path(namespace, name), Payload::Json(document))?;
            }
            for asset in &side.assets {
                sink.write(
                    &self.asset_path(namespace, &asset.descriptor),
                    Payload::Bytes(&asset.bytes),
                )?;
            }
        }

        let manifest = serde_json::to_value(self.manifest())?;
        sink.write(MANIFEST_JSON, Payload::Json(&manifest))?;
        sink.write(README, Payload::Text(README_TEXT))?;
        sink.finish()?;

        tracing::info!(
            old_documents = self.old.documents.len(),
            old_assets = self.old.assets.len(),
            new_documents = self.new.documents.len(),
            new_assets = self.new.assets.len(),
            "Package written"
        );
        Ok(())
    }
}
