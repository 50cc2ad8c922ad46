//! Two-pass export
//!
//! Pass one walks the initial snapshot and collects every asset it
//! references. Pass two walks the current state against that baseline and
//! collects only what is new. Both asset sets are then materialized in one
//! bounded batch and assembled into a [`Package`].

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

use crate::content::{ContentTypes, DocumentSet};
use crate::media::materialize::DEFAULT_CONCURRENCY;
use crate::media::{
    AssetDescriptor, AssetMaterializer, BlobCache, ClassifierRules, MaterializeError,
};

use super::accumulator::{AssetAccumulator, AssetIndex, PathCollision};
use super::issue::{ExportError, ExportIssue, Namespace};
use super::package::{Package, PackageAsset, PackageSide};
use super::rules::FieldRules;
use super::walker::{TreeWalker, WalkContext};

pub const DEFAULT_ROOT_PREFIX: &str = "old";

/// Result of walking one document set
#[derive(Debug, Default)]
pub struct WalkedSet {
    pub documents: BTreeMap<String, serde_json::Value>,
    pub assets: AssetAccumulator,
}

/// Descriptor tagged with the namespace it ships in
struct Pending {
    namespace: Namespace,
    descriptor: AssetDescriptor,
}

impl AsRef<AssetDescriptor> for Pending {
    fn as_ref(&self) -> &AssetDescriptor {
        &self.descriptor
    }
}

/// Builds export packages from an initial snapshot and the current state
pub struct Exporter {
    classifier: ClassifierRules,
    fields: FieldRules,
    materializer: AssetMaterializer,
    concurrency: usize,
    root_prefix: String,
}

impl Exporter {
    pub fn new(materializer: AssetMaterializer) -> Self {
        Self {
            classifier: ClassifierRules::default(),
            fields: FieldRules::default(),
            materializer,
            concurrency: DEFAULT_CONCURRENCY,
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
        }
    }

    pub fn with_classifier(mut self, classifier: ClassifierRules) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_field_rules(mut self, fields: FieldRules) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_root_prefix(mut self, root_prefix: impl Into<String>) -> Self {
        self.root_prefix = root_prefix.into();
        self
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Walk every document of `documents`
    ///
    /// With a `baseline`, references already present there are rewritten but
    /// not collected.
    pub fn walk_documents(
        &self,
        documents: &DocumentSet,
        content_types: &ContentTypes,
        baseline: Option<&AssetIndex>,
    ) -> Result<WalkedSet, ExportError> {
        let mut walker = TreeWalker::new(&self.classifier, &self.fields);
        if let Some(baseline) = baseline {
            walker = walker.with_baseline(baseline);
        }

        let mut walked = WalkedSet::default();
        for (name, tree) in documents.iter() {
            if !tree.is_traversable() {
                return Err(ExportError::NotTraversable {
                    document: name.to_string(),
                    kind: tree.kind(),
                });
            }
            let ctx = WalkContext::new(content_types.get(name), self.root_prefix.as_str())
                .collecting_new_only(baseline.is_some());
            let rewritten = walker.walk(tree, &mut walked.assets, &ctx);
            walked.documents.insert(name.to_string(), rewritten.to_json());
        }
        Ok(walked)
    }

    pub async fn export_package(
        &self,
        initial: &DocumentSet,
        current: &DocumentSet,
        content_types: &ContentTypes,
    ) -> Result<Package, ExportError> {
        self.export_package_with_cancel(initial, current, content_types, &CancellationToken::new())
            .await
    }

    /// Export; cancelling drops every asset still in flight
    pub async fn export_package_with_cancel(
        &self,
        initial: &DocumentSet,
        current: &DocumentSet,
        content_types: &ContentTypes,
        cancel: &CancellationToken,
    ) -> Result<Package, ExportError> {
        validate_root_prefix(&self.root_prefix)?;
        let old = self.walk_documents(initial, content_types, None)?;
        let baseline = old.assets.index();
        let new = self.walk_documents(current, content_types, Some(&baseline))?;

        tracing::info!(
            documents = current.len(),
            old_assets = old.assets.len(),
            new_assets = new.assets.len(),
            "Walked snapshots"
        );

        let (old_descriptors, old_collisions) = old.assets.into_parts();
        let (new_descriptors, new_collisions) = new.assets.into_parts();

        let mut issues: Vec<ExportIssue> = collision_issues(Namespace::Old, old_collisions)
            .chain(collision_issues(Namespace::New, new_collisions))
            .collect();

        let pending: Vec<Pending> = old_descriptors
            .into_iter()
            .map(|descriptor| Pending {
                namespace: Namespace::Old,
                descriptor,
            })
            .chain(new_descriptors.into_iter().map(|descriptor| Pending {
                namespace: Namespace::New,
                descriptor,
            }))
            .collect();

        // One cache per export; blob reads never leak into the next export.
        let cache = BlobCache::new();
        let results = self
            .materializer
            .materialize_all(pending, &cache, self.concurrency, cancel)
            .await;

        let mut old_side = PackageSide {
            documents: old.documents,
            assets: Vec::new(),
        };
        let mut new_side = PackageSide {
            documents: new.documents,
            assets: Vec::new(),
        };

        for (pending, result) in results {
            let Pending {
                namespace,
                descriptor,
            } = pending;
            match result {
                Ok(materialized) => {
                    let side = match namespace {
                        Namespace::Old => &mut old_side,
                        Namespace::New => &mut new_side,
                    };
                    side.assets.push(PackageAsset {
                        descriptor,
                        bytes: materialized.bytes,
                        content_type: materialized.content_type,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        namespace = namespace.as_str(),
                        path = %descriptor.destination_path,
                        source = %descriptor.source.location(),
                        error = %err,
                        "Dropping asset"
                    );
                    issues.push(failure_issue(namespace, &descriptor, err));
                }
            }
        }

        issues.sort_by(|a, b| a.path().cmp(b.path()));
        let package = Package::new(old_side, new_side, self.root_prefix.as_str(), issues);

        tracing::info!(
            old_assets = package.old.assets.len(),
            new_assets = package.new.assets.len(),
            changed_documents = package.changed_documents.len(),
            issues = package.issues.len(),
            blobs_read = cache.len(),
            "Export assembled"
        );
        Ok(package)
    }
}

/// The root prefix names the old namespace's top-level directory, so it must
/// be a single segment that no other package entry uses.
fn validate_root_prefix(root_prefix: &str) -> Result<(), ExportError> {
    let valid = !root_prefix.is_empty()
        && !matches!(root_prefix, "." | "..")
        && !root_prefix.contains(['/', '\\'])
        && !Package::is_reserved_entry(root_prefix);
    if valid {
        Ok(())
    } else {
        Err(ExportError::InvalidRootPrefix(root_prefix.to_string()))
    }
}

fn collision_issues(
    namespace: Namespace,
    collisions: Vec<PathCollision>,
) -> impl Iterator<Item = ExportIssue> {
    collisions.into_iter().map(move |c| ExportIssue::PathCollision {
        namespace,
        path: c.path,
        kept: c.kept,
        replaced: c.replaced,
    })
}

fn failure_issue(
    namespace: Namespace,
    descriptor: &AssetDescriptor,
    err: MaterializeError,
) -> ExportIssue {
    let path = descriptor.destination_path.clone();
    let source = descriptor.source.location().to_string();
    match err {
        MaterializeError::HandleRevoked(_) => ExportIssue::HandleRevoked {
            namespace,
            path,
            source,
        },
        MaterializeError::Cancelled => ExportIssue::Cancelled { namespace, path },
        other => ExportIssue::MaterializationFailed {
            namespace,
            path,
            source,
            error: other.to_string(),
        },
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("concurrency", &self.concurrency)
            .field("root_prefix", &self.root_prefix)
            .finish_non_exhaustive()
    }
}
