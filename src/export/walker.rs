//! Recursive content-tree walker
//!
//! Walks a content tree, rewriting every media reference to its canonical
//! site path and collecting an [`AssetDescriptor`] for each asset the
//! package must carry. Traversal is synchronous and never aborts on an
//! unfamiliar shape: anything unrecognized passes through unchanged.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::content::{ContentNode, ContentType};
use crate::media::path::{file_name_of, sanitize_file_name, to_site_url, GLOBAL_BUCKET};
use crate::media::{
    resolve, AssetDescriptor, AssetSource, ClassifierRules, MediaReference, ServiceContext,
};

use super::accumulator::{AssetAccumulator, AssetIndex};
use super::rules::{FieldRule, FieldRules};

/// Context a node is walked in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkContext {
    pub owner_block_name: String,
    pub content_type: ContentType,
    pub service_context: Option<ServiceContext>,
    pub root_prefix: String,
    /// Only collect assets that are not already in the baseline
    pub collect_new_only: bool,
}

impl WalkContext {
    pub fn new(content_type: ContentType, root_prefix: impl Into<String>) -> Self {
        Self {
            owner_block_name: GLOBAL_BUCKET.to_string(),
            content_type,
            service_context: None,
            root_prefix: root_prefix.into(),
            collect_new_only: false,
        }
    }

    pub fn collecting_new_only(mut self, collect_new_only: bool) -> Self {
        self.collect_new_only = collect_new_only;
        self
    }

    fn with_owner(&self, owner: &str) -> Self {
        Self {
            owner_block_name: owner.to_string(),
            ..self.clone()
        }
    }

    fn with_service(&self, service: ServiceContext) -> Self {
        Self {
            content_type: ContentType::Services,
            service_context: Some(service),
            ..self.clone()
        }
    }
}

/// How to name a media item whose own name is unusable
#[derive(Debug, Clone, Copy)]
enum Fallback {
    Index(usize),
    Generic,
}

impl Fallback {
    fn name(self, extension: Option<&str>) -> String {
        let stem = match self {
            Fallback::Index(i) => format!("image_{i}"),
            Fallback::Generic => "asset".to_string(),
        };
        match extension {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        }
    }
}

/// Type-directed traversal over content trees
pub struct TreeWalker<'a> {
    classifier: &'a ClassifierRules,
    fields: &'a FieldRules,
    baseline: Option<&'a AssetIndex>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(classifier: &'a ClassifierRules, fields: &'a FieldRules) -> Self {
        Self {
            classifier,
            fields,
            baseline: None,
        }
    }

    /// Assets of an earlier pass; references found there are not new
    pub fn with_baseline(mut self, baseline: &'a AssetIndex) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Walk `node`, returning the rewritten tree
    pub fn walk(
        &self,
        node: &ContentNode,
        assets: &mut AssetAccumulator,
        ctx: &WalkContext,
    ) -> ContentNode {
        self.walk_node(node, assets, ctx, Fallback::Generic)
    }

    fn walk_node(
        &self,
        node: &ContentNode,
        assets: &mut AssetAccumulator,
        ctx: &WalkContext,
        fallback: Fallback,
    ) -> ContentNode {
        match node {
            ContentNode::Array(items) => ContentNode::Array(
                items
                    .iter()
                    .map(|item| self.walk_node(item, assets, ctx, Fallback::Generic))
                    .collect(),
            ),
            ContentNode::Object(map) => match self.classifier.classify(node) {
                MediaReference::Inert => {
                    let walked: BTreeMap<String, ContentNode> = map
                        .iter()
                        .map(|(key, value)| (key.clone(), self.walk_field(key, value, assets, ctx)))
                        .collect();
                    ContentNode::Object(walked)
                }
                reference => self.rewrite_media(node, reference, assets, ctx, fallback),
            },
            ContentNode::String(_) => match self.classifier.classify(node) {
                MediaReference::Inert => node.clone(),
                reference => self.rewrite_media(node, reference, assets, ctx, fallback),
            },
            other => other.clone(),
        }
    }

    fn walk_field(
        &self,
        key: &str,
        value: &ContentNode,
        assets: &mut AssetAccumulator,
        ctx: &WalkContext,
    ) -> ContentNode {
        let (Some(rule), ContentNode::Array(items)) = (self.fields.get(key), value) else {
            return self.walk_node(value, assets, ctx, Fallback::Generic);
        };

        let walked = items.iter().enumerate().map(|(index, item)| match rule {
            FieldRule::BlockList => {
                let owner = block_name(item).unwrap_or(GLOBAL_BUCKET);
                self.walk_node(item, assets, &ctx.with_owner(owner), Fallback::Generic)
            }
            FieldRule::NestedBlockList => match block_name(item) {
                Some(owner) => self.walk_node(item, assets, &ctx.with_owner(owner), Fallback::Generic),
                None => self.walk_node(item, assets, ctx, Fallback::Generic),
            },
            FieldRule::ServiceCategory => {
                let service = ServiceContext::from_entry(key, item, index);
                self.walk_node(item, assets, &ctx.with_service(service), Fallback::Generic)
            }
            FieldRule::MediaList => self.walk_node(item, assets, ctx, Fallback::Index(index)),
            FieldRule::Preserve => self.walk_node(item, assets, ctx, Fallback::Generic),
        });
        ContentNode::Array(walked.collect())
    }

    fn rewrite_media(
        &self,
        node: &ContentNode,
        reference: MediaReference,
        assets: &mut AssetAccumulator,
        ctx: &WalkContext,
        fallback: Fallback,
    ) -> ContentNode {
        let (source, display_name, original_url) = match reference {
            MediaReference::PendingUpload {
                file,
                name,
                original_url,
            } => {
                let name = name
                    .as_deref()
                    .and_then(sanitize_file_name)
                    .unwrap_or_else(|| fallback.name(mime_extension(file.mime())));
                (AssetSource::Handle(file), name, original_url)
            }
            MediaReference::PersistedPath { url } | MediaReference::RemoteOrLocalUrl(url) => {
                let name = sanitize_file_name(file_name_of(&url))
                    .filter(|_| !crate::content::is_blob_url(&url))
                    .or_else(|| node.get_str("name").and_then(sanitize_file_name))
                    .unwrap_or_else(|| fallback.name(None));
                (AssetSource::Url(url.clone()), name, Some(url))
            }
            MediaReference::Inert => return node.clone(),
        };

        // A pending upload's originalUrl records what it replaces; it must not
        // pin the new file to the old file's path.
        let reuse_url = match &source {
            AssetSource::Handle(_) => None,
            AssetSource::Url(_) => original_url.as_deref(),
        };
        let path = resolve(
            &display_name,
            &ctx.owner_block_name,
            ctx.content_type,
            ctx.service_context.as_ref(),
            reuse_url,
            &ctx.root_prefix,
        );

        let is_new = match self.baseline {
            Some(baseline) => !baseline.contains(&path, &source),
            None => source.is_in_memory(),
        };
        if ctx.collect_new_only && !is_new {
            tracing::trace!(path = %path, "Reference unchanged since snapshot");
        } else {
            tracing::debug!(
                path = %path,
                source = %source.location(),
                block = %ctx.owner_block_name,
                "Collecting asset"
            );
            let descriptor = AssetDescriptor::new(path.clone(), source, display_name.clone())
                .with_newly_added(is_new);
            assets.push(descriptor);
        }

        let url = to_site_url(&path);
        match node {
            ContentNode::Object(map) => {
                let mut out: BTreeMap<String, ContentNode> = map
                    .iter()
                    .filter(|(key, _)| !MEDIA_FIELDS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), self.walk_field(key, value, assets, ctx)))
                    .collect();
                let id = match map.get("id") {
                    Some(id) if !id.is_null() => id.clone(),
                    _ => ContentNode::String(stable_id(&path)),
                };
                out.insert("id".into(), id);
                out.insert("url".into(), ContentNode::String(url));
                out.insert("name".into(), ContentNode::String(display_name));
                out.insert(
                    "originalUrl".into(),
                    original_url.map(ContentNode::String).unwrap_or_default(),
                );
                ContentNode::Object(out)
            }
            _ => ContentNode::String(url),
        }
    }
}

/// Fields of a media object the rewrite owns; the rest are walked as usual
const MEDIA_FIELDS: &[&str] = &["file", "id", "url", "name", "originalUrl"];

fn block_name(item: &ContentNode) -> Option<&str> {
    item.get_str("blockName")
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn stable_id(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

fn mime_extension(mime: Option<&str>) -> Option<&'static str> {
    match mime? {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/avif" => Some("avif"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/quicktime" => Some("mov"),
        _ => None,
    }
}
