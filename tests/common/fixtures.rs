//! Content fixtures

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use sitepack::{BinaryHandle, ContentNode, DocumentSet};

use super::fetcher::MapFetcher;

/// Documents of a small site as they were when editing started
pub fn site_documents() -> DocumentSet {
    DocumentSet::new()
        .with(
            "combined_data",
            ContentNode::from(json!({
                "heroImage": "/assets/images/hero/a.jpg",
                "mainPageBlocks": [
                    {
                        "blockName": "HeroBlock",
                        "config": {
                            "title": "Built to last",
                            "backgroundImage": "/assets/images/hero/bg.jpg",
                            "cta": {"label": "Contact", "url": "/contact"}
                        }
                    },
                    {
                        "blockName": "GalleryBlock",
                        "config": {"images": [
                            {"url": "/assets/images/gallery/one.jpg", "name": "one.jpg"},
                            {"url": "/assets/images/gallery/two.jpg", "name": "two.jpg"}
                        ]}
                    }
                ]
            })),
        )
        .with(
            "nav",
            ContentNode::from(json!({
                "logo": "/assets/images/logo.png",
                "links": [{"label": "About", "url": "/about"}]
            })),
        )
        .with(
            "services",
            ContentNode::from(json!({
                "residential": [
                    {"id": 1, "title": "Roofing", "hero": {"url": "/assets/images/roof.jpg"}}
                ],
                "commercial": [
                    {"id": 7, "title": "Siding", "hero": {"url": "/assets/images/siding.jpg"}}
                ]
            })),
        )
        .with(
            "colors_output",
            ContentNode::from(json!({"primary": "#aa3300", "accent": "transparent"})),
        )
}

/// Fetcher serving every asset `site_documents` references
pub fn site_fetcher() -> Arc<MapFetcher> {
    let fetcher = MapFetcher::new();
    for url in [
        "/assets/images/hero/a.jpg",
        "/assets/images/hero/bg.jpg",
        "/assets/images/gallery/one.jpg",
        "/assets/images/gallery/two.jpg",
        "/assets/images/logo.png",
        "/assets/images/roof.jpg",
        "/assets/images/siding.jpg",
    ] {
        fetcher.serve(url, url.as_bytes());
    }
    fetcher
}

/// A picked file as the editor would attach it
pub fn pending_upload(handle: &BinaryHandle, name: &str) -> ContentNode {
    ContentNode::object([
        ("file", ContentNode::Blob(handle.clone())),
        ("name", ContentNode::string(name)),
        ("url", ContentNode::string(handle.url())),
        ("originalUrl", ContentNode::Null),
    ])
}

pub fn png_handle(bytes: &[u8]) -> BinaryHandle {
    BinaryHandle::new(bytes.to_vec(), Some("image/png".to_string()))
}

/// Replace a top-level field of a document
pub fn set_field(docs: &mut DocumentSet, document: &str, field: &str, value: ContentNode) {
    docs.get_mut(document)
        .and_then(ContentNode::as_object_mut)
        .expect("document is an object")
        .insert(field.to_string(), value);
}

/// Every `/<root>/img/...` string reachable from a JSON value
pub fn image_urls(value: &Value, root: &str) -> BTreeSet<String> {
    let prefix = format!("/{root}/img/");
    let mut out = BTreeSet::new();
    collect_urls(value, &prefix, &mut out);
    out
}

fn collect_urls(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) if s.starts_with(prefix) => {
            out.insert(s.clone());
        }
        Value::Array(items) => items.iter().for_each(|v| collect_urls(v, prefix, out)),
        Value::Object(map) => map.values().for_each(|v| collect_urls(v, prefix, out)),
        _ => {}
    }
}
