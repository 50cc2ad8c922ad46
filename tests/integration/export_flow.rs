//! Integration tests for the two-pass export
//!
//! Each test builds an initial snapshot, edits a copy the way the editor
//! would, and checks what lands in each namespace of the package.

use super::common::fetcher::MapFetcher;
use super::common::fixtures::{
    image_urls, pending_upload, png_handle, set_field, site_documents, site_fetcher,
};
use serde_json::json;
use sitepack::export::{MemorySink, Namespace};
use sitepack::media::path::rebase;
use sitepack::{ContentNode, ContentTypes, DocumentSet, EditSession, ExportError, ExportIssue};

fn new_paths(package: &sitepack::Package) -> Vec<&str> {
    package.new.asset_paths().collect()
}

fn gallery_images(docs: &mut DocumentSet) -> &mut Vec<ContentNode> {
    let blocks = docs
        .get_mut("combined_data")
        .and_then(ContentNode::as_object_mut)
        .and_then(|doc| doc.get_mut("mainPageBlocks"))
        .expect("mainPageBlocks");
    let ContentNode::Array(blocks) = blocks else {
        panic!("mainPageBlocks is not an array");
    };
    let images = blocks[1]
        .as_object_mut()
        .and_then(|block| block.get_mut("config"))
        .and_then(ContentNode::as_object_mut)
        .and_then(|config| config.get_mut("images"))
        .expect("gallery images");
    let ContentNode::Array(images) = images else {
        panic!("images is not an array");
    };
    images
}

/// An untouched session exports everything under old and nothing new
#[tokio::test]
async fn test_unchanged_session_has_no_new_assets() {
    let docs = site_documents();
    let fetcher = site_fetcher();

    let package = fetcher
        .exporter()
        .export_package(&docs, &docs, &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(
        package.old.asset_paths().collect::<Vec<_>>(),
        vec![
            "old/img/main_page_images/GalleryBlock/one.jpg",
            "old/img/main_page_images/GalleryBlock/two.jpg",
            "old/img/main_page_images/HeroBlock/bg.jpg",
            "old/img/main_page_images/global/a.jpg",
            "old/img/nav_images/logo.png",
            "old/img/services/commercial_7/siding.jpg",
            "old/img/services/residential_1/roof.jpg",
        ]
    );
    assert!(package.new.assets.is_empty());
    assert!(package.changed_documents.is_empty());
    assert_eq!(package.old.documents, package.new.documents);
    assert!(package.issues.is_empty());
}

/// A hero image swapped for a picked file
#[tokio::test]
async fn test_replaced_hero_image() {
    let initial = DocumentSet::new().with(
        "combined_data",
        ContentNode::from(json!({"heroImage": "/assets/images/hero/a.jpg"})),
    );
    let mut session = EditSession::start(initial);
    let upload = png_handle(b"b-bytes");
    set_field(
        session.current_mut(),
        "combined_data",
        "heroImage",
        pending_upload(&upload, "b.png"),
    );

    let fetcher = site_fetcher();
    let package = fetcher
        .exporter()
        .export_package(session.initial(), session.current(), &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(
        package.old.documents["combined_data"]["heroImage"],
        "/old/img/main_page_images/global/a.jpg"
    );
    let hero = &package.new.documents["combined_data"]["heroImage"];
    assert_eq!(hero["url"], "/old/img/main_page_images/global/b.png");
    assert_eq!(hero["name"], "b.png");
    assert!(hero.get("file").is_none());

    assert_eq!(new_paths(&package), vec!["old/img/main_page_images/global/b.png"]);
    assert_eq!(&*package.new.assets[0].bytes, b"b-bytes");
    assert_eq!(package.changed_documents, vec!["combined_data".to_string()]);
}

/// Every upload added after the snapshot ships exactly once
#[tokio::test]
async fn test_every_new_upload_is_collected_once() {
    let initial = site_documents();
    let mut current = initial.clone();

    let brand = png_handle(b"brand");
    set_field(&mut current, "nav", "logo", pending_upload(&brand, "brand.png"));
    // the same handle referenced twice in one place resolves to one asset
    set_field(&mut current, "nav", "mobileLogo", pending_upload(&brand, "brand.png"));

    let unnamed = png_handle(b"third");
    gallery_images(&mut current).push(ContentNode::object([("file", ContentNode::Blob(unnamed))]));

    let fetcher = site_fetcher();
    let package = fetcher
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(
        new_paths(&package),
        vec![
            "old/img/main_page_images/GalleryBlock/image_2.png",
            "old/img/nav_images/brand.png",
        ]
    );
    assert!(package.new.assets.iter().all(|a| a.descriptor.is_newly_added));
    assert_eq!(
        package.changed_documents,
        vec!["combined_data".to_string(), "nav".to_string()]
    );
    assert!(package.issues.is_empty());
}

/// A handle that was already in the snapshot is not new
#[tokio::test]
async fn test_handle_present_at_snapshot_is_not_new() {
    let handle = png_handle(b"early");
    let docs = DocumentSet::new().with(
        "about_page",
        ContentNode::object([("portrait", pending_upload(&handle, "me.png"))]),
    );

    let package = MapFetcher::new()
        .exporter()
        .export_package(&docs, &docs, &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(
        package.old.asset_paths().collect::<Vec<_>>(),
        vec!["old/img/about_page_images/me.png"]
    );
    assert!(package.new.assets.is_empty());
}

/// References that did not change resolve identically in both namespaces
#[tokio::test]
async fn test_unchanged_references_are_stable() {
    let initial = site_documents();
    let mut current = initial.clone();
    set_field(
        &mut current,
        "combined_data",
        "heroImage",
        pending_upload(&png_handle(b"x"), "fresh.png"),
    );

    let fetcher = site_fetcher();
    let package = fetcher
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();

    for document in ["nav", "services", "colors_output"] {
        assert_eq!(
            package.old.documents[document], package.new.documents[document],
            "{document} should be unchanged"
        );
    }
    let old_blocks = &package.old.documents["combined_data"]["mainPageBlocks"];
    let new_blocks = &package.new.documents["combined_data"]["mainPageBlocks"];
    assert_eq!(old_blocks, new_blocks);
}

/// Overlaying new/img onto old/img serves every path the new JSON references
#[tokio::test]
async fn test_overlay_reproduces_current_view() {
    let initial = site_documents();
    let mut current = initial.clone();
    set_field(&mut current, "nav", "logo", pending_upload(&png_handle(b"l"), "brand.png"));
    gallery_images(&mut current).push(pending_upload(&png_handle(b"g"), "three.png"));
    set_field(
        &mut current,
        "services",
        "banner",
        ContentNode::string("/assets/images/hero/a.jpg"),
    );

    let fetcher = site_fetcher();
    let package = fetcher
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();
    let mut sink = MemorySink::new();
    package.write_to(&mut sink).unwrap();

    let mut referenced = 0;
    for document in package.new.documents.keys() {
        let json = sink
            .get_json(&format!("new/jsons/{document}.json"))
            .expect("document written");
        for url in image_urls(&json, "old") {
            let path = url.trim_start_matches('/');
            let overlay = rebase(path, "old", "new");
            assert!(
                sink.get(path).is_some() || sink.get(&overlay).is_some(),
                "{url} is not served by the overlay"
            );
            referenced += 1;
        }
    }
    assert!(referenced >= 9);
}

/// A revoked handle drops the asset but keeps the JSON reference
#[tokio::test]
async fn test_revoked_handle_is_dropped_with_issue() {
    let initial = site_documents();
    let mut current = initial.clone();
    let upload = png_handle(b"gone");
    set_field(&mut current, "nav", "logo", pending_upload(&upload, "gone.png"));
    upload.revoke();

    let fetcher = site_fetcher();
    let package = fetcher
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();

    assert!(package.new.assets.is_empty());
    assert_eq!(package.new.documents["nav"]["logo"]["url"], "/old/img/nav_images/gone.png");
    assert!(matches!(
        &package.issues[..],
        [ExportIssue::HandleRevoked { namespace: Namespace::New, path, .. }]
            if path == "old/img/nav_images/gone.png"
    ));
}

/// An unreachable asset is dropped; the rest of the export goes on
#[tokio::test]
async fn test_failed_fetch_is_reported() {
    let docs = DocumentSet::new().with(
        "nav",
        ContentNode::from(json!({
            "logo": "/assets/images/logo.png",
            "badge": "/assets/images/missing.png"
        })),
    );

    let fetcher = site_fetcher();
    let package = fetcher
        .exporter()
        .export_package(&docs, &docs, &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(
        package.old.asset_paths().collect::<Vec<_>>(),
        vec!["old/img/nav_images/logo.png"]
    );
    assert_eq!(package.old.documents["nav"]["badge"], "/old/img/nav_images/missing.png");
    assert_eq!(package.issues.len(), 1);
    assert!(package.issues[0].drops_asset());
    assert!(matches!(
        package.issues[0],
        ExportIssue::MaterializationFailed { namespace: Namespace::Old, .. }
    ));
}

/// Two sources resolving to one path keep the later one and record it
#[tokio::test]
async fn test_path_collision_keeps_last_writer() {
    let docs = DocumentSet::new().with(
        "nav",
        ContentNode::from(json!({
            "footerLogo": "/assets/brand/logo.png",
            "logo": "/assets/images/logo.png"
        })),
    );
    let fetcher = site_fetcher();
    fetcher.serve("/assets/brand/logo.png", b"brand");

    let package = fetcher
        .exporter()
        .export_package(&docs, &docs, &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(package.old.assets.len(), 1);
    assert_eq!(&*package.old.assets[0].bytes, b"/assets/images/logo.png");
    // the losing source is not mistaken for a new asset
    assert!(package.new.assets.is_empty());
    assert_eq!(
        package.issues,
        vec![ExportIssue::PathCollision {
            namespace: Namespace::Old,
            path: "old/img/nav_images/logo.png".into(),
            kept: "/assets/images/logo.png".into(),
            replaced: "/assets/brand/logo.png".into(),
        }]
    );
}

/// Absolute URLs and links are left alone
#[tokio::test]
async fn test_remote_urls_and_links_pass_through() {
    let input = json!({
        "embed": "https://example.com/x.jpg",
        "links": [{"label": "About", "url": "/about"}],
        "mail": "mailto:hi@example.com"
    });
    let docs = DocumentSet::new().with("nav", ContentNode::from(input.clone()));

    let fetcher = MapFetcher::new();
    let package = fetcher
        .exporter()
        .export_package(&docs, &docs, &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(package.old.documents["nav"], input);
    assert!(package.old.assets.is_empty());
    assert_eq!(fetcher.calls(), 0);
}

/// A document that is not a tree aborts the export
#[tokio::test]
async fn test_scalar_document_is_fatal() {
    let initial = site_documents();
    let current = initial.clone().with("nav", ContentNode::from(json!(42)));

    let err = site_fetcher()
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::NotTraversable { ref document, kind: "number" } if document == "nav"
    ));
}
