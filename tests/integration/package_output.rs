//! Integration tests for package output
//!
//! Covers loading documents from disk, the zip and directory sinks, the
//! manifest, and custom root prefixes.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use super::common::fixtures::{
    image_urls, pending_upload, png_handle, set_field, site_documents, site_fetcher,
};
use serde_json::json;
use sitepack::export::{DirSink, MemorySink, Namespace, ZipSink};
use sitepack::media::path::rebase;
use sitepack::{ContentNode, ContentTypes, DocumentSet};
use tempfile::TempDir;

fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join(format!("{name}.json")),
        serde_json::to_vec_pretty(&value).unwrap(),
    )
    .unwrap();
}

/// The zip archive carries both namespaces, the manifest, and the README
#[tokio::test]
async fn test_zip_package_layout() {
    let initial = site_documents();
    let mut current = initial.clone();
    set_field(&mut current, "nav", "logo", pending_upload(&png_handle(b"brand"), "brand.png"));

    let package = site_fetcher()
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("export/site.zip");
    let mut sink = ZipSink::create(&out).unwrap();
    package.write_to(&mut sink).unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    for expected in [
        "old/jsons/nav.json",
        "old/jsons/combined_data.json",
        "new/jsons/nav.json",
        "old/img/nav_images/logo.png",
        "new/img/nav_images/brand.png",
        "manifest.json",
        "README",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }
    assert!(!names.iter().any(|n| n == "new/img/nav_images/logo.png"));

    let mut brand = Vec::new();
    archive
        .by_name("new/img/nav_images/brand.png")
        .unwrap()
        .read_to_end(&mut brand)
        .unwrap();
    assert_eq!(brand, b"brand");
}

/// Documents on disk with a picked file export through the directory sink
#[tokio::test]
async fn test_directory_export_from_disk() {
    let dir = TempDir::new().unwrap();
    let initial_dir = dir.path().join("initial");
    let current_dir = dir.path().join("current");

    write_json(
        &initial_dir,
        "combined_data",
        json!({"heroImage": "/assets/images/hero/a.jpg"}),
    );
    write_json(
        &current_dir,
        "combined_data",
        json!({"heroImage": {"file": "picked/new-hero.png", "name": "new-hero.png"}}),
    );
    fs::create_dir_all(current_dir.join("picked")).unwrap();
    fs::write(current_dir.join("picked/new-hero.png"), b"picked-bytes").unwrap();

    let initial = DocumentSet::load_dir(&initial_dir).unwrap();
    let current = DocumentSet::load_dir(&current_dir).unwrap();
    assert_eq!(current.get("combined_data").unwrap().handles().len(), 1);

    let package = site_fetcher()
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();

    let out = dir.path().join("out");
    let mut sink = DirSink::new(&out);
    package.write_to(&mut sink).unwrap();

    assert_eq!(
        fs::read(out.join("new/img/main_page_images/global/new-hero.png")).unwrap(),
        b"picked-bytes"
    );
    assert!(out.join("old/img/main_page_images/global/a.jpg").is_file());

    let new_json: serde_json::Value =
        serde_json::from_slice(&fs::read(out.join("new/jsons/combined_data.json")).unwrap())
            .unwrap();
    assert_eq!(
        new_json["heroImage"]["url"],
        "/old/img/main_page_images/global/new-hero.png"
    );
}

/// Loading one directory as both snapshot and current state changes nothing
#[tokio::test]
async fn test_same_directory_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "combined_data",
        json!({
            "heroImage": {"file": "picked/hero.png", "name": "hero.png"},
            "mainPageBlocks": [
                {"blockName": "HeroBlock", "config": {"backgroundImage": {"file": "picked/hero.png", "name": "hero.png"}}}
            ]
        }),
    );
    write_json(
        dir.path(),
        "nav",
        json!({"logo": {"file": "picked/hero.png", "name": "hero.png"}}),
    );
    fs::create_dir_all(dir.path().join("picked")).unwrap();
    fs::write(dir.path().join("picked/hero.png"), b"hero-bytes").unwrap();

    let initial = DocumentSet::load_dir(dir.path()).unwrap();
    let current = DocumentSet::load_dir(dir.path()).unwrap();

    let package = site_fetcher()
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();

    assert_eq!(
        package.old.asset_paths().collect::<Vec<_>>(),
        vec![
            "old/img/main_page_images/HeroBlock/hero.png",
            "old/img/main_page_images/global/hero.png",
            "old/img/nav_images/hero.png",
        ]
    );
    assert!(package.new.assets.is_empty());
    assert!(package.issues.is_empty(), "{:?}", package.issues);
    assert!(package.changed_documents.is_empty());
}

/// The manifest lists artifacts, changed documents, and dropped assets
#[tokio::test]
async fn test_manifest_contents() {
    let initial = site_documents().with(
        "about_page",
        ContentNode::from(json!({"photo": "/assets/images/team/missing.jpg"})),
    );
    let mut current = initial.clone();
    set_field(&mut current, "nav", "logo", pending_upload(&png_handle(b"b"), "brand.png"));

    let package = site_fetcher()
        .exporter()
        .export_package(&initial, &current, &ContentTypes::new())
        .await
        .unwrap();
    let mut sink = MemorySink::new();
    package.write_to(&mut sink).unwrap();

    let manifest = sink.get_json("manifest.json").unwrap();
    assert_eq!(manifest["changed_documents"], json!(["nav"]));
    assert_eq!(manifest["new"]["assets"][0]["path"], "old/img/nav_images/brand.png");
    assert_eq!(manifest["new"]["assets"][0]["newly_added"], true);
    assert_eq!(manifest["issues"][0]["kind"], "materialization_failed");
    assert_eq!(
        manifest["issues"][0]["path"],
        "old/img/about_page_images/team/missing.jpg"
    );
    assert_eq!(manifest["old"]["documents"].as_array().unwrap().len(), 5);
}

/// With a custom root prefix the old namespace takes its name, so every
/// URL in both JSON views is served by the package
#[tokio::test]
async fn test_custom_root_prefix() {
    let docs = site_documents();
    let mut current = docs.clone();
    set_field(&mut current, "nav", "icon", pending_upload(&png_handle(b"i"), "icon.png"));

    let package = site_fetcher()
        .exporter()
        .with_root_prefix("snapshot")
        .export_package(&docs, &current, &ContentTypes::new())
        .await
        .unwrap();
    let mut sink = MemorySink::new();
    package.write_to(&mut sink).unwrap();

    assert_eq!(
        sink.get_json("snapshot/jsons/nav.json").unwrap()["logo"],
        "/snapshot/img/nav_images/logo.png"
    );
    assert!(sink.get("new/img/nav_images/icon.png").is_some());
    assert!(sink.paths_under("old/").next().is_none());

    let mut referenced = 0;
    for (namespace, dir) in [(Namespace::Old, "snapshot"), (Namespace::New, "new")] {
        for document in package.side(namespace).documents.keys() {
            let json = sink
                .get_json(&format!("{dir}/jsons/{document}.json"))
                .expect("document written");
            for url in image_urls(&json, "snapshot") {
                let path = url.trim_start_matches('/');
                let served = sink.get(path).is_some()
                    || (namespace == Namespace::New
                        && sink.get(&rebase(path, "snapshot", "new")).is_some());
                assert!(served, "{url} is not served in {dir}/");
                referenced += 1;
            }
        }
    }
    assert!(referenced >= 15);
}
