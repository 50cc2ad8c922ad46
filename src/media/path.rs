//! Canonical destination paths for media assets
//!
//! Paths are synthesized from the semantic context an asset was found in
//! (document content type, owning block, service category) plus a few
//! filename hints. The resolver is a pure function: identical inputs always
//! produce the identical path, which the diff export depends on.

use std::sync::OnceLock;

use regex::Regex;

use crate::content::{ContentNode, ContentType};

use super::classify::{strip_query, MediaKind};

/// Bucket used when no owning block can be determined
pub const GLOBAL_BUCKET: &str = "global";

/// Folder under the root prefix that holds every asset
pub const IMG_DIR: &str = "img";

const FALLBACK_FILE_NAME: &str = "asset";

/// Identifies the service entry an asset belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ServiceContext {
    pub category: String,
    pub id: String,
}

impl ServiceContext {
    pub fn new(category: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            id: id.into(),
        }
    }

    /// Derive from a service entry; falls back to the entry's index for the id
    pub fn from_entry(category: &str, entry: &ContentNode, index: usize) -> Self {
        let id = match entry.get("id") {
            Some(ContentNode::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(ContentNode::Number(n)) => n.to_string(),
            _ => index.to_string(),
        };
        Self::new(category, id)
    }

    /// `{category}_{id}` folder name
    pub fn slug(&self) -> String {
        format!(
            "{}_{}",
            sanitize_segment(&self.category).unwrap_or_else(|| "service".to_string()),
            sanitize_segment(&self.id).unwrap_or_else(|| "0".to_string())
        )
    }
}

/// Resolve the destination path of an asset
///
/// The returned path is relative (no leading slash) and rooted at
/// `<root_prefix>/img/`. An `original_url` already inside that namespace is
/// returned verbatim so unchanged assets never move.
pub fn resolve(
    file_name: &str,
    owner_block_name: &str,
    content_type: ContentType,
    service: Option<&ServiceContext>,
    original_url: Option<&str>,
    root_prefix: &str,
) -> String {
    let img_root = format!("{}/{IMG_DIR}/", root_prefix.trim_matches('/'));

    if let Some(existing) = original_url.and_then(|url| existing_path(url, &img_root)) {
        return existing;
    }

    let file = sanitize_file_name(file_name).unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
    let block = sanitize_segment(owner_block_name).unwrap_or_else(|| GLOBAL_BUCKET.to_string());

    let base = match content_type {
        ContentType::Main => format!("main_page_images/{block}"),
        ContentType::Navbar => "nav_images".to_string(),
        ContentType::About => "about_page_images".to_string(),
        ContentType::Services => match service {
            Some(ctx) => format!("services/{}", ctx.slug()),
            None => format!("services/{block}"),
        },
        ContentType::Showcase => format!("showcase_images/{block}"),
        ContentType::Default => format!("{GLOBAL_BUCKET}_images/{block}"),
    };

    let mut path = format!("{img_root}{base}/");
    if let Some(sub) = hint_subfolder(&file) {
        path.push_str(sub);
        path.push('/');
    }
    path.push_str(&file);
    path
}

/// The site URL of a resolved path
pub fn to_site_url(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Move a resolved path from one root namespace to another
///
/// `old/img/a/b.png` rebased from `old` to `new` is `new/img/a/b.png`.
/// Paths outside `from_root` are placed under `to_root` unchanged.
pub fn rebase(path: &str, from_root: &str, to_root: &str) -> String {
    let from = format!("{}/", from_root.trim_matches('/'));
    let to = to_root.trim_matches('/');
    let relative = path.trim_start_matches('/');
    match relative.strip_prefix(&from) {
        Some(rest) => format!("{to}/{rest}"),
        None => format!("{to}/{relative}"),
    }
}

/// Last path segment of a URL or path, without query or fragment
pub fn file_name_of(url: &str) -> &str {
    let path = strip_query(url.trim());
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

fn existing_path(url: &str, img_root: &str) -> Option<String> {
    let relative = strip_query(url.trim())
        .trim_start_matches("./")
        .trim_start_matches('/');
    let rest = relative.strip_prefix(img_root)?;
    if rest.is_empty() || rest.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(relative.to_string())
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"))
}

/// Reduce a file name to a path-safe basename
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = file_name_of(name);
    let cleaned = unsafe_chars().replace_all(base.trim(), "_");
    let cleaned = cleaned
        .trim_start_matches(|c: char| c == '.' || c == '_')
        .trim_end_matches('_');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn sanitize_segment(segment: &str) -> Option<String> {
    let cleaned = unsafe_chars().replace_all(segment.trim(), "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Dedicated subfolder suggested by a file name, if any
///
/// Substring sniffing is a best-effort heuristic: a name that happens to
/// contain `team` is filed under `team/` whatever it depicts.
fn hint_subfolder(file: &str) -> Option<&'static str> {
    let lower = file.to_lowercase();
    if MediaKind::from_name(&lower) == MediaKind::Video {
        Some("videos")
    } else if lower.contains("overlay") {
        Some("overlays")
    } else if lower.contains("carousel") || lower.contains("slideshow") {
        Some("carousel")
    } else if lower.contains("gallery") {
        Some("gallery")
    } else if lower.contains("team") || lower.contains("member") {
        Some("team")
    } else {
        None
    }
}
