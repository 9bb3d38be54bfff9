//! Deployment prefix detection from generated HTML.
//!
//! Every page of a build links the site stylesheet; the part of that `href`
//! before the marker path is the prefix the site is served under.

use std::path::Path;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;
use vendorcss_shared::{Result, VendorCssError};

use crate::scanner;

static HREF_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[href]").expect("valid selector"));

/// Detect the base prefix of the site in `build_dir`.
///
/// Pages are inspected in scanner order and the first page linking the
/// marker wins. Returns `""` when the site is served from the domain root
/// or no page carries the marker.
#[instrument(skip_all, fields(build_dir = %build_dir.display()))]
pub async fn detect_base_prefix(build_dir: &Path, marker: &str) -> Result<String> {
    let files = scanner::list_files(build_dir).await?;
    let html_ext = ["html".to_string()];

    for path in files.iter().filter(|p| scanner::has_extension(p, &html_ext)) {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| VendorCssError::io(path, e))?;
        let html = String::from_utf8_lossy(&bytes);

        if let Some(prefix) = prefix_from_html(&html, marker) {
            info!(page = %path.display(), prefix = %prefix, "base prefix detected");
            return Ok(prefix);
        }
    }

    debug!("no page links the marker stylesheet, assuming domain root");
    Ok(String::new())
}

/// Extract the prefix from the first `href` ending in `marker` (ASCII case-insensitive).
///
/// Absolute and protocol-relative URLs contribute their path. Any other href
/// yields its leading text as written, so `../assets/css/main.css` gives `..`.
pub fn prefix_from_html(html: &str, marker: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    doc.select(&HREF_SEL)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| leading_path(href.trim(), marker))
}

fn leading_path(href: &str, marker: &str) -> Option<String> {
    if marker.is_empty() || href.len() < marker.len() {
        return None;
    }
    let split = href.len() - marker.len();
    if !href.is_char_boundary(split) || !href[split..].eq_ignore_ascii_case(marker) {
        return None;
    }

    let mut prefix = href[..split].to_string();

    if let Ok(absolute) = Url::parse(href) {
        let path = absolute.path();
        prefix = path[..path.len().saturating_sub(marker.len())].to_string();
    } else if let Some(rest) = prefix.strip_prefix("//") {
        // protocol-relative: drop the authority
        prefix = rest.find('/').map(|i| rest[i..].to_string()).unwrap_or_default();
    }

    Some(normalize_prefix(&prefix))
}

/// `/` means root; otherwise drop a single trailing slash.
fn normalize_prefix(prefix: &str) -> String {
    if prefix == "/" {
        String::new()
    } else {
        prefix.strip_suffix('/').unwrap_or(prefix).to_string()
    }
}
