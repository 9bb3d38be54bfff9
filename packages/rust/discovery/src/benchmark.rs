//! Benchmark descriptor loading and page resolution.
//!
//! A benchmark descriptor names a curated set of page URLs. Each URL is mapped
//! to the generated HTML file that serves it, and the resolved files become a
//! restricted purge corpus in place of the full build tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;
use vendorcss_shared::{Result, VendorCssError};

/// Base used to extract the path of root-relative benchmark URLs.
static PLACEHOLDER_ORIGIN: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost/").expect("valid placeholder origin"));

/// The JSON benchmark file: `{"urls": ["/", "/posts/hello/", ...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkDescriptor {
    pub urls: Vec<String>,
}

/// Outcome of resolving a descriptor against a build directory.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkResolution {
    /// Resolved page files, deduplicated, in first-seen order.
    pub files: Vec<PathBuf>,
    /// URLs with no matching generated page.
    pub unresolved: Vec<String>,
}

/// Read and validate a benchmark descriptor.
///
/// A missing file, malformed JSON, or an empty `urls` list is a config error.
pub async fn load_descriptor(path: &Path) -> Result<BenchmarkDescriptor> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        VendorCssError::config(format!("cannot read benchmark {}: {e}", path.display()))
    })?;

    let descriptor: BenchmarkDescriptor = serde_json::from_str(&content).map_err(|e| {
        VendorCssError::config(format!("invalid benchmark {}: {e}", path.display()))
    })?;

    if descriptor.urls.is_empty() {
        return Err(VendorCssError::config(format!(
            "benchmark {} lists no urls",
            path.display()
        )));
    }

    debug!(path = %path.display(), urls = descriptor.urls.len(), "benchmark loaded");
    Ok(descriptor)
}

/// Map every descriptor URL to a generated page under `build_dir`.
///
/// Unresolved URLs are reported, not fatal; resolving none at all is.
#[instrument(skip_all, fields(build_dir = %build_dir.display(), urls = descriptor.urls.len()))]
pub async fn resolve(
    descriptor: &BenchmarkDescriptor,
    build_dir: &Path,
    base_prefix: &str,
) -> Result<BenchmarkResolution> {
    let mut seen = HashSet::new();
    let mut resolution = BenchmarkResolution::default();

    for url in &descriptor.urls {
        let Some(path) = url_path(url) else {
            warn!(%url, "benchmark URL is not parseable");
            resolution.unresolved.push(url.clone());
            continue;
        };

        let mut found = None;
        for candidate in candidate_paths(&path, base_prefix) {
            let full = build_dir.join(&candidate);
            if tokio::fs::metadata(&full).await.is_ok_and(|m| m.is_file()) {
                found = Some(full);
                break;
            }
        }

        match found {
            Some(file) => {
                debug!(%url, file = %file.display(), "benchmark URL resolved");
                if seen.insert(file.clone()) {
                    resolution.files.push(file);
                }
            }
            None => resolution.unresolved.push(url.clone()),
        }
    }

    if resolution.files.is_empty() {
        return Err(VendorCssError::benchmark(format!(
            "none of the {} benchmark URLs resolved to a generated HTML file",
            descriptor.urls.len()
        )));
    }

    info!(
        resolved = resolution.files.len(),
        unresolved = resolution.unresolved.len(),
        "benchmark corpus resolved"
    );
    Ok(resolution)
}

/// Decoded, dot-normalized path component of a page URL.
fn url_path(raw: &str) -> Option<String> {
    let url = PLACEHOLDER_ORIGIN.join(raw.trim()).ok()?;
    Some(percent_decode_str(url.path()).decode_utf8_lossy().into_owned())
}

/// Build-relative candidate files for a URL path, in resolution order.
///
/// 1. the path itself when it names an `.html` file
/// 2. `index.html` under the path when it is empty or ends in `/`
/// 3. the `<path>.html` sibling
/// 4. `<path>/index.html`
pub fn candidate_paths(url_path: &str, base_prefix: &str) -> Vec<String> {
    let path = strip_base_prefix(url_path, base_prefix);
    let rel = path.trim_start_matches('/');

    let mut candidates: Vec<String> = Vec::with_capacity(4);
    if rel.to_ascii_lowercase().ends_with(".html") {
        candidates.push(rel.to_string());
    }
    if rel.is_empty() || rel.ends_with('/') {
        candidates.push(format!("{rel}index.html"));
    }
    let trimmed = rel.trim_end_matches('/');
    if !trimmed.is_empty() {
        candidates.push(format!("{trimmed}.html"));
        candidates.push(format!("{trimmed}/index.html"));
    }

    let mut seen = HashSet::new();
    candidates.retain(|c| !c.split('/').any(|seg| seg == "..") && seen.insert(c.clone()));
    candidates
}

/// Remove the deployment prefix when the path lives under it.
fn strip_base_prefix<'a>(path: &'a str, base_prefix: &str) -> &'a str {
    if base_prefix.is_empty() {
        return path;
    }
    match path.strip_prefix(base_prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}
