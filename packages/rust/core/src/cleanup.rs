//! Removal of vendor originals superseded by the emitted bundles.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use vendorcss_shared::{Bundle, Manifest};

/// Build-relative paths made obsolete by a successful run.
///
/// Every local source of every bundle plus its `.map`, the main
/// stylesheet's `.map`, then `cleanup.extra`. Order is stable, duplicates
/// are dropped.
pub fn cleanup_targets(manifest: &Manifest, bundles: &[Bundle]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let mut push = |path: String| {
        let path = path.trim_start_matches('/').to_string();
        if !path.is_empty() && seen.insert(path.clone()) {
            targets.push(path);
        }
    };

    for source in bundles.iter().flat_map(|b| &b.sources).filter(|s| s.is_local()) {
        push(source.locator().to_string());
        push(format!("{}.map", source.locator()));
    }
    if let Some(main) = &manifest.main_stylesheet {
        push(format!("{}.map", main.path));
    }
    for extra in &manifest.cleanup.extra {
        push(extra.replace('\\', "/"));
    }

    targets
}

/// Drop targets that resolve to a file this run writes.
pub fn exclude_outputs(targets: Vec<String>, build_dir: &Path, outputs: &[PathBuf]) -> Vec<String> {
    targets
        .into_iter()
        .filter(|rel| {
            let path = build_dir.join(rel);
            let keep = !outputs.iter().any(|out| *out == path);
            if !keep {
                debug!(path = %rel, "kept: overwritten by this run");
            }
            keep
        })
        .collect()
}

/// Delete `targets` under `build_dir`, best-effort.
///
/// Missing files are skipped silently; any other failure is logged and the
/// next file is tried. Returns the files actually removed (or, in dry-run
/// mode, the files that exist and would be removed).
#[instrument(skip_all, fields(build_dir = %build_dir.display(), targets = targets.len(), dry_run = dry_run))]
pub async fn remove_originals(build_dir: &Path, targets: &[String], dry_run: bool) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    for rel in targets {
        if rel.split('/').any(|seg| seg == "..") {
            warn!(path = %rel, "refusing to delete outside the build directory");
            continue;
        }
        let path = build_dir.join(rel);

        if dry_run {
            if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
                removed.push(path);
            }
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed");
                removed.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove original"),
        }
    }

    info!(removed = removed.len(), "cleanup complete");
    removed
}
