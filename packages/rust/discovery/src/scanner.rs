//! Recursive file listing over the build output tree.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::{debug, instrument};
use vendorcss_shared::{Result, VendorCssError};

/// List every regular file under `root`, depth-first.
///
/// Entries of each directory are visited in file-name order, so the result
/// is stable across runs. Symlinks are neither followed nor returned.
#[instrument(skip_all, fields(root = %root.display()))]
pub async fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, &mut files).await?;
    debug!(count = files.len(), "scanned build tree");
    Ok(files)
}

fn walk<'a>(
    dir: &'a Path,
    out: &'a mut Vec<PathBuf>,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut reader = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| VendorCssError::io(dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| VendorCssError::io(dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| VendorCssError::io(entry.path(), e))?;
            entries.push((entry.file_name(), entry.path(), file_type));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, path, file_type) in entries {
            if file_type.is_dir() {
                walk(&path, out).await?;
            } else if file_type.is_file() {
                out.push(path);
            }
        }
        Ok(())
    })
}

/// Whether `path` ends in one of `extensions` (without dot), ignoring case.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// The full-tree purge corpus: every file under `root` with a corpus extension.
pub async fn corpus_files(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let files = list_files(root).await?;
    Ok(files
        .into_iter()
        .filter(|p| has_extension(p, extensions))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vendorcss-scan-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn lists_nested_files_in_name_order() {
        let tmp = temp_dir();
        std::fs::create_dir_all(tmp.join("b/inner")).unwrap();
        std::fs::write(tmp.join("c.html"), "").unwrap();
        std::fs::write(tmp.join("a.html"), "").unwrap();
        std::fs::write(tmp.join("b/inner/z.js"), "").unwrap();
        std::fs::write(tmp.join("b/x.json"), "").unwrap();

        let files = list_files(&tmp).await.unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(&tmp).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["a.html", "b/inner/z.js", "b/x.json", "c.html"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_root_is_io_error() {
        let tmp = temp_dir().join("does-not-exist");
        let err = list_files(&tmp).await.unwrap_err();
        assert!(matches!(err, VendorCssError::Io { .. }));
    }

    #[tokio::test]
    async fn corpus_filters_by_extension_case_insensitively() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("INDEX.HTML"), "").unwrap();
        std::fs::write(tmp.join("feed.xml"), "").unwrap();
        std::fs::write(tmp.join("style.css"), "").unwrap();
        std::fs::write(tmp.join("photo.png"), "").unwrap();

        let exts = vec!["html".to_string(), "xml".to_string()];
        let files = corpus_files(&tmp, &exts).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| !p.to_string_lossy().ends_with(".css")));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
