//! Output writer for bundles and the rewritten main stylesheet.
//!
//! Files are written to a dot-prefixed temp file next to the target and
//! renamed over it, so a reader sees either the old or the new stylesheet.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use vendorcss_shared::{Result, VendorCssError, WrittenFile};

/// Writes stylesheets, or only reports them in dry-run mode.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dry_run: bool,
}

impl OutputWriter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Atomically replace `target` with `content`, creating parent directories.
    #[instrument(skip_all, fields(path = %target.display(), bytes = content.len()))]
    pub async fn write(&self, target: &Path, content: &str) -> Result<WrittenFile> {
        let written = WrittenFile {
            path: target.to_path_buf(),
            sha256: sha256_hex(content),
            size_bytes: content.len(),
        };

        if self.dry_run {
            info!(sha256 = %written.sha256, "dry run, not writing");
            return Ok(written);
        }

        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| VendorCssError::io(parent, e))?;

        let temp = temp_path(target)?;
        tokio::fs::write(&temp, content)
            .await
            .map_err(|e| VendorCssError::io(&temp, e))?;

        if let Err(e) = tokio::fs::rename(&temp, target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(VendorCssError::io(target, e));
        }

        debug!("renamed temp file over target");
        info!(size = written.size_bytes, sha256 = %written.sha256, "wrote stylesheet");
        Ok(written)
    }
}

/// `<dir>/.<name>.tmp` beside the target.
fn temp_path(target: &Path) -> Result<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        VendorCssError::validation(format!("output path has no file name: {}", target.display()))
    })?;
    Ok(target.with_file_name(format!(".{}.tmp", name.to_string_lossy())))
}

/// Lowercase hex SHA-256 of `content`.
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
