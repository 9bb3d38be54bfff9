//! Core domain types for the stylesheet pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, VendorCssError};

// ---------------------------------------------------------------------------
// StylesheetSource
// ---------------------------------------------------------------------------

/// Where a stylesheet's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A file relative to the source root.
    LocalFile,
    /// An absolute `http(s)` URL.
    RemoteUrl,
}

/// One input stylesheet of a bundle. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StylesheetSource {
    kind: SourceKind,
    identifier: String,
    locator: String,
}

impl StylesheetSource {
    /// A local file, addressed by its path relative to the source root.
    ///
    /// Backslashes are normalized to `/` so the locator is always POSIX-style.
    pub fn local(relative_path: impl AsRef<str>) -> Self {
        let posix = relative_path.as_ref().replace('\\', "/");
        Self {
            kind: SourceKind::LocalFile,
            identifier: posix.clone(),
            locator: posix,
        }
    }

    /// A remote stylesheet. The URL must be absolute `http` or `https`.
    pub fn remote(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| VendorCssError::validation(format!("invalid remote URL '{url}': {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(VendorCssError::validation(format!(
                "remote source must be http(s): {url}"
            )));
        }
        Ok(Self {
            kind: SourceKind::RemoteUrl,
            identifier: parsed.to_string(),
            locator: parsed.to_string(),
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Human-readable identity, used in provenance comments and logs.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Relative path (local) or absolute URL (remote).
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn is_local(&self) -> bool {
        self.kind == SourceKind::LocalFile
    }
}

impl std::fmt::Display for StylesheetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identifier)
    }
}

// ---------------------------------------------------------------------------
// RebaseContext
// ---------------------------------------------------------------------------

/// How relative `url(...)` references of one source are rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseMode {
    /// Root-relative paths under the site's deployment prefix (possibly empty).
    Site { base_prefix: String },
    /// Fully-qualified URLs resolved against the remote stylesheet's own URL.
    Remote { source_url: Url },
}

/// The frame against which relative URLs inside a source are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseContext {
    pub mode: RebaseMode,
    /// POSIX directory containing the source, derived from its locator.
    pub source_directory: String,
}

impl RebaseContext {
    /// Build the context for a source under the detected base prefix.
    ///
    /// Local sources rebase in site mode; remote sources in remote mode.
    pub fn for_source(source: &StylesheetSource, base_prefix: &str) -> Result<Self> {
        match source.kind() {
            SourceKind::LocalFile => Ok(Self {
                mode: RebaseMode::Site {
                    base_prefix: base_prefix.to_string(),
                },
                source_directory: posix_dirname(source.locator()).to_string(),
            }),
            SourceKind::RemoteUrl => {
                let source_url = Url::parse(source.locator()).map_err(|e| {
                    VendorCssError::validation(format!("invalid remote URL '{source}': {e}"))
                })?;
                let source_directory = posix_dirname(source_url.path()).to_string();
                Ok(Self {
                    mode: RebaseMode::Remote { source_url },
                    source_directory,
                })
            }
        }
    }
}

/// POSIX `dirname`: everything before the last `/`, `"."` when there is none.
fn posix_dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

// ---------------------------------------------------------------------------
// Bundle / ContentCorpus
// ---------------------------------------------------------------------------

/// Patterns exempt from purging regardless of corpus presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safelist {
    /// Symbol names kept when they match exactly.
    #[serde(default)]
    pub standard: Vec<String>,
    /// Regexes; a selector containing a matching symbol is kept whole.
    #[serde(default)]
    pub greedy: Vec<String>,
}

/// Files scanned for selector tokens when purging a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentCorpus {
    /// An explicit list of absolute file paths (benchmark-restricted).
    Files(Vec<PathBuf>),
    /// Every corpus-eligible file under the build output tree.
    FullTree,
    /// Skip purging; minify only.
    Empty,
}

/// A named, independently purged and minified output stylesheet.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub name: String,
    /// Output filename, written under the build's CSS directory.
    pub output: String,
    /// Concatenation order; cascade-significant.
    pub sources: Vec<StylesheetSource>,
    pub safelist: Safelist,
    pub corpus: ContentCorpus,
}

// ---------------------------------------------------------------------------
// BuildResult
// ---------------------------------------------------------------------------

/// Metadata for a single file written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    /// Files written, in write order.
    pub written_files: Vec<WrittenFile>,
    /// Benchmark URLs that did not map to a generated page.
    pub unresolved_benchmark_urls: Vec<String>,
    /// Superseded originals actually removed from the build tree.
    pub removed_files: Vec<PathBuf>,
    /// The detected deployment prefix (empty at domain root).
    pub base_prefix: String,
}
