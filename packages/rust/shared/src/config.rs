//! Bundle manifest for vendorcss.
//!
//! The manifest declares which vendor stylesheets are bundled, how each
//! bundle is purged, and which superseded files are removed afterwards.
//! A `--manifest` path overrides `vendorcss.toml` in the working directory,
//! which overrides the built-in defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VendorCssError};
use crate::types::{Bundle, ContentCorpus, Safelist, StylesheetSource};

/// Manifest file looked up in the working directory.
pub const MANIFEST_FILE_NAME: &str = "vendorcss.toml";

// ---------------------------------------------------------------------------
// Manifest structs (matching vendorcss.toml schema)
// ---------------------------------------------------------------------------

/// Top-level manifest, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Output directory for bundles, relative to the build directory.
    #[serde(default = "default_css_dir")]
    pub css_dir: String,

    /// Path suffix whose `href` reveals the deployment prefix.
    #[serde(default = "default_prefix_marker")]
    pub prefix_marker: String,

    /// File extensions (without dot) scanned when the corpus is the full tree.
    #[serde(default = "default_corpus_extensions")]
    pub corpus_extensions: Vec<String>,

    /// Delete the build-tree copies of bundled sources after writing.
    #[serde(default = "default_true")]
    pub remove_originals: bool,

    /// Optional timeout for remote fetches; absent means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,

    /// Site stylesheet re-purged in place, if present in the build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_stylesheet: Option<MainStylesheetConfig>,

    /// Output bundles, written in declaration order.
    #[serde(default)]
    pub bundles: Vec<BundleConfig>,

    /// Additional files to remove.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// `[main_stylesheet]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainStylesheetConfig {
    /// Path relative to the build directory.
    pub path: String,
    #[serde(default)]
    pub safelist: Safelist,
}

/// `[[bundles]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    pub name: String,
    /// Output filename (no directory components).
    pub output: String,
    #[serde(default)]
    pub corpus: CorpusMode,
    #[serde(default)]
    pub safelist: Safelist,
    pub sources: Vec<SourceEntry>,
}

/// A manifest source: `{ local = "..." }` or `{ remote = "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceEntry {
    Local(String),
    Remote(String),
}

/// Corpus selection declared for a bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorpusMode {
    /// Purge against the build tree (or the benchmark subset, when given).
    #[default]
    FullTree,
    /// Minify only.
    None,
}

/// `[cleanup]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Extra build-relative paths removed after a successful run.
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        let safelist = default_safelist();
        Self {
            css_dir: default_css_dir(),
            prefix_marker: default_prefix_marker(),
            corpus_extensions: default_corpus_extensions(),
            remove_originals: true,
            fetch_timeout_secs: None,
            main_stylesheet: Some(MainStylesheetConfig {
                path: "assets/css/main.css".into(),
                safelist: safelist.clone(),
            }),
            bundles: vec![BundleConfig {
                name: "vendor".into(),
                output: "vendor.css".into(),
                corpus: CorpusMode::FullTree,
                safelist,
                sources: [
                    "assets/bower_components/lightgallery/dist/css/lightgallery.min.css",
                    "assets/bower_components/bootstrap/dist/css/bootstrap.min.css",
                    "assets/bower_components/font-awesome/web-fonts-with-css/css/fontawesome-all.min.css",
                    "assets/bower_components/icono/dist/icono.min.css",
                ]
                .into_iter()
                .map(|p| SourceEntry::Local(p.into()))
                .collect(),
            }],
            cleanup: CleanupConfig::default(),
        }
    }
}

fn default_css_dir() -> String {
    "assets/css".into()
}
fn default_prefix_marker() -> String {
    "/assets/css/main.css".into()
}
fn default_corpus_extensions() -> Vec<String> {
    ["html", "js", "xml", "json"].map(String::from).to_vec()
}
fn default_true() -> bool {
    true
}

/// Bootstrap/lightgallery state classes toggled by scripts at runtime.
fn default_safelist() -> Safelist {
    Safelist {
        standard: [
            "active",
            "fade",
            "show",
            "collapse",
            "collapsing",
            "collapsed",
            "modal",
            "modal-open",
            "dropdown",
            "dropdown-menu",
            "dropdown-toggle",
            "dropup",
            "tooltip",
            "popover",
        ]
        .map(String::from)
        .to_vec(),
        greedy: [
            "^lg-",
            "^lightgallery",
            "^navbar",
            "^modal",
            "^tooltip",
            "^popover",
            "^dropdown",
        ]
        .map(String::from)
        .to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Validation and conversion
// ---------------------------------------------------------------------------

impl Manifest {
    /// Check structural rules that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.bundles.is_empty() {
            return Err(VendorCssError::config("manifest declares no bundles"));
        }

        let mut names = HashSet::new();
        let mut outputs = HashSet::new();
        for bundle in &self.bundles {
            if !names.insert(bundle.name.as_str()) {
                return Err(VendorCssError::config(format!(
                    "duplicate bundle name '{}'",
                    bundle.name
                )));
            }
            if bundle.output.is_empty()
                || bundle.output.contains('/')
                || bundle.output.contains('\\')
                || bundle.output == "."
                || bundle.output == ".."
            {
                return Err(VendorCssError::config(format!(
                    "bundle '{}': output must be a bare filename, got '{}'",
                    bundle.name, bundle.output
                )));
            }
            if !outputs.insert(bundle.output.as_str()) {
                return Err(VendorCssError::config(format!(
                    "bundle '{}': output '{}' is already used by another bundle",
                    bundle.name, bundle.output
                )));
            }
            if bundle.sources.is_empty() {
                return Err(VendorCssError::config(format!(
                    "bundle '{}' has no sources",
                    bundle.name
                )));
            }
            for entry in &bundle.sources {
                if let SourceEntry::Remote(url) = entry {
                    StylesheetSource::remote(url).map_err(|e| {
                        VendorCssError::config(format!("bundle '{}': {e}", bundle.name))
                    })?;
                }
            }
            validate_safelist(&bundle.name, &bundle.safelist)?;
        }

        if let Some(main) = &self.main_stylesheet {
            validate_safelist("main_stylesheet", &main.safelist)?;
        }

        Ok(())
    }

    /// Convert the declared bundles into runtime [`Bundle`] values.
    ///
    /// `full_tree_corpus` replaces [`ContentCorpus::FullTree`] for bundles that
    /// purge; it carries the benchmark-restricted file list when one is given.
    pub fn bundles(&self, full_tree_corpus: &ContentCorpus) -> Result<Vec<Bundle>> {
        self.bundles
            .iter()
            .map(|cfg| {
                let sources = cfg
                    .sources
                    .iter()
                    .map(|entry| match entry {
                        SourceEntry::Local(path) => Ok(StylesheetSource::local(path)),
                        SourceEntry::Remote(url) => StylesheetSource::remote(url).map_err(|e| {
                            VendorCssError::config(format!("bundle '{}': {e}", cfg.name))
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;

                let corpus = match cfg.corpus {
                    CorpusMode::FullTree => full_tree_corpus.clone(),
                    CorpusMode::None => ContentCorpus::Empty,
                };

                Ok(Bundle {
                    name: cfg.name.clone(),
                    output: cfg.output.clone(),
                    sources,
                    safelist: cfg.safelist.clone(),
                    corpus,
                })
            })
            .collect()
    }
}

fn validate_safelist(owner: &str, safelist: &Safelist) -> Result<()> {
    for pattern in &safelist.greedy {
        regex::Regex::new(pattern).map_err(|e| {
            VendorCssError::config(format!("{owner}: invalid greedy safelist pattern '{pattern}': {e}"))
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Manifest loading
// ---------------------------------------------------------------------------

/// Path of the manifest looked up in the working directory.
pub fn manifest_file_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| VendorCssError::io(".", e))?;
    Ok(cwd.join(MANIFEST_FILE_NAME))
}

/// Load `vendorcss.toml` from the working directory, or the built-in defaults.
pub fn load_manifest() -> Result<Manifest> {
    let path = manifest_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "manifest not found, using built-in defaults");
        return Ok(Manifest::default());
    }

    load_manifest_from(&path)
}

/// Load and validate a manifest from a specific file path.
pub fn load_manifest_from(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| VendorCssError::io(path, e))?;

    let manifest: Manifest = toml::from_str(&content).map_err(|e| {
        VendorCssError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    manifest.validate()?;

    tracing::debug!(?path, bundles = manifest.bundles.len(), "manifest loaded");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_manifest_is_valid() {
        let manifest = Manifest::default();
        manifest.validate().expect("defaults validate");
        assert_eq!(manifest.bundles.len(), 1);
        assert_eq!(manifest.bundles[0].output, "vendor.css");
        assert_eq!(manifest.bundles[0].sources.len(), 4);
    }

    #[test]
    fn manifest_roundtrip() {
        let manifest = Manifest::default();
        let toml_str = toml::to_string_pretty(&manifest).expect("serialize");
        let parsed: Manifest = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.css_dir, "assets/css");
        assert_eq!(parsed.bundles[0].sources, manifest.bundles[0].sources);
        assert!(parsed.bundles[0].safelist.greedy.contains(&"^lg-".to_string()));
    }

    #[test]
    fn manifest_with_remote_source() {
        let toml_str = r#"
[[bundles]]
name = "fonts"
output = "fonts.css"
corpus = "none"
sources = [
  { local = "assets/css/fonts.css" },
  { remote = "https://cdn.example.com/fonts/inter.css" },
]
"#;
        let manifest: Manifest = toml::from_str(toml_str).expect("parse");
        manifest.validate().expect("valid");
        assert_eq!(manifest.bundles[0].corpus, CorpusMode::None);
        assert_eq!(
            manifest.bundles[0].sources[1],
            SourceEntry::Remote("https://cdn.example.com/fonts/inter.css".into())
        );
        assert_eq!(manifest.prefix_marker, "/assets/css/main.css");
        assert!(manifest.remove_originals);

        let bundles = manifest.bundles(&ContentCorpus::FullTree).unwrap();
        assert_eq!(bundles[0].corpus, ContentCorpus::Empty);
        assert!(!bundles[0].sources[1].is_local());
    }

    #[test]
    fn full_tree_corpus_is_substituted() {
        let manifest = Manifest::default();
        let restricted = ContentCorpus::Files(vec![PathBuf::from("/build/index.html")]);
        let bundles = manifest.bundles(&restricted).unwrap();
        assert_eq!(bundles[0].corpus, restricted);
    }

    #[test]
    fn rejects_empty_and_duplicate_bundles() {
        let mut manifest = Manifest::default();
        manifest.bundles.clear();
        assert!(manifest.validate().is_err());

        let mut manifest = Manifest::default();
        let mut copy = manifest.bundles[0].clone();
        copy.name = "other".into();
        manifest.bundles.push(copy);
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("already used"));
    }

    #[test]
    fn rejects_output_with_directory() {
        let mut manifest = Manifest::default();
        manifest.bundles[0].output = "../escape.css".into();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn rejects_invalid_greedy_pattern() {
        let mut manifest = Manifest::default();
        manifest.bundles[0].safelist.greedy.push("(unclosed".into());
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("invalid greedy safelist pattern"));
    }

    #[test]
    fn rejects_bad_remote_url() {
        let mut manifest = Manifest::default();
        manifest.bundles[0]
            .sources
            .push(SourceEntry::Remote("file:///etc/passwd".into()));
        let err = manifest.validate().unwrap_err();
        assert!(matches!(err, VendorCssError::Config { .. }));
        let err = manifest.bundles(&ContentCorpus::FullTree).unwrap_err();
        assert!(matches!(err, VendorCssError::Config { .. }));
    }

    #[test]
    fn load_manifest_from_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("vendorcss-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.toml");
        std::fs::write(&path, "bundles = 7").unwrap();

        let err = load_manifest_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
