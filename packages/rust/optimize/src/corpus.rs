//! Token index over the purge corpus.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};
use vendorcss_shared::{Result, VendorCssError};

/// Anything that could be a class or id name in markup or scripts.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_-]+").expect("valid regex"));

/// The set of literal tokens found across corpus files.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    tokens: HashSet<String>,
}

impl CorpusIndex {
    /// Read every file and collect its tokens.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn build(files: &[PathBuf]) -> Result<Self> {
        let mut index = Self::default();
        for path in files {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| VendorCssError::io(path, e))?;
            index.add_text(&String::from_utf8_lossy(&bytes));
        }
        debug!(tokens = index.tokens.len(), "corpus indexed");
        Ok(index)
    }

    /// Index in-memory texts.
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut index = Self::default();
        for text in texts {
            index.add_text(text);
        }
        index
    }

    fn add_text(&mut self, text: &str) {
        for m in TOKEN_RE.find_iter(text) {
            if !self.tokens.contains(m.as_str()) {
                self.tokens.insert(m.as_str().to_string());
            }
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Number of distinct tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}
