//! Unused-selector removal against a corpus of generated files.
//!
//! A class or id is *used* when its name occurs as a token anywhere in the
//! corpus or is safelisted. Style rules whose every selector references an
//! unused name are dropped, then `@keyframes` left without any reference are
//! dropped too. Nothing is ever added: the output is a subset of the input
//! rules. Element, attribute and pseudo selectors are never purged.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};
use vendorcss_shared::{Result, Safelist, VendorCssError};

use crate::corpus::CorpusIndex;
use crate::minify::transform;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

/// Text between a block boundary and the next `{`.
static PRELUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^{}]+)\{").expect("valid regex"));

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.#](-?[A-Za-z_][A-Za-z0-9_-]*)").expect("valid regex"));

static KEYFRAMES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?:-[A-Za-z]+-)?keyframes\s+([A-Za-z_-][A-Za-z0-9_-]*)").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Safelist
// ---------------------------------------------------------------------------

/// A [`Safelist`] with its greedy patterns compiled.
#[derive(Debug, Clone, Default)]
pub struct CompiledSafelist {
    standard: HashSet<String>,
    greedy: Vec<Regex>,
}

impl CompiledSafelist {
    pub fn compile(safelist: &Safelist) -> Result<Self> {
        let greedy = safelist
            .greedy
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    VendorCssError::config(format!("invalid greedy safelist pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            standard: safelist.standard.iter().cloned().collect(),
            greedy,
        })
    }

    /// Whether `symbol` alone is exempt from purging.
    pub fn keeps(&self, symbol: &str) -> bool {
        self.standard.contains(symbol) || self.is_greedy(symbol)
    }

    fn is_greedy(&self, symbol: &str) -> bool {
        self.greedy.iter().any(|re| re.is_match(symbol))
    }
}

// ---------------------------------------------------------------------------
// Symbol scanning
// ---------------------------------------------------------------------------

/// Class and id names referenced by style rule selectors.
#[derive(Debug, Default)]
struct SelectorSymbols {
    all: HashSet<String>,
    /// Names sharing a selector with a greedily safelisted name.
    greedy_protected: HashSet<String>,
}

fn selector_symbols(css: &str, safelist: &CompiledSafelist) -> SelectorSymbols {
    let stripped = COMMENT_RE.replace_all(css, "");
    let mut symbols = SelectorSymbols::default();

    for caps in PRELUDE_RE.captures_iter(&stripped) {
        let prelude = caps[1].rsplit(';').next().unwrap_or_default().trim();
        if prelude.is_empty() || prelude.starts_with('@') {
            continue;
        }

        for selector in prelude.split(',') {
            let names: Vec<&str> = SYMBOL_RE
                .captures_iter(selector)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();

            if names.iter().any(|n| safelist.is_greedy(n)) {
                symbols
                    .greedy_protected
                    .extend(names.iter().map(|n| n.to_string()));
            }
            symbols.all.extend(names.into_iter().map(String::from));
        }
    }

    symbols
}

/// Keyframe names mapped to how many `@keyframes` blocks declare them.
fn keyframe_declarations(css: &str) -> HashMap<String, usize> {
    let mut decls = HashMap::new();
    for caps in KEYFRAMES_RE.captures_iter(css) {
        *decls.entry(caps[1].to_string()).or_insert(0) += 1;
    }
    decls
}

/// Occurrences of `ident` not embedded in a longer identifier.
fn count_identifier(css: &str, ident: &str) -> usize {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    css.match_indices(ident)
        .filter(|(idx, _)| {
            let before = css[..*idx].chars().next_back();
            let after = css[idx + ident.len()..].chars().next();
            !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
        })
        .count()
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

/// Remove rules whose selectors only reference names absent from `corpus`.
///
/// The result is printed unminified; run [`crate::minify`] afterwards.
#[instrument(skip_all, fields(bytes = css.len(), corpus_tokens = corpus.token_count()))]
pub fn purge(css: &str, corpus: &CorpusIndex, safelist: &CompiledSafelist) -> Result<String> {
    let symbols = selector_symbols(css, safelist);
    // a name shared with @keyframes is left to the keyframes pass
    let keyframes = keyframe_declarations(css);

    let unused: HashSet<String> = symbols
        .all
        .iter()
        .filter(|name| {
            !corpus.contains(name)
                && !safelist.keeps(name)
                && !symbols.greedy_protected.contains(*name)
                && !keyframes.contains_key(*name)
        })
        .cloned()
        .collect();

    debug!(
        candidates = symbols.all.len(),
        unused = unused.len(),
        "selector symbols classified"
    );

    let purged = transform(css, unused, false)?;
    remove_orphan_keyframes(purged, safelist)
}

/// Drop `@keyframes` whose name no remaining rule refers to.
fn remove_orphan_keyframes(css: String, safelist: &CompiledSafelist) -> Result<String> {
    let live = selector_symbols(&css, safelist).all;

    let orphans: HashSet<String> = keyframe_declarations(&css)
        .into_iter()
        .filter(|(name, decls)| {
            !live.contains(name) && !safelist.keeps(name) && count_identifier(&css, name) <= *decls
        })
        .map(|(name, _)| name)
        .collect();

    if orphans.is_empty() {
        return Ok(css);
    }

    debug!(count = orphans.len(), "removing unreferenced keyframes");
    transform(&css, orphans, false)
}
