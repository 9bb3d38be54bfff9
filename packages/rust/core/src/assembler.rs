//! Bundle assembler.
//!
//! Turns a [`Bundle`] into its final stylesheet text: acquire each source in
//! declared order, rebase its `url(...)` references, concatenate with a
//! provenance comment per source, then purge and minify.

use tracing::{debug, info, instrument};

use vendorcss_optimize::{CompiledSafelist, CorpusIndex};
use vendorcss_rebase::rebase_css_urls;
use vendorcss_shared::{Bundle, RebaseContext, Result, Safelist, StylesheetSource};
use vendorcss_sources::SourceAcquirer;

use crate::pipeline::ProgressReporter;

/// One source's text after rebasing.
#[derive(Debug, Clone)]
pub struct RebasedSource {
    pub source: StylesheetSource,
    pub css: String,
}

/// Acquire and rebase every source of `bundle`, preserving declared order.
#[instrument(skip_all, fields(bundle = %bundle.name, sources = bundle.sources.len()))]
pub async fn collect_sources(
    bundle: &Bundle,
    acquirer: &mut SourceAcquirer,
    base_prefix: &str,
    progress: &dyn ProgressReporter,
) -> Result<Vec<RebasedSource>> {
    let total = bundle.sources.len();
    let mut rebased = Vec::with_capacity(total);

    for (i, source) in bundle.sources.iter().enumerate() {
        let text = acquirer.acquire(source).await?;
        let ctx = RebaseContext::for_source(source, base_prefix)?;
        progress.source_acquired(source.identifier(), i + 1, total);

        debug!(source = %source, dir = %ctx.source_directory, "rebasing");
        rebased.push(RebasedSource {
            source: source.clone(),
            css: rebase_css_urls(&text, &ctx),
        });
    }

    Ok(rebased)
}

/// Join sources in order, each preceded by `/* <identifier> */`.
pub fn concatenate(sources: &[RebasedSource]) -> String {
    sources
        .iter()
        .map(|s| format!("/* {} */\n{}", s.source.identifier(), s.css))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Purge against `corpus` (when given) and minify.
///
/// `None` means the bundle opted out of purging; it is only minified.
#[instrument(skip_all, fields(bytes = css.len(), purge = corpus.is_some()))]
pub fn optimize(css: &str, corpus: Option<&CorpusIndex>, safelist: &Safelist) -> Result<String> {
    let minified = match corpus {
        Some(index) => {
            let compiled = CompiledSafelist::compile(safelist)?;
            let purged = vendorcss_optimize::purge(css, index, &compiled)?;
            vendorcss_optimize::minify(&purged)?
        }
        None => vendorcss_optimize::minify(css)?,
    };

    info!(input = css.len(), output = minified.len(), "stylesheet optimized");
    Ok(minified)
}

/// Full assembly of one bundle into minified text.
pub async fn assemble_bundle(
    bundle: &Bundle,
    acquirer: &mut SourceAcquirer,
    base_prefix: &str,
    corpus: Option<&CorpusIndex>,
    progress: &dyn ProgressReporter,
) -> Result<String> {
    let sources = collect_sources(bundle, acquirer, base_prefix, progress).await?;
    optimize(&concatenate(&sources), corpus, &bundle.safelist)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use vendorcss_shared::ContentCorpus;
    use vendorcss_sources::AcquireOptions;

    use super::*;
    use crate::pipeline::SilentProgress;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vendorcss-assembler-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn bundle(sources: &[&str], corpus: ContentCorpus) -> Bundle {
        Bundle {
            name: "vendor".into(),
            output: "vendor.css".into(),
            sources: sources.iter().map(StylesheetSource::local).collect(),
            safelist: Safelist::default(),
            corpus,
        }
    }

    fn acquirer(root: &std::path::Path) -> SourceAcquirer {
        SourceAcquirer::new(&AcquireOptions {
            source_root: root.to_path_buf(),
            fetch_timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn concatenate_adds_provenance_in_order() {
        let sources = vec![
            RebasedSource {
                source: StylesheetSource::local("lib/a.css"),
                css: ".a{}".into(),
            },
            RebasedSource {
                source: StylesheetSource::local("lib/b.css"),
                css: ".b{}".into(),
            },
        ];
        assert_eq!(
            concatenate(&sources),
            "/* lib/a.css */\n.a{}\n\n/* lib/b.css */\n.b{}"
        );
    }

    #[tokio::test]
    async fn collect_rebases_each_source_against_its_directory() {
        let tmp = temp_dir();
        std::fs::create_dir_all(tmp.join("vendor/one/css")).unwrap();
        std::fs::create_dir_all(tmp.join("vendor/two")).unwrap();
        std::fs::write(
            tmp.join("vendor/one/css/one.css"),
            ".one{background:url(../img/x.png)}",
        )
        .unwrap();
        std::fs::write(tmp.join("vendor/two/two.css"), ".two{background:url('y.png')}").unwrap();

        let b = bundle(&["vendor/one/css/one.css", "vendor/two/two.css"], ContentCorpus::Empty);
        let mut acq = acquirer(&tmp);
        let out = collect_sources(&b, &mut acq, "/blog", &SilentProgress).await.unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].css, r#".one{background:url("/blog/vendor/one/img/x.png")}"#);
        assert_eq!(out[1].css, ".two{background:url('/blog/vendor/two/y.png')}");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_source_fails_assembly() {
        let tmp = temp_dir();
        let b = bundle(&["nope.css"], ContentCorpus::Empty);
        let mut acq = acquirer(&tmp);

        let err = assemble_bundle(&b, &mut acq, "", None, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, vendorcss_shared::VendorCssError::Io { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optimize_without_corpus_keeps_every_rule() {
        let css = "/* lib */\n.unused { color: red; }\n.other { color: blue; }\n";
        let out = optimize(css, None, &Safelist::default()).unwrap();
        assert!(out.contains(".unused"));
        assert!(out.contains(".other"));
        assert!(!out.contains("lib"));
    }

    #[test]
    fn optimize_with_corpus_purges_then_minifies() {
        let css = ".used { color: red; }\n.unused { color: blue; }\n";
        let corpus = CorpusIndex::from_texts([r#"<p class="used">"#]);
        let out = optimize(css, Some(&corpus), &Safelist::default()).unwrap();
        assert_eq!(out, ".used{color:red}");
    }
}
