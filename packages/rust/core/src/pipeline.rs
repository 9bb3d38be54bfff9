//! End-to-end build pipeline: build tree → prefix → corpus → bundles → write → cleanup.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use vendorcss_discovery::{benchmark, corpus_files, detect_base_prefix};
use vendorcss_optimize::CorpusIndex;
use vendorcss_shared::{BuildResult, ContentCorpus, Manifest, Result, VendorCssError, WrittenFile};
use vendorcss_sources::{AcquireOptions, SourceAcquirer};

use crate::assembler;
use crate::cleanup;
use crate::writer::OutputWriter;

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The generated site (read for prefix and corpus, written for output).
    pub build_dir: PathBuf,
    /// Directory local source paths are relative to.
    pub source_root: PathBuf,
    /// Bundle declarations and run options.
    pub manifest: Manifest,
    /// Optional benchmark descriptor restricting the purge corpus.
    pub benchmark: Option<PathBuf>,
    /// Run every stage but write and delete nothing.
    pub dry_run: bool,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each source of a bundle is loaded.
    fn source_acquired(&self, identifier: &str, current: usize, total: usize);
    /// Called after each output file is written.
    fn bundle_written(&self, file: &WrittenFile);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_acquired(&self, _identifier: &str, _current: usize, _total: usize) {}
    fn bundle_written(&self, _file: &WrittenFile) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full pipeline.
///
/// 1. Validate the build directory and load the benchmark descriptor
/// 2. Detect the deployment prefix
/// 3. Select and index the purge corpus
/// 4. Assemble, purge and minify every bundle
/// 5. Write bundles, then re-optimize the main stylesheet in place
/// 6. Remove superseded originals
///
/// Every fallible stage before step 5 completes for all bundles before the
/// first byte is written.
#[instrument(skip_all, fields(build_dir = %config.build_dir.display(), dry_run = config.dry_run))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();
    let manifest = &config.manifest;
    let build_dir = config.build_dir.as_path();

    info!(bundles = manifest.bundles.len(), "starting build pipeline");

    // --- Stage 1: Inputs ---
    progress.phase("Checking build directory");
    manifest.validate()?;
    ensure_build_dir(build_dir).await?;

    let descriptor = match &config.benchmark {
        Some(path) => Some(benchmark::load_descriptor(path).await?),
        None => None,
    };

    // --- Stage 2: Prefix ---
    progress.phase("Detecting base prefix");
    let base_prefix = detect_base_prefix(build_dir, &manifest.prefix_marker).await?;

    // --- Stage 3: Corpus ---
    progress.phase("Indexing content corpus");
    let mut unresolved = Vec::new();
    let run_corpus = match &descriptor {
        Some(desc) => {
            let resolution = benchmark::resolve(desc, build_dir, &base_prefix).await?;
            for url in &resolution.unresolved {
                warn!(%url, "benchmark URL did not resolve to a generated page");
            }
            unresolved = resolution.unresolved;
            ContentCorpus::Files(resolution.files)
        }
        None => ContentCorpus::FullTree,
    };

    let bundles = manifest.bundles(&run_corpus)?;
    let main_path = manifest
        .main_stylesheet
        .as_ref()
        .map(|main| build_dir.join(&main.path));
    let main_exists = match &main_path {
        Some(path) => is_file(path).await,
        None => false,
    };

    let needs_index =
        main_exists || bundles.iter().any(|b| b.corpus != ContentCorpus::Empty);
    let index = if needs_index {
        Some(build_index(&run_corpus, build_dir, &manifest.corpus_extensions).await?)
    } else {
        None
    };

    // --- Stage 4: Bundles ---
    let mut acquirer = SourceAcquirer::new(&AcquireOptions {
        source_root: config.source_root.clone(),
        fetch_timeout: manifest.fetch_timeout_secs.map(Duration::from_secs),
    })?;

    let mut outputs = Vec::with_capacity(bundles.len());
    for bundle in &bundles {
        progress.phase(&format!("Assembling {}", bundle.name));
        let corpus = match bundle.corpus {
            ContentCorpus::Empty => None,
            _ => index.as_ref(),
        };
        let css =
            assembler::assemble_bundle(bundle, &mut acquirer, &base_prefix, corpus, progress)
                .await?;
        outputs.push((build_dir.join(&manifest.css_dir).join(&bundle.output), css));
    }
    debug!(sources = acquirer.loaded(), "all bundles assembled");

    // --- Stage 5: Write ---
    progress.phase("Writing stylesheets");
    let writer = OutputWriter::new(config.dry_run);
    let mut written_files = Vec::with_capacity(outputs.len() + 1);
    for (path, css) in &outputs {
        let file = writer.write(path, css).await?;
        progress.bundle_written(&file);
        written_files.push(file);
    }

    if let (Some(main), Some(path)) = (&manifest.main_stylesheet, main_path.filter(|_| main_exists)) {
        progress.phase("Optimizing main stylesheet");
        let original = tokio::fs::read(&path)
            .await
            .map_err(|e| VendorCssError::io(&path, e))?;
        let css = assembler::optimize(&String::from_utf8_lossy(&original), index.as_ref(), &main.safelist)?;
        let file = writer.write(&path, &css).await?;
        progress.bundle_written(&file);
        written_files.push(file);
    }

    // --- Stage 6: Cleanup ---
    let removed_files = if manifest.remove_originals {
        progress.phase("Removing superseded originals");
        let outputs: Vec<PathBuf> = written_files.iter().map(|f| f.path.clone()).collect();
        let targets = cleanup::exclude_outputs(
            cleanup::cleanup_targets(manifest, &bundles),
            build_dir,
            &outputs,
        );
        cleanup::remove_originals(build_dir, &targets, config.dry_run).await
    } else {
        Vec::new()
    };

    let result = BuildResult {
        written_files,
        unresolved_benchmark_urls: unresolved,
        removed_files,
        base_prefix,
    };

    progress.done(&result);

    info!(
        written = result.written_files.len(),
        removed = result.removed_files.len(),
        unresolved = result.unresolved_benchmark_urls.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "build pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_build_dir(build_dir: &Path) -> Result<()> {
    match tokio::fs::metadata(build_dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(VendorCssError::config(format!(
            "build directory does not exist: {}",
            build_dir.display()
        ))),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

/// Index the run-wide corpus: benchmark pages, or the whole build tree.
async fn build_index(
    corpus: &ContentCorpus,
    build_dir: &Path,
    extensions: &[String],
) -> Result<CorpusIndex> {
    let files = match corpus {
        ContentCorpus::Files(files) => files.clone(),
        ContentCorpus::FullTree => corpus_files(build_dir, extensions).await?,
        ContentCorpus::Empty => Vec::new(),
    };
    info!(files = files.len(), "indexing corpus");
    CorpusIndex::build(&files).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
