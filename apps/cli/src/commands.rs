//! CLI definition, tracing setup, and the build command.

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use vendorcss_core::pipeline::{PipelineConfig, ProgressReporter};
use vendorcss_shared::{BuildResult, Manifest, WrittenFile, load_manifest, load_manifest_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// vendorcss: bundle, rebase, purge, and minify vendor stylesheets.
#[derive(Parser, Debug)]
#[command(
    name = "vendorcss",
    version,
    about = "Bundle a static site's vendor stylesheets into purged, minified CSS.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Generated site directory.
    #[arg(default_value = "build")]
    pub build_dir: PathBuf,

    /// JSON benchmark descriptor restricting the purge corpus.
    #[arg(long, env = "VENDORCSS_BENCHMARK")]
    pub benchmark: Option<PathBuf>,

    /// Bundle manifest (defaults to ./vendorcss.toml, then built-in bundles).
    #[arg(long, env = "VENDORCSS_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Directory local source paths are relative to (defaults to the working directory).
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Run every stage but write and delete nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the resolved manifest as TOML and exit.
    #[arg(long)]
    pub print_manifest: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "vendorcss=info",
        1 => "vendorcss=debug",
        _ => "vendorcss=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Run the CLI.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let manifest = resolve_manifest(cli.manifest.as_deref())?;

    if cli.print_manifest {
        print!("{}", toml::to_string_pretty(&manifest)?);
        return Ok(());
    }

    let source_root = match cli.source_root {
        Some(root) => root,
        None => std::env::current_dir().wrap_err("cannot determine working directory")?,
    };

    let config = PipelineConfig {
        build_dir: cli.build_dir,
        source_root,
        manifest,
        benchmark: cli.benchmark,
        dry_run: cli.dry_run,
    };

    info!(
        build_dir = %config.build_dir.display(),
        benchmark = ?config.benchmark,
        dry_run = config.dry_run,
        "building vendor stylesheets"
    );

    let reporter = CliProgress::new();
    let result = vendorcss_core::run_pipeline(&config, &reporter).await?;

    eprintln!("{}", summary_line(&result, config.dry_run));
    if let Some(warning) = unresolved_line(&result) {
        eprintln!("{warning}");
    }

    Ok(())
}

/// `--manifest`, then `./vendorcss.toml`, then the built-in manifest.
fn resolve_manifest(path: Option<&Path>) -> Result<Manifest> {
    let manifest = match path {
        Some(p) => load_manifest_from(p)
            .wrap_err_with(|| format!("failed to load manifest {}", p.display()))?,
        None => load_manifest()?,
    };
    Ok(manifest)
}

fn summary_line(result: &BuildResult, dry_run: bool) -> String {
    let paths = result
        .written_files
        .iter()
        .map(|f| f.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let verb = if dry_run { "would write" } else { "wrote" };
    format!("{verb} {paths}")
}

fn unresolved_line(result: &BuildResult) -> Option<String> {
    if result.unresolved_benchmark_urls.is_empty() {
        return None;
    }
    Some(format!(
        "warning: benchmark URLs without a generated page: {}",
        result.unresolved_benchmark_urls.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_acquired(&self, identifier: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Loading [{current}/{total}] {identifier}"));
    }

    fn bundle_written(&self, file: &WrittenFile) {
        self.spinner.println(format!(
            "  {} ({} bytes)",
            file.path.display(),
            file.size_bytes
        ));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}
