//! Shared types, error model, and manifest for vendorcss.
//!
//! This crate is the foundation depended on by all other vendorcss crates.
//! It provides:
//! - [`VendorCssError`], the unified error type
//! - Domain types ([`StylesheetSource`], [`RebaseContext`], [`Bundle`], [`BuildResult`])
//! - The bundle manifest ([`Manifest`], manifest loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    BundleConfig, CleanupConfig, CorpusMode, MANIFEST_FILE_NAME, MainStylesheetConfig, Manifest,
    SourceEntry, load_manifest, load_manifest_from, manifest_file_path,
};
pub use error::{Result, VendorCssError};
pub use types::{
    BuildResult, Bundle, ContentCorpus, RebaseContext, RebaseMode, Safelist, SourceKind,
    StylesheetSource, WrittenFile,
};
