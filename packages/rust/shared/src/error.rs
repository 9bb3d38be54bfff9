//! Error types for vendorcss.
//!
//! Library crates use [`VendorCssError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum VendorCssError {
    /// Missing build directory, bad manifest, or bad benchmark descriptor.
    #[error("config error: {message}")]
    Config { message: String },

    /// Remote stylesheet unreachable or answered with a non-2xx status.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No benchmark URL resolved to a generated page.
    #[error("benchmark error: {message}")]
    Benchmark { message: String },

    /// The purge or minify stage rejected a stylesheet.
    #[error("css error: {message}")]
    Css { message: String },

    /// Data validation error (malformed URL, invalid manifest entry, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VendorCssError>;

impl VendorCssError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a benchmark error from any displayable message.
    pub fn benchmark(msg: impl Into<String>) -> Self {
        Self::Benchmark {
            message: msg.into(),
        }
    }

    /// Create a CSS processing error from any displayable message.
    pub fn css(msg: impl Into<String>) -> Self {
        Self::Css {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
