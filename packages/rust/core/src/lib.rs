//! Core pipeline orchestration for vendorcss.
//!
//! This crate ties together discovery, source acquisition, rebasing, and
//! optimization into the end-to-end build run ([`pipeline::run_pipeline`]).

pub mod assembler;
pub mod cleanup;
pub mod pipeline;
pub mod writer;

pub use pipeline::{PipelineConfig, ProgressReporter, SilentProgress, run_pipeline};
