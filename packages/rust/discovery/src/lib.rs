//! Build-tree discovery: file scanning, deployment prefix detection, and
//! benchmark corpus resolution.
//!
//! Everything here reads the generated site; nothing is written.

pub mod benchmark;
pub mod prefix;
pub mod scanner;

pub use benchmark::{BenchmarkDescriptor, BenchmarkResolution, candidate_paths, load_descriptor};
pub use prefix::{detect_base_prefix, prefix_from_html};
pub use scanner::{corpus_files, has_extension, list_files};
