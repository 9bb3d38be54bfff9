//! CSS optimization: corpus indexing, unused-selector purging, and
//! minification. All rewriting goes through lightningcss.

pub mod corpus;
pub mod minify;
pub mod purge;

pub use corpus::CorpusIndex;
pub use minify::minify;
pub use purge::{CompiledSafelist, purge};
