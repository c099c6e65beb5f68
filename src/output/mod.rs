//! Output Module
//!
//! - `writer`: atomic, digest-checked persistence of validated records
//! - `render`: per-format page layout and index rendering
//! - `index`: batch index page
//! - `relations`: class relationship section appended to saved pages

pub mod index;
pub mod relations;
pub mod render;
pub mod writer;

pub use index::IndexGenerator;
pub use render::{IndexEntry, MarkdownRenderer, Renderer, SphinxRenderer, renderer_for};
pub use writer::{OutputWriter, WriteOutcome, WriteResult};
