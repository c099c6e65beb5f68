//! Documentation payload validation
//!
//! Normalize first, then check structure. Validation never touches the
//! filesystem; a passing payload becomes a [`DocumentationRecord`], the only
//! thing the output writer accepts.
//!
//! [`DocumentationRecord`]: crate::types::DocumentationRecord

mod response;
mod sanitize;

pub use response::{ResponseValidator, has_top_level_heading};
pub use sanitize::sanitize;
