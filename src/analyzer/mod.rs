//! Code Analyzer Module
//!
//! - Multi-language parsing into the symbol model
//! - File scanning with gitignore support

pub mod parser;
pub mod scanner;
