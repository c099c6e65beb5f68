pub mod config;
pub mod generate;
pub mod symbols;

pub use generate::GenerateOptions;
