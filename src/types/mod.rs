pub mod error;
pub mod record;
pub mod symbol;

pub use error::{
    AutodocError, ErrorCategory, ErrorClassifier, LlmError, Result, ValidationError,
    ValidationErrorKind,
};
pub use record::{DocFormat, DocumentationRecord, ValidationStatus};
pub use symbol::{LineSpan, Parameter, SourceUnit, Symbol, SymbolKind, TypeName, Visibility};
