//! Documentation Pipeline
//!
//! - `orchestrator`: per-file sequencing, concurrency and unit retries
//! - `retry`: attempt state, backoff and the shared retry budget
//! - `report`: the per-batch outcome report

pub mod orchestrator;
pub mod report;
pub mod retry;

pub use orchestrator::{Orchestrator, PipelineConfig};
pub use report::{BatchReport, UnitOutcome, UnitReport};
pub use retry::{AttemptState, RetryBudget, RetryPolicy};
