//! Bounded waits for model turns
//!
//! ```ignore
//! use crate::ai::timeout::with_timeout;
//!
//! let response = with_timeout(
//!     Duration::from_secs(300),
//!     turn,
//!     provider.complete(&conversation),
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::constants::llm;
use crate::types::{AutodocError, Result};

/// Timeouts for the operations that wait on something outside the process
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// One model turn (default: 5 minutes)
    pub turn: Duration,
    /// Provider availability probe (default: 10 seconds)
    pub health_check: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            turn: Duration::from_secs(llm::DEFAULT_TURN_TIMEOUT_SECS),
            health_check: Duration::from_secs(10),
        }
    }
}

impl TimeoutConfig {
    pub fn with_turn_secs(secs: u64) -> Self {
        Self {
            turn: Duration::from_secs(secs),
            ..Self::default()
        }
    }
}

/// Execute one model turn with a timeout.
///
/// Expiry yields `AutodocError::ProtocolTimeout` carrying the turn number.
pub async fn with_timeout<T, F>(timeout: Duration, turn: usize, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(AutodocError::ProtocolTimeout {
            turn,
            duration: timeout,
        }),
    }
}
