// Aggregate upsert writer: commits a batch of recomputed rows and cleared keys,
// retrying with exponential backoff until it lands or the attempt budget runs
// out.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::EngineError;
use crate::window::AverageBatch;

/// Anything that can atomically apply a batch: write-or-replace its rows and
/// delete its cleared keys.
pub trait AverageSink: Send + Sync {
    fn write_averages(&self, batch: &AverageBatch) -> anyhow::Result<()>;
}

impl AverageSink for Database {
    fn write_averages(&self, batch: &AverageBatch) -> anyhow::Result<()> {
        self.apply_averages(batch)
    }
}

/// Backoff policy for failed commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `delay`, capped at `max_delay_ms`.
    fn next_delay(&self, delay: Duration) -> Duration {
        let next_ms = (delay.as_millis() as f64 * self.backoff_multiplier)
            .min(self.max_delay_ms as f64);
        Duration::from_millis(next_ms.max(0.0) as u64)
    }
}

pub struct UpsertWriter {
    sink: Arc<dyn AverageSink>,
    policy: RetryPolicy,
}

impl UpsertWriter {
    pub fn new(sink: Arc<dyn AverageSink>, policy: RetryPolicy) -> Self {
        Self { sink, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Commit `batch` in one transaction. Returns the number of rows
    /// written, or `WriteFailure` once every attempt has failed. The caller
    /// must not acknowledge the triggering event until this returns `Ok`.
    pub async fn upsert(&self, batch: &AverageBatch) -> Result<usize, EngineError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let attempts = self.policy.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.policy.initial_delay_ms);

        for attempt in 1..=attempts {
            match self.sink.write_averages(batch) {
                Ok(()) => {
                    debug!(
                        "committed {} average rows ({} cleared) on attempt {}",
                        batch.rows.len(),
                        batch.cleared.len(),
                        attempt
                    );
                    return Ok(batch.rows.len());
                }
                Err(e) if attempt == attempts => {
                    return Err(EngineError::WriteFailure {
                        attempts,
                        message: format!("{e:#}"),
                    });
                }
                Err(e) => {
                    warn!(
                        "average write attempt {}/{} failed: {:#}, retrying in {:?}",
                        attempt, attempts, e, delay
                    );
                    sleep(delay).await;
                    delay = self.policy.next_delay(delay);
                }
            }
        }

        Err(EngineError::WriteFailure {
            attempts,
            message: "no attempts made".to_string(),
        })
    }
}
