use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RetryConfig;

/// Exponential-backoff retry. Applied around whole-document graph assembly:
/// the assembler itself never retries, so a transient completion failure
/// retries the full document rather than persisting a partial graph.
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    pub async fn run<F, Fut, T, E>(&self, operation_name: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "operation failed after max retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "operation failed, retrying"
                    );

                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}
