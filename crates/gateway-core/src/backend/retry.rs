//! Exponential-backoff retry for transient backend failures.

use super::errors::BackendError;
use crate::config::RetryConfig;
use std::{future::Future, time::Duration};

/// Bounded retry with exponential backoff.
///
/// Only transient failures are retried; anything else is returned to
/// the caller immediately. Business errors arrive as HTTP 200 and never
/// enter this layer, so they are structurally exempt from retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    factor: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            factor: config.backoff_factor,
        }
    }

    /// Backoff before the given retry attempt (1-based, counting
    /// retries rather than calls).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let scaled =
            self.initial_backoff.as_millis() as f64 * self.factor.powi(retry.saturating_sub(1) as i32);
        Duration::from_millis(scaled as u64).min(self.max_backoff)
    }

    /// Runs `call` up to `max_attempts` times.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted or the error
    /// is not transient.
    pub async fn run<T, F, Fut>(&self, route: &str, mut call: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        route,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
