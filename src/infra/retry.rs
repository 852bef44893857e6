//! Bounded retry with exponential backoff for outbound notification calls

use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0) applied symmetrically around the computed delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::notification()
    }
}

impl RetryConfig {
    /// Email endpoints: a few quick retries, since the admin is waiting on the response
    pub fn notification() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: 0.3,
        }
    }

    /// No waiting between attempts
    pub fn immediate() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.jitter > 0.0 && capped > 0.0 {
            let spread = capped * self.jitter;
            let offset = rand::thread_rng().gen_range(-spread..=spread);
            (capped + offset).clamp(0.0, self.max_delay.as_secs_f64())
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }
}

/// Result of a retried operation
#[derive(Debug)]
pub struct RetryResult<T, E> {
    pub result: Result<T, E>,
    /// Attempts made (1 = first try)
    pub attempts: u32,
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects the error, or
/// the retry budget is spent.
pub async fn retry_with<F, Fut, T, E, P>(
    config: &RetryConfig,
    context: &str,
    operation: F,
    should_retry: P,
) -> RetryResult<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::info!(context, attempts, "Operation succeeded after retries");
                }
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_duration: start.elapsed(),
                };
            }
            Err(e) => {
                if attempts > config.max_retries || !should_retry(&e) {
                    return RetryResult {
                        result: Err(e),
                        attempts,
                        total_duration: start.elapsed(),
                    };
                }

                let delay = config.delay_for_attempt(attempts - 1);
                tracing::debug!(
                    context,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, will retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_calculation_without_jitter() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: 0.0,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(8), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_under_cap() {
        let config = RetryConfig::notification().with_jitter(1.0);
        for attempt in 0..6 {
            assert!(config.delay_for_attempt(attempt) <= config.max_delay);
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let count = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::immediate().with_max_retries(3);

        let counter = count.clone();
        let result = retry_with(
            &config,
            "test",
            || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet")
                    } else {
                        Ok(7)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_stops_on_non_retryable_error() {
        let config = RetryConfig::immediate().with_max_retries(5);

        let result = retry_with(
            &config,
            "test",
            || async { Err::<(), _>("bad request") },
            |e| *e != "bad request",
        )
        .await;

        assert!(!result.is_success());
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let config = RetryConfig::immediate().with_max_retries(2);
        let result = retry_with(&config, "test", || async { Err::<(), _>("down") }, |_| true).await;
        assert_eq!(result.attempts, 3);
    }
}
