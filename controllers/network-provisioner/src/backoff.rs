//! # Fibonacci Backoff
//!
//! Progressive backoff for retrying idempotent backend reads. Grows more
//! slowly than exponential backoff: base, base, 2x, 3x, 5x, 8x, ... capped.
//!
//! Only idempotent reads go through `retry_read`; creates are never retried.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff
    ///
    /// # Arguments
    ///
    /// * `min` - First (and second) backoff duration
    /// * `max` - Cap for the sequence
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);
        result
    }

    /// Reset the backoff to the initial state
    #[allow(dead_code)] // Retry loops build a fresh backoff per call
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

/// Run an idempotent read, retrying failures up to `attempts` times in total
///
/// `attempts` of 0 or 1 means a single try.
pub async fn retry_read<T, E, F, Fut>(
    what: &str,
    attempts: u32,
    mut backoff: FibonacciBackoff,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let delay = backoff.next_backoff();
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what, attempt, attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
