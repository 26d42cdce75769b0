//! Retry policy for transient listing failures.
//!
//! Only reads are ever retried. Undeploy and delete calls are issued once.

use std::thread;
use std::time::Duration;

/// Exponential backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied per further attempt.
    pub backoff_factor: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(30),
        }
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Delay after the given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T, E, F, P>(&self, mut operation: F, is_transient: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(e) if !is_transient(&e) || attempt + 1 >= self.max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    log::warn!(
                        "Attempt {}/{} failed: {}. Retrying in {}ms",
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay.as_millis()
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
