use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use wair_contracts::ApiError;

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Records requested delays instead of waiting. Acts as a simulated clock.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|delays| delays.clone())
            .unwrap_or_default()
    }

    pub fn elapsed(&self) -> Duration {
        self.delays().into_iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

/// `n` seconds before the `n`th retry.
pub fn linear_backoff(retry_number: usize) -> Duration {
    Duration::from_millis(1000 * retry_number as u64)
}

pub fn retryable_flag(err: &ApiError) -> bool {
    err.retryable
}

/// Sequential retry loop shared by both generative clients.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub backoff: fn(usize) -> Duration,
    pub is_retryable: fn(&ApiError) -> bool,
}

impl RetryPolicy {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            backoff: linear_backoff,
            is_retryable: retryable_flag,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. `op` receives the zero-based attempt index.
    pub fn run<T>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: impl FnMut(usize) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !(self.is_retryable)(&err) || attempt >= self.max_retries {
                        return Err(err);
                    }
                    let delay = (self.backoff)(attempt + 1);
                    tracing::warn!(
                        kind = %err.kind,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient failure: {}",
                        err.message
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wair_contracts::{ApiError, ApiErrorKind};

    use super::*;

    #[test]
    fn succeeds_without_sleeping() {
        let sleeper = RecordingSleeper::new();
        let result = RetryPolicy::new(2).run(&sleeper, |_| Ok::<_, ApiError>(7));
        assert_eq!(result, Ok(7));
        assert!(sleeper.delays().is_empty());
    }

    #[test]
    fn retryable_errors_use_whole_budget_with_linear_backoff() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let result: Result<(), ApiError> = RetryPolicy::new(3).run(&sleeper, |_| {
            calls += 1;
            Err(ApiError::empty_response())
        });
        assert_eq!(result.map_err(|err| err.kind), Err(ApiErrorKind::EmptyResponse));
        assert_eq!(calls, 4);
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(3000)
            ]
        );
    }

    #[test]
    fn non_retryable_error_stops_immediately() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let result: Result<(), ApiError> = RetryPolicy::new(5).run(&sleeper, |_| {
            calls += 1;
            Err(ApiError::rejected("HTTP 400"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert_eq!(sleeper.elapsed(), Duration::ZERO);
    }

    #[test]
    fn custom_predicate_overrides_flag() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy {
            max_retries: 2,
            backoff: |_| Duration::from_millis(5),
            is_retryable: |err| err.kind == ApiErrorKind::ApiError,
        };
        let mut attempts = Vec::new();
        let result = policy.run(&sleeper, |attempt| {
            attempts.push(attempt);
            if attempt < 2 {
                Err(ApiError::rejected("flaky"))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(attempts, vec![0, 1, 2]);
        assert_eq!(sleeper.elapsed(), Duration::from_millis(10));
    }
}
