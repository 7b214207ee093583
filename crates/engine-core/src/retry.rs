use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
        }
    }

    /// Preset for pool connectivity checks: 3 attempts, 1s base, 10s cap.
    pub fn for_connection() -> Self {
        Self::default()
    }

    /// Runs `op` until it succeeds or `max_attempts` is reached. The last
    /// error is returned as-is; `label` only tags the log lines.
    pub async fn run<F, Fut, T, E>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        error!("{label} failed after {attempt} attempts: {err}");
                        return Err(err);
                    }

                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "{label} attempt {attempt} failed, retrying in {}ms: {err}",
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// `min(base * 2^(attempt-1), max)` for a 1-based attempt number.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::from_millis(0);
        }

        let factor = 1u128 << attempt.saturating_sub(1).min(32);
        let base_ms = self.base_delay.as_millis();
        let delay_ms = base_ms.saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::Instant;
    use tracing_test::traced_test;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::for_connection();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(60), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(5), Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_delay, Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let result: Result<&str, String> = RetryPolicy::for_connection()
            .run("ping", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("connection refused".to_string())
                    } else {
                        Ok("up")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("up"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed().as_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_final_error_is_returned_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<(), String> = RetryPolicy::for_connection()
            .run("source connection", || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(format!("refused #{n}"))
                }
            })
            .await;

        assert_eq!(result, Err("refused #3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(logs_contain("source connection attempt 1 failed, retrying in 1000ms"));
        assert!(logs_contain("source connection attempt 2 failed, retrying in 2000ms"));
        assert!(logs_contain("source connection failed after 3 attempts: refused #3"));
    }
}
