//! Exponential backoff for fallible async operations.

use std::future::Future;
use std::iter;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy: how many times to retry and how long to wait between tries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Cap for any single wait
    pub max_delay: Duration,
    /// Growth factor applied after each wait
    pub multiplier: u32,
    /// Shorten each wait to a random 50-100% of its value
    pub jitter: bool,
}

impl RetryConfig {
    /// 3 retries starting at 100ms, doubling up to 5s, with jitter.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Un-jittered waits, one per allowed retry.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        iter::successors(Some(self.initial_delay.min(self.max_delay)), move |delay| {
            Some(delay.saturating_mul(self.multiplier).min(self.max_delay))
        })
        .take(self.max_retries as usize)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
            jitter: true,
        }
    }
}

/// Run `operation` until it succeeds or the policy runs out of retries.
///
/// Every error is retried. Use [`retry_with_backoff_if`] when some errors
/// are permanent.
///
/// ```ignore
/// use database::common::{RetryConfig, retry_with_backoff};
///
/// let policy = RetryConfig::new().with_max_retries(5);
/// let client = retry_with_backoff(|| connect_from_config(&mongo), policy).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff_if(operation, config, |_| true).await
}

/// Like [`retry_with_backoff`], but an error rejected by `should_retry` is
/// returned at once. Otherwise the last error is returned when the schedule
/// is exhausted.
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    mut operation: F,
    config: RetryConfig,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut waits = config.schedule();
    let mut retries = 0u32;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!(retries, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !should_retry(&error) {
            debug!(error = %error, "Operation failed with a permanent error");
            return Err(error);
        }

        let Some(wait) = waits.next() else {
            warn!(attempts = retries + 1, error = %error, "Operation failed, giving up");
            return Err(error);
        };
        retries += 1;

        let wait = if config.jitter { jittered(wait) } else { wait };
        debug!(
            retry = retries,
            max_retries = config.max_retries,
            wait_ms = wait.as_millis() as u64,
            error = %error,
            "Operation failed, retrying"
        );
        tokio::time::sleep(wait).await;
    }
}

fn jittered(wait: Duration) -> Duration {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let percent = 50 + RandomState::new().hash_one(std::time::SystemTime::now()) % 51;
    wait.mul_f64(percent as f64 / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    type Attempt = std::pin::Pin<Box<dyn Future<Output = Result<&'static str, String>> + Send>>;

    /// Operation that fails until its `succeed_on`-th call.
    fn flaky(calls: &Arc<AtomicU32>, succeed_on: u32) -> impl FnMut() -> Attempt {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call >= succeed_on {
                    Ok("stored")
                } else {
                    Err(format!("call {call} failed"))
                }
            })
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig::new()
            .with_initial_delay(Duration::from_millis(10))
            .without_jitter()
    }

    #[tokio::test]
    async fn test_first_success_is_returned() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(flaky(&calls, 1), RetryConfig::default()).await;

        assert_eq!(result.unwrap(), "stored");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(flaky(&calls, 3), fast()).await;

        assert_eq!(result.unwrap(), "stored");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_with_last_error() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(flaky(&calls, u32::MAX), fast().with_max_retries(2)).await;

        assert_eq!(result.unwrap_err(), "call 3 failed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let policy = fast().with_max_retries(5);
        let should_retry = |e: &String| !e.contains('1');
        let result = retry_with_backoff_if(flaky(&calls, u32::MAX), policy, should_retry).await;

        assert_eq!(result.unwrap_err(), "call 1 failed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_follow_schedule() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let policy = RetryConfig::new()
            .with_initial_delay(Duration::from_millis(50))
            .without_jitter();
        let _ = retry_with_backoff(flaky(&calls, u32::MAX), policy).await;

        // 50 + 100 + 200
        assert!(start.elapsed() >= Duration::from_millis(350));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_schedule_grows_and_caps() {
        let policy = RetryConfig::new()
            .with_max_retries(5)
            .with_initial_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(1))
            .with_multiplier(3);

        let waits: Vec<u64> = policy.schedule().map(|d| d.as_millis() as u64).collect();
        assert_eq!(waits, vec![200, 600, 1000, 1000, 1000]);
    }

    #[test]
    fn test_zero_retries_has_empty_schedule() {
        assert_eq!(RetryConfig::new().with_max_retries(0).schedule().count(), 0);
    }

    #[test]
    fn test_jitter_stays_within_half_and_full() {
        for _ in 0..10 {
            let wait = jittered(Duration::from_millis(1000));
            assert!(wait >= Duration::from_millis(500));
            assert!(wait <= Duration::from_millis(1000));
        }
    }
}
