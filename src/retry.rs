//! Retry logic with linear backoff
//!
//! Wraps a single network round trip (existence probe or content fetch) with
//! bounded retries, collapsing transient failures into a tri-state
//! [`RequestOutcome`]. Backoff is linear (`base_delay * attempt_number`),
//! with optional jitter to prevent thundering herd.
//!
//! A definitive 404 is a semantically meaningful negative, not a transient
//! failure: it terminates immediately as [`RequestOutcome::Absent`] and is
//! never retried.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Terminal outcome of one retried network operation
#[derive(Debug)]
pub enum RequestOutcome<T> {
    /// The service answered 200; carries the payload
    Success(T),
    /// The service answered 404; the resource definitively does not exist
    Absent,
    /// All attempts exhausted without a definitive answer
    Indeterminate,
}

impl<T> RequestOutcome<T> {
    /// Collapse to the payload, discarding the negative cases
    pub fn into_success(self) -> Option<T> {
        match self {
            RequestOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Discard the payload, keeping only the existence classification
    pub fn to_existence(&self) -> crate::types::ExistenceOutcome {
        match self {
            RequestOutcome::Success(_) => crate::types::ExistenceOutcome::Present,
            RequestOutcome::Absent => crate::types::ExistenceOutcome::Absent,
            RequestOutcome::Indeterminate => crate::types::ExistenceOutcome::Indeterminate,
        }
    }
}

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, connection reset, 5xx) should return
/// `true`. Permanent failures (invalid URL, disk full) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Timeouts and connection-level failures are transient
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Server errors are transient; everything else the service says is final
            Error::UnexpectedStatus(code) => (500..=599).contains(code),
            Error::Config { .. } => false,
            Error::Serialization(_) => false,
            Error::DiscoveryInterrupted => false,
            Error::LandingPage(_) => false,
            Error::Assembly(_) => false,
            Error::ShuttingDown => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute one network operation with bounded retries and linear backoff.
///
/// Each call of `operation` resolves to:
/// - `Ok(Some(T))`: success status (200); terminal, returns the payload
/// - `Ok(None)`: definitive absence (404); terminal, never retried
/// - `Err(e)`: classified by [`IsRetryable`]; transient errors wait
///   `base_delay * attempt_number` and retry, permanent ones terminate
///
/// When all attempts are exhausted without a definitive outcome the result
/// is [`RequestOutcome::Indeterminate`]. Holds no shared state, so it is
/// safe to invoke concurrently from many fetch tasks.
pub async fn request_with_retry<F, Fut, T>(
    config: &RetryConfig,
    mut operation: F,
) -> RequestOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(Some(value)) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Request succeeded after retry");
                }
                return RequestOutcome::Success(value);
            }
            Ok(None) => return RequestOutcome::Absent,
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                let delay = config.base_delay * attempt;
                let delay = if config.jitter { add_jitter(delay) } else { delay };
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts = attempt,
                        "Request failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::warn!(error = %e, "Request failed with non-retryable error");
                }
                return RequestOutcome::Indeterminate;
            }
        }
    }
    RequestOutcome::Indeterminate
}

/// Add random jitter to a delay to prevent thundering herd.
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(10),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn success_on_first_attempt_calls_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = request_with_retry(&quick_config(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(42))
            }
        })
        .await;

        assert_eq!(outcome.into_success(), Some(42));
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn definitive_absence_is_never_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = request_with_retry(&quick_config(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<u32>, Error>(None)
            }
        })
        .await;

        assert!(matches!(outcome, RequestOutcome::Absent));
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "404 is a valid negative, not a transient failure"
        );
    }

    #[tokio::test]
    async fn transient_errors_retry_until_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = request_with_retry(&quick_config(3), || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(Error::UnexpectedStatus(503))
                } else {
                    Ok(Some("payload"))
                }
            }
        })
        .await;

        assert_eq!(outcome.into_success(), Some("payload"));
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "should retry twice before success"
        );
    }

    #[tokio::test]
    async fn permanent_server_error_exhausts_exactly_max_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = request_with_retry(&quick_config(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<Option<u32>, _>(Error::UnexpectedStatus(500))
            }
        })
        .await;

        assert!(matches!(outcome, RequestOutcome::Indeterminate));
        assert_eq!(counter.load(Ordering::SeqCst), 3, "exactly retry-bound attempts");
    }

    #[tokio::test]
    async fn non_retryable_error_fails_on_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = request_with_retry(&quick_config(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<Option<u32>, _>(Error::Assembly("merge failed".to_string()))
            }
        })
        .await;

        assert!(matches!(outcome, RequestOutcome::Indeterminate));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backoff_delays_increase_linearly() {
        let config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            jitter: false,
        };

        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _outcome = request_with_retry(&config, || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<Option<u32>, _>(Error::UnexpectedStatus(502))
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 3, "3 attempts, 2 sleeps between them");

        // Gap 1 is base_delay * 1 = 50ms; gap 2 is base_delay * 2 = 100ms
        let gap1 = ts[1].duration_since(ts[0]);
        let gap2 = ts[2].duration_since(ts[1]);
        assert!(
            gap1 >= Duration::from_millis(40),
            "first delay should be ~50ms, was {gap1:?}"
        );
        assert!(
            gap2 >= Duration::from_millis(80),
            "second delay should be ~100ms, was {gap2:?}"
        );
        assert!(gap2 > gap1, "delays must be strictly increasing");
    }

    #[tokio::test]
    async fn single_attempt_config_never_sleeps() {
        let start = std::time::Instant::now();
        let outcome = request_with_retry(&quick_config(1), || async {
            Err::<Option<u32>, _>(Error::UnexpectedStatus(500))
        })
        .await;

        assert!(matches!(outcome, RequestOutcome::Indeterminate));
        assert!(
            start.elapsed() < Duration::from_millis(50),
            "no backoff sleep with a single attempt"
        );
    }

    #[test]
    fn add_jitter_stays_within_bounds_over_many_iterations() {
        let delay = Duration::from_millis(50);
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay,
                "iteration {i}: jittered {jittered:?} < base delay {delay:?}"
            );
            assert!(
                jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} > 2x base delay"
            );
        }
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(Error::UnexpectedStatus(500).is_retryable());
        assert!(Error::UnexpectedStatus(503).is_retryable());
        assert!(Error::UnexpectedStatus(599).is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!Error::UnexpectedStatus(403).is_retryable());
        assert!(!Error::UnexpectedStatus(301).is_retryable());
    }

    #[test]
    fn io_timeout_is_retryable() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn io_not_found_is_not_retryable() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn domain_errors_are_permanent() {
        assert!(!Error::DiscoveryInterrupted.is_retryable());
        assert!(!Error::LandingPage("bad json".to_string()).is_retryable());
        assert!(!Error::ShuttingDown.is_retryable());
        assert!(
            !Error::config("bad", "key").is_retryable(),
            "config errors require operator action, not retries"
        );
    }

    #[test]
    fn outcome_maps_to_existence() {
        use crate::types::ExistenceOutcome;
        assert_eq!(
            RequestOutcome::Success(()).to_existence(),
            ExistenceOutcome::Present
        );
        assert_eq!(
            RequestOutcome::<()>::Absent.to_existence(),
            ExistenceOutcome::Absent
        );
        assert_eq!(
            RequestOutcome::<()>::Indeterminate.to_existence(),
            ExistenceOutcome::Indeterminate
        );
    }
}
