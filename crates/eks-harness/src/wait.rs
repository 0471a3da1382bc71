//! Bounded polling with a fixed delay and cancellation support.
//!
//! A phase polls a single-shot check up to `max_attempts` times, sleeping
//! `delay` between attempts, and stops on the first positive answer. Errors
//! from the check are treated the same as "not ready yet": they are logged,
//! recorded as the last observation, and retried until the budget runs out.
//! Worst-case wall-clock per phase is `(max_attempts - 1) * delay` plus the
//! time spent in the checks themselves.

use backon::{BackoffBuilder, ConstantBuilder};
use eks_harness_common::defaults::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Poll schedule for one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between consecutive attempts
    pub delay: Duration,
    /// Maximum number of checks before giving up
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping in this phase
    pub fn worst_case_wait(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Answer from a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    /// Terminal positive condition reached
    Ready(T),
    /// Not there yet; the string describes what was observed
    NotReady(String),
}

/// What the last attempt saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    /// Time since polling started
    pub elapsed: Duration,
    /// Observed state, or the error the check returned
    pub observation: String,
}

/// Why polling stopped without reaching the positive condition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Attempt budget exhausted
    #[error("timed out waiting for {what} after {attempts} attempts ({detail})", detail = describe_last(.last))]
    Timeout {
        what: String,
        attempts: u32,
        last: Option<PollAttempt>,
    },

    /// Cancellation token fired
    #[error("wait for {what} cancelled after {attempts} attempts")]
    Cancelled { what: String, attempts: u32 },
}

fn describe_last(last: &Option<PollAttempt>) -> String {
    match last {
        Some(a) => format!("last: {} at {:?}", a.observation, a.elapsed),
        None => "no attempts made".to_string(),
    }
}

/// Poll `check` until it reports [`Readiness::Ready`].
///
/// # Arguments
/// * `config` - Delay and attempt budget
/// * `cancel` - Optional cancellation token, honoured during each check and while sleeping
/// * `check` - Single-shot check against the provider
/// * `what` - Name for logging and errors
///
/// # Example
/// ```ignore
/// let status = poll_until_ready(
///     &PollConfig::default(),
///     Some(&cancel),
///     || async move {
///         let status = provider.describe("my-cluster").await?;
///         Ok(if status.is_active() {
///             Readiness::Ready(status)
///         } else {
///             Readiness::NotReady(format!("cluster status is {status}"))
///         })
///     },
///     "cluster my-cluster",
/// )
/// .await?;
/// ```
pub async fn poll_until_ready<T, F, Fut>(
    config: &PollConfig,
    cancel: Option<&CancellationToken>,
    mut check: F,
    what: &str,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Readiness<T>>>,
{
    let start = Instant::now();
    let mut delays = ConstantBuilder::default()
        .with_delay(config.delay)
        .with_max_times(config.max_attempts.saturating_sub(1) as usize)
        .build();
    let mut last: Option<PollAttempt> = None;

    for attempt in 1..=config.max_attempts {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(PollError::Cancelled {
                what: what.to_string(),
                attempts: attempt - 1,
            });
        }

        let outcome = tokio::select! {
            outcome = check() => outcome,
            _ = cancelled(cancel) => {
                return Err(PollError::Cancelled {
                    what: what.to_string(),
                    attempts: attempt - 1,
                });
            }
        };
        let observation = match outcome {
            Ok(Readiness::Ready(value)) => {
                debug!(resource = %what, attempt, "Ready");
                return Ok(value);
            }
            Ok(Readiness::NotReady(observation)) => observation,
            Err(e) => {
                warn!(resource = %what, attempt, error = %e, "Check failed, treating as not ready");
                format!("error: {e:#}")
            }
        };
        last = Some(PollAttempt {
            attempt,
            elapsed: start.elapsed(),
            observation,
        });

        let Some(delay) = delays.next() else {
            break;
        };
        debug!(
            resource = %what,
            attempt,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis(),
            "Not ready, retrying"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancelled(cancel) => {
                return Err(PollError::Cancelled {
                    what: what.to_string(),
                    attempts: attempt,
                });
            }
        }
    }

    Err(PollError::Timeout {
        what: what.to_string(),
        attempts: last.as_ref().map_or(0, |a| a.attempt),
        last,
    })
}

/// Resolves when `cancel` fires; never without a token
async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> PollConfig {
        PollConfig::new(Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn test_ready_on_nth_attempt() {
        let calls = &AtomicU32::new(0);
        let result = poll_until_ready(
            &fast(5),
            None,
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n == 3 {
                    Readiness::Ready(n)
                } else {
                    Readiness::NotReady(format!("attempt {n}"))
                })
            },
            "thing",
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_ready_on_last_attempt() {
        let calls = &AtomicU32::new(0);
        let result = poll_until_ready(
            &fast(4),
            None,
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n == 4 {
                    Readiness::Ready(())
                } else {
                    Readiness::NotReady("no".to_string())
                })
            },
            "thing",
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_timeout_after_budget() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = poll_until_ready(
            &fast(3),
            None,
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Readiness::NotReady(format!("status CREATING ({n})")))
            },
            "cluster c1",
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(PollError::Timeout {
                what,
                attempts,
                last: Some(last),
            }) => {
                assert_eq!(what, "cluster c1");
                assert_eq!(attempts, 3);
                assert_eq!(last.attempt, 3);
                assert_eq!(last.observation, "status CREATING (3)");
            }
            other => panic!("Expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_errors_are_retried() {
        let calls = &AtomicU32::new(0);
        let result = poll_until_ready(
            &fast(5),
            None,
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    anyhow::bail!("connection reset");
                }
                Ok(Readiness::Ready("up"))
            },
            "thing",
        )
        .await;

        assert_eq!(result, Ok("up"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_recorded_as_last_observation() {
        let result: Result<(), _> = poll_until_ready(
            &fast(2),
            None,
            || async { anyhow::bail!("throttled") },
            "thing",
        )
        .await;

        match result {
            Err(PollError::Timeout { last: Some(last), .. }) => {
                assert!(last.observation.contains("throttled"));
            }
            other => panic!("Expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_times_out_without_checking() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = poll_until_ready(
            &fast(0),
            None,
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Readiness::Ready(()))
            },
            "thing",
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            result,
            Err(PollError::Timeout { attempts: 0, last: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<(), _> = poll_until_ready(
            &fast(5),
            Some(&token),
            || async { Ok(Readiness::Ready(())) },
            "thing",
        )
        .await;

        assert!(matches!(result, Err(PollError::Cancelled { attempts: 0, .. })));
    }

    #[tokio::test]
    async fn test_cancelled_while_sleeping() {
        let token = CancellationToken::new();
        let config = PollConfig::new(Duration::from_secs(3600), 5);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result: Result<(), _> = poll_until_ready(
            &config,
            Some(&token),
            || async { Ok(Readiness::NotReady("waiting".to_string())) },
            "thing",
        )
        .await;

        assert!(matches!(result, Err(PollError::Cancelled { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_cancelled_during_hung_check() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let result: Result<(), _> = poll_until_ready(
            &fast(5),
            Some(&token),
            || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Readiness::Ready(()))
            },
            "thing",
        )
        .await;

        assert!(matches!(result, Err(PollError::Cancelled { attempts: 0, .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_worst_case_wait() {
        let config = PollConfig::new(Duration::from_secs(30), 20);
        assert_eq!(config.worst_case_wait(), Duration::from_secs(570));
        assert_eq!(PollConfig::new(Duration::from_secs(30), 0).worst_case_wait(), Duration::ZERO);
    }

    #[test]
    fn test_timeout_display() {
        let err = PollError::Timeout {
            what: "nodes".to_string(),
            attempts: 2,
            last: None,
        };
        assert_eq!(
            err.to_string(),
            "timed out waiting for nodes after 2 attempts (no attempts made)"
        );
    }
}
