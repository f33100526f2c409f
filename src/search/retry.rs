//! Fixed-delay retry for transient provider failures

use crate::config::OrchestratorSettings;
use crate::error::{InsightError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry policy applied to each provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Pause before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_settings(settings: &OrchestratorSettings) -> Self {
        Self::new(settings.max_retries, settings.retry_delay())
    }

    /// Run `attempt` until it succeeds, fails permanently, or retries run out.
    ///
    /// Only transient errors are retried. Once `cancel` fires, every outcome
    /// becomes `Cancelled` and no further attempt is started, including
    /// while waiting out the delay.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt_no = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(InsightError::Cancelled);
            }

            let err = match attempt(attempt_no).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if cancel.is_cancelled() || matches!(err, InsightError::Cancelled) {
                return Err(InsightError::Cancelled);
            }
            if !err.is_transient() || attempt_no >= self.max_retries {
                debug!("{} failed after {} attempt(s): {}", operation, attempt_no + 1, err);
                return Err(err);
            }

            warn!(
                "{} attempt {} failed, retrying in {:?}: {}",
                operation,
                attempt_no + 1,
                self.delay,
                err
            );
            attempt_no += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InsightError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> InsightError {
        InsightError::ProviderTransient {
            provider: "p".to_string(),
            status: Some(503),
            message: "down".to_string(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(1, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("op", &CancellationToken::new(), move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recovers_on_second_attempt() {
        let result = policy()
            .run("op", &CancellationToken::new(), |attempt| async move {
                if attempt == 0 {
                    Err(transient())
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("op", &CancellationToken::new(), move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(InsightError::ProviderAuth {
                    provider: "p".to_string(),
                    status: 401,
                })
            })
            .await;

        assert!(matches!(result, Err(InsightError::ProviderAuth { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_delay_stops_retry() {
        let cancel = CancellationToken::new();
        let calls = &AtomicU32::new(0);
        let slow = RetryPolicy::new(1, Duration::from_secs(30));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result: Result<()> = slow
            .run("op", &cancel, move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(matches!(result, Err(InsightError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_never_attempts() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = &AtomicU32::new(0);

        let result: Result<()> = policy()
            .run("op", &cancel, move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(InsightError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
