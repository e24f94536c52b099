//! Fixed-delay retry loop for operations against eventually-consistent backends.
//!
//! The loop is cancellable through a [`CancellationToken`] and optionally bounded by
//! an overall deadline. The last error is kept as a typed value so callers can classify
//! the failure without parsing text.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use orgstore_core::RetrySettings;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::traits::StorageError;

/// Retry budget for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of attempts; zero is treated as one.
    pub max_retries: u32,
    /// Wait between two attempts.
    pub delay: Duration,
    /// Overall bound including the waits.
    pub deadline: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            delay: settings.delay,
            deadline: settings.deadline,
        }
    }
}

/// Why a retried operation stopped without success.
#[derive(Debug)]
pub enum RetryError<E> {
    Exhausted { attempts: u32, last_error: E },
    DeadlineExceeded { attempts: u32, last_error: Option<E> },
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::DeadlineExceeded { attempts, .. }
            | RetryError::Cancelled { attempts } => *attempts,
        }
    }
}

impl RetryError<StorageError> {
    pub fn into_storage_error(self, operation: &str) -> StorageError {
        match self {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => StorageError::RetryExhausted {
                operation: operation.to_string(),
                attempts,
                last_error: Box::new(last_error),
            },
            RetryError::DeadlineExceeded {
                attempts,
                last_error,
            } => StorageError::DeadlineExceeded {
                operation: operation.to_string(),
                attempts,
                last_error: last_error.map(Box::new),
            },
            RetryError::Cancelled { attempts } => StorageError::Cancelled {
                operation: operation.to_string(),
                attempts,
            },
        }
    }
}

/// Runs an operation until it succeeds or the [`RetryPolicy`] is used up.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation`, passing it the 1-based attempt number.
    ///
    /// Sleeps only between attempts. A cancellation observed while waiting stops the
    /// loop without another attempt.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.policy.attempts();
        let deadline = self.policy.deadline.map(|d| Instant::now() + d);
        let mut last_error: Option<E> = None;

        for attempt in 1..=max_attempts {
            let outcome = match deadline {
                Some(at) => match tokio::time::timeout_at(at, f(attempt)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(
                            operation = %operation,
                            attempt = attempt,
                            "Retry deadline reached during attempt"
                        );
                        return Err(RetryError::DeadlineExceeded {
                            attempts: attempt,
                            last_error,
                        });
                    }
                },
                None => f(attempt).await,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = %operation,
                            attempt = attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            tracing::warn!(
                operation = %operation,
                attempt = attempt,
                max_attempts = max_attempts,
                error = %err,
                "Attempt failed"
            );

            if attempt == max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_error: err,
                });
            }
            last_error = Some(err);

            let wake_at = Instant::now() + self.policy.delay;
            if let Some(at) = deadline {
                if wake_at > at {
                    return Err(RetryError::DeadlineExceeded {
                        attempts: attempt,
                        last_error,
                    });
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!(operation = %operation, attempt = attempt, "Retry cancelled");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }

        // max_attempts >= 1, so the loop always returns
        Err(RetryError::Cancelled { attempts: 0 })
    }
}
