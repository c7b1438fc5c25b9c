//! Timeout & retry manager: spec.md §4.4.
//!
//! Retry timing follows the shape of the teacher's downloader retry loop
//! (backoff computed up front, attempt wrapped in a timeout, cancellation
//! checked between attempts) but the per-class policy table, the per-attempt
//! effective timeout and the backoff delay formulas are engine logic, not
//! something `backon`'s builder exposes directly - so they are implemented
//! here and `backon` is reserved for crates that just need a generic retry
//! loop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::{BackoffBuilder, ExponentialBuilder};
use parking_lot::RwLock;
use sai_core::{ErrorKind, SaiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Install,
    Start,
    Search,
    RepositorySync,
    /// Internal class used by the recovery dispatcher's own retry strategy,
    /// kept distinct from the per-action classes above per spec.md §9.
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    Fixed,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_timeout: Duration,
    pub max_timeout: Duration,
    pub max_retries: u32,
    pub scaling_factor: f64,
    pub retry_multiplier: f64,
    pub backoff: BackoffStrategy,
}

impl OperationClass {
    pub fn default_policy(self) -> RetryPolicy {
        match self {
            OperationClass::Install => RetryPolicy {
                base_timeout: Duration::from_secs(60),
                max_timeout: Duration::from_secs(300),
                max_retries: 3,
                scaling_factor: 1.5,
                retry_multiplier: 2.0,
                backoff: BackoffStrategy::Exponential,
            },
            OperationClass::Start => RetryPolicy {
                base_timeout: Duration::from_secs(15),
                max_timeout: Duration::from_secs(60),
                max_retries: 3,
                scaling_factor: 1.5,
                retry_multiplier: 2.0,
                backoff: BackoffStrategy::Exponential,
            },
            OperationClass::Search => RetryPolicy {
                base_timeout: Duration::from_secs(20),
                max_timeout: Duration::from_secs(60),
                max_retries: 2,
                scaling_factor: 1.5,
                retry_multiplier: 1.0,
                backoff: BackoffStrategy::Fixed,
            },
            OperationClass::RepositorySync => RetryPolicy {
                base_timeout: Duration::from_secs(120),
                max_timeout: Duration::from_secs(600),
                max_retries: 3,
                scaling_factor: 1.5,
                retry_multiplier: 2.0,
                backoff: BackoffStrategy::Exponential,
            },
            OperationClass::Recovery => RetryPolicy {
                base_timeout: Duration::from_secs(30),
                max_timeout: Duration::from_secs(120),
                max_retries: 3,
                scaling_factor: 1.5,
                retry_multiplier: 2.0,
                backoff: BackoffStrategy::Exponential,
            },
        }
    }
}

impl RetryPolicy {
    /// Timeout applied to attempt `attempt` (1-based).
    pub fn effective_timeout(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.base_timeout;
        }
        let scaled = self.base_timeout.as_secs_f64() * self.scaling_factor * attempt as f64;
        Duration::from_secs_f64(scaled.min(self.max_timeout.as_secs_f64()))
    }

    /// Delay to wait before attempt `attempt + 1`, given that `attempt` just
    /// failed (1-based).
    ///
    /// The exponential case is computed from `backon`'s `ExponentialBuilder`
    /// sequence (the same crate the teacher's downloader uses for its own
    /// retry backoff) rather than a hand-rolled `powi`, so the formula and
    /// the production retry loop agree on the same delay sequence.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Fixed => Duration::from_secs(1),
            BackoffStrategy::Linear => Duration::from_secs(attempt as u64),
            BackoffStrategy::Exponential => {
                let mut backoff = ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(self.max_timeout)
                    .with_factor(self.retry_multiplier as f32)
                    .without_max_times()
                    .build();
                let index = attempt.saturating_sub(1) as usize;
                backoff.nth(index).unwrap_or(Duration::from_secs(1))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttemptOutcome<T> {
    pub success: bool,
    pub value: Option<T>,
    pub attempts_used: u32,
    pub timed_out: bool,
    pub cancelled: bool,
    pub total_duration: Duration,
    pub last_error: Option<SaiError>,
}

/// Per-operation-id cancellation flags plus per-class policy table.
pub struct TimeoutRetryManager {
    policies: HashMap<OperationClass, RetryPolicy>,
    cancellations: RwLock<HashMap<String, Arc<AtomicBool>>>,
}

impl Default for TimeoutRetryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutRetryManager {
    pub fn new() -> Self {
        let mut policies = HashMap::new();
        for class in [OperationClass::Install, OperationClass::Start, OperationClass::Search, OperationClass::RepositorySync, OperationClass::Recovery] {
            policies.insert(class, class.default_policy());
        }
        Self { policies, cancellations: RwLock::new(HashMap::new()) }
    }

    pub fn set_policy(&mut self, class: OperationClass, policy: RetryPolicy) {
        self.policies.insert(class, policy);
    }

    pub fn policy(&self, class: OperationClass) -> RetryPolicy {
        self.policies.get(&class).copied().unwrap_or_else(|| class.default_policy())
    }

    /// Request cancellation of the attempt loop running under `operation_id`.
    /// A no-op if no such operation is currently tracked.
    pub fn cancel(&self, operation_id: &str) {
        if let Some(flag) = self.cancellations.read().get(operation_id) {
            flag.store(true, Ordering::SeqCst);
        }
    }

    fn flag_for(&self, operation_id: &str) -> Arc<AtomicBool> {
        let mut guard = self.cancellations.write();
        guard.entry(operation_id.to_string()).or_insert_with(|| Arc::new(AtomicBool::new(false))).clone()
    }

    /// Run `op` under `class`'s policy, retrying on timeout or recoverable
    /// error until `max_retries` is exhausted, cancellation is requested, or
    /// `op` succeeds.
    pub async fn execute<T, F, Fut>(&self, operation_id: &str, class: OperationClass, mut op: F) -> AttemptOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SaiError>>,
    {
        let policy = self.policy(class);
        let flag = self.flag_for(operation_id);
        let start = Instant::now();
        let mut last_error: Option<SaiError> = None;
        let mut timed_out = false;

        let mut attempt = 1u32;
        loop {
            if flag.load(Ordering::SeqCst) {
                self.cancellations.write().remove(operation_id);
                return AttemptOutcome {
                    success: false,
                    value: None,
                    attempts_used: attempt - 1,
                    timed_out,
                    cancelled: true,
                    total_duration: start.elapsed(),
                    last_error,
                };
            }

            let timeout = policy.effective_timeout(attempt);
            let attempt_result = tokio::time::timeout(timeout, op(attempt)).await;

            match attempt_result {
                Ok(Ok(value)) => {
                    self.cancellations.write().remove(operation_id);
                    return AttemptOutcome {
                        success: true,
                        value: Some(value),
                        attempts_used: attempt,
                        timed_out: false,
                        cancelled: false,
                        total_duration: start.elapsed(),
                        last_error: None,
                    };
                }
                Ok(Err(err)) => {
                    let recoverable = err.recoverable;
                    last_error = Some(err);
                    if !recoverable || attempt >= policy.max_retries {
                        break;
                    }
                }
                Err(_elapsed) => {
                    timed_out = true;
                    last_error = Some(SaiError::new(ErrorKind::ActionTimeout, format!("operation '{}' timed out after {:?}", operation_id, timeout)));
                    if attempt >= policy.max_retries {
                        break;
                    }
                }
            }

            let delay = policy.backoff_delay(attempt);
            if flag.load(Ordering::SeqCst) {
                self.cancellations.write().remove(operation_id);
                return AttemptOutcome {
                    success: false,
                    value: None,
                    attempts_used: attempt,
                    timed_out,
                    cancelled: true,
                    total_duration: start.elapsed(),
                    last_error,
                };
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }

        self.cancellations.write().remove(operation_id);
        AttemptOutcome {
            success: false,
            value: None,
            attempts_used: attempt,
            timed_out,
            cancelled: false,
            total_duration: start.elapsed(),
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn effective_timeout_scales_after_first_attempt() {
        let policy = OperationClass::Install.default_policy();
        assert_eq!(policy.effective_timeout(1), Duration::from_secs(60));
        assert_eq!(policy.effective_timeout(2), Duration::from_secs_f64(60.0 * 1.5 * 2.0));
        // clamps at max_timeout
        assert_eq!(policy.effective_timeout(10), policy.max_timeout);
    }

    #[test]
    fn backoff_delay_matches_strategy_formulas() {
        let exponential = RetryPolicy { retry_multiplier: 2.0, backoff: BackoffStrategy::Exponential, ..OperationClass::Install.default_policy() };
        assert_eq!(exponential.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(exponential.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(exponential.backoff_delay(3), Duration::from_secs(4));

        let linear = RetryPolicy { backoff: BackoffStrategy::Linear, ..OperationClass::Install.default_policy() };
        assert_eq!(linear.backoff_delay(3), Duration::from_secs(3));

        let fixed = RetryPolicy { backoff: BackoffStrategy::Fixed, ..OperationClass::Install.default_policy() };
        assert_eq!(fixed.backoff_delay(5), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn succeeds_without_retry_when_op_succeeds_first_try() {
        let manager = TimeoutRetryManager::new();
        let outcome = manager.execute("op-1", OperationClass::Search, |_attempt| async { Ok::<_, SaiError>(42) }).await;
        assert!(outcome.success);
        assert_eq!(outcome.attempts_used, 1);
        assert_eq!(outcome.value, Some(42));
    }

    #[tokio::test]
    async fn retries_recoverable_errors_until_success() {
        let manager = TimeoutRetryManager::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let outcome = manager
            .execute("op-2", OperationClass::Search, move |_attempt| {
                let calls = calls_clone.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 1 {
                        Err(SaiError::new(ErrorKind::NetworkTimeout, "timed out"))
                    } else {
                        Ok::<_, SaiError>("done")
                    }
                }
            })
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.attempts_used, 2);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_recoverable_error() {
        let manager = TimeoutRetryManager::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let outcome = manager
            .execute("op-3", OperationClass::Search, move |_attempt| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(SaiError::new(ErrorKind::ActionFailed, "bad config")) }
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_stops_the_loop_before_the_next_attempt() {
        let manager = Arc::new(TimeoutRetryManager::new());
        let manager_clone = manager.clone();
        let handle = tokio::spawn(async move {
            manager_clone
                .execute("op-4", OperationClass::Search, |_attempt| async { Err::<(), _>(SaiError::new(ErrorKind::NetworkTimeout, "timed out")) })
                .await
        });
        // let the first attempt run and the loop reach its backoff sleep
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.cancel("op-4");
        let outcome = handle.await.unwrap();
        assert!(outcome.cancelled);
    }
}
