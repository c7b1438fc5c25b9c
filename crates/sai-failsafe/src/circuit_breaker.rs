//! Circuit breaker: per-provider admission control, spec.md §4.3.
//!
//! Three states - Closed, Open, HalfOpen - tracked per breaker name (an
//! engine typically keys breakers by provider name). Failures are counted
//! within a sliding time window rather than since the breaker's creation, so
//! a provider that failed a lot last week does not stay tripped forever.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use sai_core::{ErrorKind, SaiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub success_threshold: u32,
    pub time_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            time_window: Duration::from_secs(60),
        }
    }
}

struct Inner {
    state: BreakerState,
    failures: Vec<Instant>,
    last_failure: Option<Instant>,
    half_open_successes: u32,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failures: Vec::new(),
            last_failure: None,
            half_open_successes: 0,
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        self.failures.retain(|t| now.duration_since(*t) <= window);
    }
}

/// A single named breaker. Cheap to construct; state lives behind a lock so
/// it can be shared across concurrent attempts against the same provider.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: RwLock<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self { name: name.into(), config, inner: RwLock::new(Inner::new()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        self.inner.read().state
    }

    /// Admission check. `Closed` and `HalfOpen` always admit. `Open` admits
    /// (and transitions to `HalfOpen`) once `recovery_timeout` has elapsed
    /// since the last recorded failure, otherwise rejects.
    pub fn allow(&self) -> Result<(), SaiError> {
        let now = Instant::now();
        let mut inner = self.inner.write();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let elapsed = inner.last_failure.map(|t| now.duration_since(t)).unwrap_or(Duration::MAX);
                if elapsed >= self.config.recovery_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_successes = 0;
                    Ok(())
                } else {
                    Err(SaiError::new(ErrorKind::ProviderUnavailable, format!("circuit breaker '{}' is open", self.name))
                        .recoverable(false)
                        .with_context("breaker", self.name.clone()))
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.write();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    inner.state = BreakerState::Closed;
                    inner.failures.clear();
                    inner.half_open_successes = 0;
                }
            }
            BreakerState::Closed => {}
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.write();
        inner.prune(now, self.config.time_window);
        inner.failures.push(now);
        inner.last_failure = Some(now);
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.half_open_successes = 0;
            }
            BreakerState::Closed => {
                if inner.failures.len() as u32 >= self.config.failure_threshold {
                    inner.state = BreakerState::Open;
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.write();
        *inner = Inner::new();
    }
}

/// Registry of breakers keyed by name, one per provider in practice.
#[derive(Default)]
pub struct CircuitBreakerManager {
    breakers: RwLock<HashMap<String, std::sync::Arc<CircuitBreaker>>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerManager {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self { breakers: RwLock::new(HashMap::new()), default_config }
    }

    pub fn get_or_create(&self, name: &str) -> std::sync::Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(name) {
            return existing.clone();
        }
        let mut guard = self.breakers.write();
        guard
            .entry(name.to_string())
            .or_insert_with(|| std::sync::Arc::new(CircuitBreaker::new(name, self.default_config)))
            .clone()
    }

    pub fn reset(&self, name: &str) {
        if let Some(breaker) = self.breakers.read().get(name) {
            breaker.reset();
        }
    }

    pub fn reset_all(&self) {
        for breaker in self.breakers.read().values() {
            breaker.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(20),
            success_threshold: 2,
            time_window: Duration::from_secs(60),
        }
    }

    #[test]
    fn stays_closed_below_failure_threshold() {
        let breaker = CircuitBreaker::new("apt", fast_config());
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.allow().is_ok());
    }

    #[test]
    fn trips_open_at_failure_threshold_and_rejects() {
        let breaker = CircuitBreaker::new("apt", fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(breaker.allow().is_err());
    }

    #[test]
    fn transitions_to_half_open_after_recovery_timeout() {
        let breaker = CircuitBreaker::new("apt", fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.allow().is_ok());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn closes_after_success_threshold_met_in_half_open() {
        let breaker = CircuitBreaker::new("apt", fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        breaker.allow().unwrap();
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn single_failure_in_half_open_reopens() {
        let breaker = CircuitBreaker::new("apt", fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        breaker.allow().unwrap();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn failures_outside_time_window_do_not_count() {
        let config = CircuitBreakerConfig { time_window: Duration::from_millis(10), ..fast_config() };
        let breaker = CircuitBreaker::new("apt", config);
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn manager_returns_the_same_breaker_for_repeated_lookups() {
        let manager = CircuitBreakerManager::new(fast_config());
        let a = manager.get_or_create("apt");
        a.record_failure();
        let b = manager.get_or_create("apt");
        assert_eq!(b.state(), BreakerState::Closed);
        assert_eq!(std::sync::Arc::strong_count(&a), 2);
    }
}
