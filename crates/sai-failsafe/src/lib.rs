//! Circuit breaker, timeout/retry manager, recovery dispatcher and
//! degradation manager: the engine's answer to "what happens when an
//! action fails".

pub mod circuit_breaker;
pub mod degradation;
pub mod recovery;
pub mod retry;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager};
pub use degradation::{DegradationManager, DegradationPolicy, FallbackDecision, HealthRecord, ProviderAvailability};
pub use recovery::{classify, strategy_for, CommandRunner, ErrorClassification, ProviderCandidate, RecoveryContext, RecoveryDispatcher, RecoveryOutcome, RecoveryStrategy, ResourceCreator};
pub use retry::{AttemptOutcome, BackoffStrategy, OperationClass, RetryPolicy, TimeoutRetryManager};
