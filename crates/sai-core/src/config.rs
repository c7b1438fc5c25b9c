//! Engine-owned runtime configuration: circuit-breaker defaults, timeout/
//! retry policy defaults, degradation defaults, and the debug-log toggle.
//!
//! Layered with `figment`: built-in defaults, an optional TOML file, then
//! `SAI_*`-prefixed environment variables, highest priority last.

use std::collections::HashMap;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, SaiError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffDefault {
    Fixed,
    Linear,
    Exponential,
}

/// Mirrors `sai_failsafe::retry::RetryPolicy` in plain, `sai-failsafe`-free
/// form so this crate's configuration data does not have to depend upward
/// on the failsafe crate. The root crate converts these into real
/// `RetryPolicy` values when it builds the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicyDefaults {
    pub base_timeout_secs: u64,
    pub max_timeout_secs: u64,
    pub max_retries: u32,
    pub scaling_factor: f64,
    pub retry_multiplier: f64,
    pub backoff: BackoffDefault,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircuitBreakerDefaults {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub success_threshold: u32,
    pub time_window_secs: u64,
}

impl Default for CircuitBreakerDefaults {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 30,
            success_threshold: 2,
            time_window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradationDefaults {
    pub health_warning_threshold: f64,
    pub health_critical_threshold: f64,
}

impl Default for DegradationDefaults {
    fn default() -> Self {
        Self {
            health_warning_threshold: 0.5,
            health_critical_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub circuit_breaker: CircuitBreakerDefaults,
    pub degradation: DegradationDefaults,
    /// Whether a `DebugLogSink` (sai-context) is active by default.
    pub debug_log_enabled: bool,
    /// Env vars allowed into `ErrorContext::system_info` snapshots.
    pub system_info_env_allowlist: Vec<String>,
    /// Cap on `ContextTracker`'s in-memory error history.
    pub context_history_size: usize,
    /// Bound on a failed action's whole rollback sequence.
    pub rollback_timeout_secs: u64,
    /// Per-operation-class retry policy overrides, keyed by
    /// `"install" | "start" | "search" | "repository_sync"`. Unknown keys
    /// are ignored by the root crate rather than treated as a load error.
    #[serde(default)]
    pub retry_overrides: HashMap<String, RetryPolicyDefaults>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerDefaults::default(),
            degradation: DegradationDefaults::default(),
            debug_log_enabled: false,
            system_info_env_allowlist: Vec::new(),
            context_history_size: 1000,
            rollback_timeout_secs: 60,
            retry_overrides: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Build from built-in defaults, an optional TOML file, and
    /// `SAI_*`-prefixed environment variables, in that priority order.
    pub fn load(config_path: Option<&str>) -> Result<Self, SaiError> {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("SAI_").split("_"));
        figment.extract().map_err(|e| {
            SaiError::new(ErrorKind::ConfigInvalid, format!("failed to load engine configuration: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_file_or_env_returns_defaults() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.recovery_timeout_secs, 30);
        assert!(!config.debug_log_enabled);
    }

    #[test]
    fn load_with_missing_file_path_does_not_error() {
        let config = EngineConfig::load(Some("/nonexistent/sai/config.toml")).unwrap();
        assert_eq!(config.degradation.health_warning_threshold, 0.5);
    }

    #[test]
    fn context_history_size_defaults_to_one_thousand() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.context_history_size, 1000);
        assert!(config.retry_overrides.is_empty());
    }

    #[test]
    fn rollback_timeout_defaults_to_sixty_seconds() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.rollback_timeout_secs, 60);
    }
}
