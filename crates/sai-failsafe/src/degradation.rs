//! Degradation manager: per-provider health tracking plus the decision of
//! what to do when a provider is reported unavailable for a
//! (software, action) pair, spec.md §4.6.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy)]
pub struct HealthRecord {
    pub available: bool,
    pub last_check: Option<Instant>,
    pub failure_count: u32,
    pub last_failure: Option<Instant>,
    pub last_success: Option<Instant>,
    pub consecutive_fails: u32,
    pub health_score: f64,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self {
            available: true,
            last_check: None,
            failure_count: 0,
            last_failure: None,
            last_success: None,
            consecutive_fails: 0,
            health_score: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DegradationPolicy {
    pub fallback_providers: Vec<String>,
    pub use_defaults: bool,
    pub allow_partial: bool,
    pub max_failures: u32,
    pub health_threshold: f64,
    pub recovery_time: Duration,
    pub disable_on_failure: bool,
    pub notify_on_degradation: bool,
}

impl DegradationPolicy {
    /// Default policy for `install`-class actions: a fixed fallback
    /// priority list, defaults allowed, partial results disallowed.
    pub fn for_install() -> Self {
        Self {
            fallback_providers: vec!["apt".to_string(), "dnf".to_string(), "brew".to_string(), "winget".to_string()],
            use_defaults: true,
            allow_partial: false,
            max_failures: 2,
            health_threshold: 0.5,
            recovery_time: Duration::from_secs(60),
            disable_on_failure: true,
            notify_on_degradation: true,
        }
    }

    /// Default policy for `search`-class actions: no fallback list,
    /// defaults disallowed, partial results allowed.
    pub fn for_search() -> Self {
        Self {
            fallback_providers: Vec::new(),
            use_defaults: false,
            allow_partial: true,
            max_failures: 5,
            health_threshold: 0.5,
            recovery_time: Duration::from_secs(60),
            disable_on_failure: false,
            notify_on_degradation: false,
        }
    }

    pub fn for_action(action: &str) -> Self {
        match action {
            "install" | "uninstall" => Self::for_install(),
            "search" => Self::for_search(),
            _ => Self::for_install(),
        }
    }
}

impl Default for DegradationPolicy {
    fn default() -> Self {
        Self::for_install()
    }
}

#[derive(Debug, Clone)]
pub struct ProviderAvailability {
    pub name: String,
    pub available: bool,
    pub in_registry: bool,
    pub supports_action: bool,
    pub health_score: f64,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackDecision {
    Fallback(String),
    UseDefaults,
    Partial { available_features: Vec<String>, unavailable_features: Vec<String> },
    TerminalFailure { suggestions: Vec<String> },
}

/// Tracks health per `(software, action, provider)` key and a registry of
/// features each action can lose when degraded (spec.md §9 open question:
/// the feature vocabulary is intentionally left to the caller).
pub struct DegradationManager {
    health: RwLock<HashMap<String, HealthRecord>>,
    action_features: RwLock<HashMap<String, Vec<String>>>,
}

impl DegradationManager {
    pub fn new() -> Self {
        Self { health: RwLock::new(HashMap::new()), action_features: RwLock::new(HashMap::new()) }
    }

    fn key(software: &str, action: &str, provider: &str) -> String {
        format!("{software}:{action}:{provider}")
    }

    pub fn record_success(&self, software: &str, action: &str, provider: &str) {
        let key = Self::key(software, action, provider);
        let now = Instant::now();
        let mut guard = self.health.write();
        let record = guard.entry(key).or_default();
        record.consecutive_fails = 0;
        record.health_score = (record.health_score + 0.1).min(1.0);
        record.last_success = Some(now);
        record.last_check = Some(now);
        record.available = true;
    }

    pub fn record_failure(&self, software: &str, action: &str, provider: &str, policy: &DegradationPolicy) {
        let key = Self::key(software, action, provider);
        let now = Instant::now();
        let mut guard = self.health.write();
        let record = guard.entry(key).or_default();
        record.failure_count += 1;
        record.consecutive_fails += 1;
        record.health_score = (record.health_score - 0.2).max(0.0);
        record.last_failure = Some(now);
        record.last_check = Some(now);
        if record.consecutive_fails >= policy.max_failures {
            record.available = false;
        }
    }

    pub fn health_of(&self, software: &str, action: &str, provider: &str) -> HealthRecord {
        let key = Self::key(software, action, provider);
        self.health.read().get(&key).copied().unwrap_or_default()
    }

    pub fn reset(&self, software: &str, action: &str, provider: &str) {
        let key = Self::key(software, action, provider);
        self.health.write().remove(&key);
    }

    pub fn register_action_features(&self, action: &str, features: Vec<String>) {
        self.action_features.write().insert(action.to_string(), features);
    }

    pub fn features_of(&self, action: &str) -> Vec<String> {
        self.action_features.read().get(action).cloned().unwrap_or_default()
    }

    /// Four-step decision procedure from spec.md §4.6, run once a provider
    /// has been reported unavailable for `(software, action)`.
    pub fn decide(&self, action: &str, policy: &DegradationPolicy, providers: &[ProviderAvailability], generated_defaults_cover_action: bool) -> FallbackDecision {
        for name in &policy.fallback_providers {
            if let Some(candidate) = providers.iter().find(|p| &p.name == name) {
                if candidate.available && candidate.in_registry && candidate.supports_action && candidate.health_score >= policy.health_threshold {
                    return FallbackDecision::Fallback(candidate.name.clone());
                }
            }
        }

        if policy.use_defaults && generated_defaults_cover_action {
            return FallbackDecision::UseDefaults;
        }

        if policy.allow_partial {
            let required = self.features_of(action);
            let mut available_features = Vec::new();
            let mut unavailable_features = Vec::new();
            for feature in required {
                let achievable = providers.iter().any(|p| p.available && p.capabilities.contains(&feature));
                if achievable {
                    available_features.push(feature);
                } else {
                    unavailable_features.push(feature);
                }
            }
            return FallbackDecision::Partial { available_features, unavailable_features };
        }

        FallbackDecision::TerminalFailure {
            suggestions: vec![format!("no provider, defaults or partial path available for action '{}'", action)],
        }
    }
}

impl Default for DegradationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_provider_starts_healthy() {
        let manager = DegradationManager::new();
        let record = manager.health_of("nginx", "install", "apt");
        assert!(record.available);
        assert_eq!(record.health_score, 1.0);
    }

    #[test]
    fn success_raises_health_score_and_clears_consecutive_fails() {
        let manager = DegradationManager::new();
        let policy = DegradationPolicy::for_install();
        manager.record_failure("nginx", "install", "apt", &policy);
        manager.record_success("nginx", "install", "apt");
        let record = manager.health_of("nginx", "install", "apt");
        assert_eq!(record.consecutive_fails, 0);
        assert!(record.available);
    }

    #[test]
    fn repeated_failures_cross_max_failures_and_become_unavailable() {
        let manager = DegradationManager::new();
        let policy = DegradationPolicy { max_failures: 3, ..DegradationPolicy::for_install() };
        for _ in 0..3 {
            manager.record_failure("nginx", "install", "apt", &policy);
        }
        assert!(!manager.health_of("nginx", "install", "apt").available);
    }

    #[test]
    fn health_score_never_drops_below_zero_or_exceeds_one() {
        let manager = DegradationManager::new();
        let policy = DegradationPolicy::for_install();
        for _ in 0..20 {
            manager.record_failure("nginx", "install", "apt", &policy);
        }
        assert_eq!(manager.health_of("nginx", "install", "apt").health_score, 0.0);
        for _ in 0..20 {
            manager.record_success("nginx", "install", "apt");
        }
        assert_eq!(manager.health_of("nginx", "install", "apt").health_score, 1.0);
    }

    fn provider(name: &str, available: bool, health_score: f64, capabilities: &[&str]) -> ProviderAvailability {
        ProviderAvailability {
            name: name.to_string(),
            available,
            in_registry: true,
            supports_action: true,
            health_score,
            capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn decide_picks_first_healthy_fallback_in_priority_order() {
        let manager = DegradationManager::new();
        let policy = DegradationPolicy::for_install();
        let providers = vec![provider("apt", false, 0.0, &[]), provider("dnf", true, 0.9, &[])];
        let decision = manager.decide("install", &policy, &providers, false);
        assert_eq!(decision, FallbackDecision::Fallback("dnf".to_string()));
    }

    #[test]
    fn decide_falls_to_defaults_when_no_fallback_qualifies() {
        let manager = DegradationManager::new();
        let policy = DegradationPolicy::for_install();
        let providers = vec![provider("apt", false, 0.0, &[])];
        let decision = manager.decide("install", &policy, &providers, true);
        assert_eq!(decision, FallbackDecision::UseDefaults);
    }

    #[test]
    fn decide_computes_partial_feature_availability_for_search() {
        let manager = DegradationManager::new();
        manager.register_action_features("search", vec!["fuzzy_match".to_string(), "version_filter".to_string()]);
        let policy = DegradationPolicy::for_search();
        let providers = vec![provider("apt", true, 0.9, &["fuzzy_match"])];
        let decision = manager.decide("search", &policy, &providers, false);
        match decision {
            FallbackDecision::Partial { available_features, unavailable_features } => {
                assert_eq!(available_features, vec!["fuzzy_match".to_string()]);
                assert_eq!(unavailable_features, vec!["version_filter".to_string()]);
            }
            other => panic!("expected Partial, got {:?}", other),
        }
    }

    #[test]
    fn decide_terminal_failure_when_nothing_qualifies() {
        let manager = DegradationManager::new();
        let policy = DegradationPolicy { use_defaults: false, allow_partial: false, fallback_providers: vec![], ..DegradationPolicy::for_install() };
        let decision = manager.decide("install", &policy, &[], false);
        assert!(matches!(decision, FallbackDecision::TerminalFailure { .. }));
    }
}
