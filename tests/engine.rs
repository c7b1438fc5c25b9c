use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sai::{
    CircuitBreakerConfig, DefaultProviderManager, EngineConfig, ExecutionContext, ExecutionOptions, FsSaidataManager, Logger, ProviderManager, SaiEngineBuilder, SaiError, SaidataManager,
    StandardDefaultsGenerator, SystemResourceValidator,
};
use sai_core::provider::{Action, ProviderData, ProviderMeta};
use sai_core::saidata::{Package, Saidata};
use sai_core::ErrorKind;
use sai_failsafe::circuit_breaker::BreakerState;
use sai_failsafe::recovery::{CommandRunner, ResourceCreator};
use sai_resolver::ProviderRegistry;

struct StubRunner {
    fail: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl StubRunner {
    fn new(fail: &[&str]) -> Self {
        Self { fail: fail.iter().map(|s| s.to_string()).collect(), calls: Mutex::new(Vec::new()) }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for StubRunner {
    async fn run(&self, provider: &str, _commands: &[String]) -> Result<String, SaiError> {
        self.calls.lock().unwrap().push(provider.to_string());
        if self.fail.contains(&provider.to_string()) {
            Err(SaiError::new(ErrorKind::ProviderUnavailable, format!("{provider} is not installed")).recoverable(false))
        } else {
            Ok(format!("ok:{provider}"))
        }
    }
}

struct StubResourceCreator;

impl ResourceCreator for StubResourceCreator {
    fn create_directory(&self, _path: &str) -> Result<(), SaiError> {
        Ok(())
    }
    fn create_file(&self, _path: &str) -> Result<(), SaiError> {
        Ok(())
    }
}

#[derive(Default)]
struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str, _fields: &HashMap<String, String>) {}
    fn info(&self, _message: &str, _fields: &HashMap<String, String>) {}
    fn warn(&self, _message: &str, _fields: &HashMap<String, String>) {}
    fn error(&self, _message: &str, _fields: &HashMap<String, String>) {}
}

fn apt_and_snap_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(
        ProviderData::new("1.0", ProviderMeta::new("apt", "package-manager", "echo").with_priority(80)).with_action("install", Action::new("install {{ sai_package prov }}")),
    );
    registry.register(
        ProviderData::new("1.0", ProviderMeta::new("snap", "package-manager", "echo").with_priority(50)).with_action("install", Action::new("snap install {{ sai_package prov }}")),
    );
    registry
}

fn nginx_saidata() -> Saidata {
    Saidata::new("nginx").with_package(Package::new("nginx"))
}

#[tokio::test]
async fn executes_the_highest_priority_provider_on_success() {
    let providers = DefaultProviderManager::new(apt_and_snap_registry());
    let validator = SystemResourceValidator::new();
    let defaults = StandardDefaultsGenerator::new(&validator);
    let logger = NoopLogger;
    let runner = StubRunner::new(&[]);
    let resource_creator = StubResourceCreator;
    let engine = SaiEngineBuilder::new(&providers, &FsSaidataManager::new(std::env::temp_dir()), &validator, &defaults, &logger, &runner, &resource_creator).build();

    let ctx = ExecutionContext::new("op-install-nginx");
    let saidata = nginx_saidata();
    let result = engine.execute(&ctx, None, "install", "nginx", &saidata, &ExecutionOptions::default()).await;

    assert!(result.success);
    assert_eq!(result.commands, vec!["install nginx".to_string()]);
    assert_eq!(runner.calls(), vec!["apt".to_string()]);
}

#[tokio::test]
async fn recovers_via_alternative_provider_when_the_preferred_one_fails() {
    let providers = DefaultProviderManager::new(apt_and_snap_registry());
    let validator = SystemResourceValidator::new();
    let defaults = StandardDefaultsGenerator::new(&validator);
    let logger = NoopLogger;
    let runner = StubRunner::new(&["apt"]);
    let resource_creator = StubResourceCreator;
    let engine = SaiEngineBuilder::new(&providers, &FsSaidataManager::new(std::env::temp_dir()), &validator, &defaults, &logger, &runner, &resource_creator).build();

    let ctx = ExecutionContext::new("op-install-nginx-fallback");
    let saidata = nginx_saidata();
    // explicit preferred provider bypasses the availability pre-filter so the
    // failure actually happens at run time, not at selection time.
    let result = engine.execute(&ctx, Some("apt"), "install", "nginx", &saidata, &ExecutionOptions::default()).await;

    assert!(result.success);
    assert_eq!(result.output, "ok:snap");
    assert_eq!(runner.calls(), vec!["apt".to_string(), "snap".to_string()]);
}

#[tokio::test]
async fn circuit_breaker_opens_after_repeated_failures_and_then_rejects() {
    let mut registry = ProviderRegistry::new();
    registry.register(ProviderData::new("1.0", ProviderMeta::new("apt", "package-manager", "echo")).with_action("install", Action::new("install {{ sai_package prov }}")));
    let providers = DefaultProviderManager::new(registry);
    let validator = SystemResourceValidator::new();
    let defaults = StandardDefaultsGenerator::new(&validator);
    let logger = NoopLogger;
    let runner = StubRunner::new(&["apt"]);
    let resource_creator = StubResourceCreator;
    let engine = SaiEngineBuilder::new(&providers, &FsSaidataManager::new(std::env::temp_dir()), &validator, &defaults, &logger, &runner, &resource_creator)
        .with_breaker_config(CircuitBreakerConfig { failure_threshold: 2, ..CircuitBreakerConfig::default() })
        .build();

    let saidata = nginx_saidata();
    for i in 0..2 {
        let ctx = ExecutionContext::new(format!("op-{i}"));
        let result = engine.execute(&ctx, None, "install", "nginx", &saidata, &ExecutionOptions::default()).await;
        assert!(!result.success);
    }
    assert_eq!(engine.circuit_state("apt"), BreakerState::Open);

    let ctx = ExecutionContext::new("op-rejected");
    let result = engine.execute(&ctx, None, "install", "nginx", &saidata, &ExecutionOptions::default()).await;
    assert!(!result.success);
}

#[tokio::test]
async fn run_falls_back_to_generated_defaults_when_saidata_is_missing() {
    let providers = DefaultProviderManager::new(apt_and_snap_registry());
    let validator = SystemResourceValidator::new();
    let defaults = StandardDefaultsGenerator::new(&validator);
    let logger = NoopLogger;
    let runner = StubRunner::new(&[]);
    let resource_creator = StubResourceCreator;
    let saidata_manager = FsSaidataManager::new(std::env::temp_dir());
    let engine = SaiEngineBuilder::new(&providers, &saidata_manager, &validator, &defaults, &logger, &runner, &resource_creator).build();

    let ctx = ExecutionContext::new("op-run-unknown-software");
    let result = engine.run(&ctx, None, "install", "definitely-not-a-real-software-abc123", &ExecutionOptions::default()).await;

    assert!(result.success);
}

#[tokio::test]
async fn dry_run_renders_without_invoking_the_command_runner() {
    let providers = DefaultProviderManager::new(apt_and_snap_registry());
    let validator = SystemResourceValidator::new();
    let defaults = StandardDefaultsGenerator::new(&validator);
    let logger = NoopLogger;
    let runner = StubRunner::new(&[]);
    let resource_creator = StubResourceCreator;
    let engine = SaiEngineBuilder::new(&providers, &FsSaidataManager::new(std::env::temp_dir()), &validator, &defaults, &logger, &runner, &resource_creator).build();

    let ctx = ExecutionContext::new("op-dry-run");
    let saidata = nginx_saidata();
    let result = engine.dry_run(&ctx, Some("apt"), "install", "nginx", &saidata);

    assert!(result.success);
    assert_eq!(result.commands, vec!["install nginx".to_string()]);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn with_config_applies_breaker_threshold_override() {
    let mut registry = ProviderRegistry::new();
    registry.register(ProviderData::new("1.0", ProviderMeta::new("apt", "package-manager", "echo")).with_action("install", Action::new("install {{ sai_package prov }}")));
    let providers = DefaultProviderManager::new(registry);
    let validator = SystemResourceValidator::new();
    let defaults = StandardDefaultsGenerator::new(&validator);
    let logger = NoopLogger;
    let runner = StubRunner::new(&["apt"]);
    let resource_creator = StubResourceCreator;

    let mut config = EngineConfig::default();
    config.circuit_breaker.failure_threshold = 1;
    let engine = SaiEngineBuilder::new(&providers, &FsSaidataManager::new(std::env::temp_dir()), &validator, &defaults, &logger, &runner, &resource_creator).with_config(&config).build();

    let ctx = ExecutionContext::new("op-threshold-one");
    let saidata = nginx_saidata();
    let result = engine.execute(&ctx, None, "install", "nginx", &saidata, &ExecutionOptions::default()).await;

    assert!(!result.success);
    assert_eq!(engine.circuit_state("apt"), BreakerState::Open);
}

#[test]
fn can_execute_is_false_when_a_variable_is_unresolved() {
    let mut registry = ProviderRegistry::new();
    registry.register(
        ProviderData::new("1.0", ProviderMeta::new("apt", "package-manager", "echo"))
            .with_action("install", Action::new("install {{ sai_package prov }}"))
            .with_action("configure", Action::new("configure {{ .Variables.config_path }}")),
    );
    let providers = DefaultProviderManager::new(registry);
    let validator = SystemResourceValidator::new();
    let defaults = StandardDefaultsGenerator::new(&validator);
    let logger = NoopLogger;
    let runner = StubRunner::new(&[]);
    let resource_creator = StubResourceCreator;
    let engine = SaiEngineBuilder::new(&providers, &FsSaidataManager::new(std::env::temp_dir()), &validator, &defaults, &logger, &runner, &resource_creator).build();

    let saidata = nginx_saidata();
    assert!(engine.can_execute("apt", "install", "nginx", &saidata));
    assert!(!engine.can_execute("apt", "configure", "nginx", &saidata));

    let executable = engine.get_executable_actions("apt", "nginx", &saidata);
    assert_eq!(executable, vec!["install".to_string()]);
}
