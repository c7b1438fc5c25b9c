//! `SaiEngine`: wires the selector, circuit breaker, timeout/retry manager,
//! recovery dispatcher, degradation manager and context tracker into the
//! four public operations spec.md §6 calls for.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sai_core::config::{BackoffDefault, EngineConfig};
use sai_core::defaults::DefaultsGenerator;
use sai_core::platform::Platform;
use sai_core::provider::ProviderData;
use sai_core::resource::ResourceValidator;
use sai_core::saidata::Saidata;
use sai_core::{ErrorKind, SaiError};
use sai_context::{ContextTracker, DebugLogSink, ErrorContext, SystemInfo};
use sai_failsafe::circuit_breaker::{BreakerState, CircuitBreakerConfig, CircuitBreakerManager};
use sai_failsafe::degradation::{DegradationManager, DegradationPolicy};
use sai_failsafe::recovery::{classify, defaults_sufficient, CommandRunner, ProviderCandidate, RecoveryContext, RecoveryDispatcher, RecoveryStrategy, ResourceCreator};
use sai_failsafe::retry::{AttemptOutcome, BackoffStrategy, OperationClass, RetryPolicy, TimeoutRetryManager};
use sai_template::render::render;
use sai_template::RenderContext;
use tracing::info_span;

use crate::interfaces::{Logger, ProviderManager, SaidataManager};
use crate::result::{ExecutionContext, ExecutionOptions, ExecutionResult};

fn circuit_breaker_config_from(defaults: &sai_core::config::CircuitBreakerDefaults) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: defaults.failure_threshold,
        recovery_timeout: std::time::Duration::from_secs(defaults.recovery_timeout_secs),
        success_threshold: defaults.success_threshold,
        time_window: std::time::Duration::from_secs(defaults.time_window_secs),
    }
}

fn retry_policy_overrides_from(config: &EngineConfig) -> Vec<(OperationClass, RetryPolicy)> {
    config
        .retry_overrides
        .iter()
        .filter_map(|(name, defaults)| {
            let class = match name.as_str() {
                "install" => OperationClass::Install,
                "start" => OperationClass::Start,
                "search" => OperationClass::Search,
                "repository_sync" => OperationClass::RepositorySync,
                _ => return None,
            };
            let backoff = match defaults.backoff {
                BackoffDefault::Fixed => BackoffStrategy::Fixed,
                BackoffDefault::Linear => BackoffStrategy::Linear,
                BackoffDefault::Exponential => BackoffStrategy::Exponential,
            };
            Some((
                class,
                RetryPolicy {
                    base_timeout: std::time::Duration::from_secs(defaults.base_timeout_secs),
                    max_timeout: std::time::Duration::from_secs(defaults.max_timeout_secs),
                    max_retries: defaults.max_retries,
                    scaling_factor: defaults.scaling_factor,
                    retry_multiplier: defaults.retry_multiplier,
                    backoff,
                },
            ))
        })
        .collect()
}

fn operation_class_for(action: &str) -> OperationClass {
    match action {
        "install" | "uninstall" => OperationClass::Install,
        "start" | "stop" | "restart" => OperationClass::Start,
        "search" => OperationClass::Search,
        "repository_sync" | "sync" => OperationClass::RepositorySync,
        _ => OperationClass::Install,
    }
}

/// All dependencies the engine needs are borrowed for the engine's
/// lifetime; production wires one instance at process start, tests inject
/// stubs per spec.md §9's "explicit dependencies, not globals" note.
pub struct SaiEngine<'a> {
    providers: &'a dyn ProviderManager,
    saidata: &'a dyn SaidataManager,
    validator: &'a dyn ResourceValidator,
    defaults: &'a dyn DefaultsGenerator,
    logger: &'a dyn Logger,
    runner: &'a dyn CommandRunner,
    resource_creator: &'a dyn ResourceCreator,
    breakers: CircuitBreakerManager,
    retry_manager: TimeoutRetryManager,
    degradation: DegradationManager,
    context_tracker: ContextTracker,
    debug_log: Option<parking_lot::Mutex<DebugLogSink>>,
    system_info_allowlist: Vec<String>,
    platform: Platform,
    rollback_timeout: Duration,
}

pub struct SaiEngineBuilder<'a> {
    providers: &'a dyn ProviderManager,
    saidata: &'a dyn SaidataManager,
    validator: &'a dyn ResourceValidator,
    defaults: &'a dyn DefaultsGenerator,
    logger: &'a dyn Logger,
    runner: &'a dyn CommandRunner,
    resource_creator: &'a dyn ResourceCreator,
    breaker_config: CircuitBreakerConfig,
    debug_log: Option<DebugLogSink>,
    system_info_allowlist: Vec<String>,
    context_history_size: usize,
    retry_overrides: Vec<(OperationClass, sai_failsafe::retry::RetryPolicy)>,
    rollback_timeout: Duration,
}

impl<'a> SaiEngineBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        providers: &'a dyn ProviderManager,
        saidata: &'a dyn SaidataManager,
        validator: &'a dyn ResourceValidator,
        defaults: &'a dyn DefaultsGenerator,
        logger: &'a dyn Logger,
        runner: &'a dyn CommandRunner,
        resource_creator: &'a dyn ResourceCreator,
    ) -> Self {
        Self {
            providers,
            saidata,
            validator,
            defaults,
            logger,
            runner,
            resource_creator,
            breaker_config: CircuitBreakerConfig::default(),
            debug_log: None,
            system_info_allowlist: Vec::new(),
            context_history_size: 1000,
            retry_overrides: Vec::new(),
            rollback_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    pub fn with_debug_log(mut self, sink: DebugLogSink) -> Self {
        self.debug_log = Some(sink);
        self
    }

    pub fn with_system_info_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.system_info_allowlist = allowlist;
        self
    }

    /// Bound on the whole rollback sequence for a failed action; defaults
    /// to 60s. Each rollback command gets an equal share of it.
    pub fn with_rollback_timeout(mut self, timeout: Duration) -> Self {
        self.rollback_timeout = timeout;
        self
    }

    /// Applies breaker thresholds, the context history size, the system-info
    /// allowlist and any per-class retry overrides from an `EngineConfig`.
    /// The debug log toggle is read by the host, which then calls
    /// `with_debug_log` itself (opening the sink is an I/O side effect this
    /// builder does not perform on the host's behalf).
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.breaker_config = circuit_breaker_config_from(&config.circuit_breaker);
        self.system_info_allowlist = config.system_info_env_allowlist.clone();
        self.context_history_size = config.context_history_size;
        self.retry_overrides = retry_policy_overrides_from(config);
        self.rollback_timeout = Duration::from_secs(config.rollback_timeout_secs);
        self
    }

    pub fn build(self) -> SaiEngine<'a> {
        let mut retry_manager = TimeoutRetryManager::new();
        for (class, policy) in self.retry_overrides {
            retry_manager.set_policy(class, policy);
        }
        SaiEngine {
            providers: self.providers,
            saidata: self.saidata,
            validator: self.validator,
            defaults: self.defaults,
            logger: self.logger,
            runner: self.runner,
            resource_creator: self.resource_creator,
            breakers: CircuitBreakerManager::new(self.breaker_config),
            retry_manager,
            degradation: DegradationManager::new(),
            context_tracker: ContextTracker::new(self.context_history_size),
            debug_log: self.debug_log.map(parking_lot::Mutex::new),
            system_info_allowlist: self.system_info_allowlist,
            platform: Platform::current(),
            rollback_timeout: self.rollback_timeout,
        }
    }
}

impl<'a> SaiEngine<'a> {
    fn render_context<'c>(&'c self, software: &'c str, provider: &'c str, saidata: &'c Saidata, variables: &'c HashMap<String, String>) -> RenderContext<'c> {
        RenderContext {
            software,
            provider,
            saidata,
            variables,
            platform: &self.platform,
            validator: Some(self.validator),
            defaults: Some(self.defaults),
        }
    }

    fn resolve_provider(&self, software: &str, action: &str, preferred: Option<&str>) -> Result<ProviderData, SaiError> {
        // An explicit preferred provider is attempted directly even if the
        // resolver's own availability pre-filter would have excluded it -
        // whether it actually works is an execution-time question the
        // circuit breaker and recovery dispatcher answer, not a selection
        // question (spec.md §8 scenario 5).
        if let Some(name) = preferred {
            return self
                .providers
                .get_provider(name)
                .ok_or_else(|| SaiError::new(ErrorKind::ProviderNotFound, format!("provider '{name}' is not registered")));
        }
        self.providers.select_provider(software, action, None)
    }

    fn render_commands(&self, provider: &str, action: &str, software: &str, saidata: &Saidata, variables: &HashMap<String, String>, provider_data: &ProviderData) -> Result<Vec<String>, SaiError> {
        let action_def = provider_data
            .actions
            .get(action)
            .ok_or_else(|| SaiError::new(ErrorKind::ActionNotSupported, format!("provider '{provider}' does not support action '{action}'")))?;
        let ctx = self.render_context(software, provider, saidata, variables);
        action_def
            .render_units()
            .iter()
            .map(|unit| render(unit, &ctx, true).map_err(SaiError::from))
            .collect()
    }

    fn rollback_commands(&self, provider: &str, action: &str, software: &str, saidata: &Saidata, variables: &HashMap<String, String>, provider_data: &ProviderData) -> Vec<String> {
        let Some(action_def) = provider_data.actions.get(action) else { return Vec::new() };
        let Some(rollback) = &action_def.rollback else { return Vec::new() };
        let ctx = self.render_context(software, provider, saidata, variables);
        match render(rollback, &ctx, false) {
            Ok(command) => vec![command],
            Err(_) => Vec::new(),
        }
    }

    fn alternative_candidates(&self, software: &str, action: &str, exclude: &str) -> Vec<ProviderCandidate> {
        self.providers
            .get_providers_for_action(action)
            .into_iter()
            .filter(|p| p.provider.name != exclude)
            .map(|p| ProviderCandidate {
                name: p.provider.name.clone(),
                available: self.providers.is_provider_available(&p.provider.name),
                health_score: self.degradation.health_of(software, action, &p.provider.name).health_score,
            })
            .collect()
    }

    fn record_error_context(&self, ctx: &ExecutionContext, action: &str, software: &str, provider: &str, error: &SaiError, commands: &[String], duration: std::time::Duration) {
        let record = ErrorContext::from_error(
            self.context_tracker.next_id(),
            action,
            software,
            provider,
            error,
            Vec::new(),
            SystemInfo::capture(&self.system_info_allowlist.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
            Vec::new(),
            ctx.variables.clone(),
            commands.iter().map(|c| sai_context::CommandRecord {
                command: c.clone(),
                args: Vec::new(),
                env: HashMap::new(),
                cwd: String::new(),
                start: chrono::Utc::now(),
                end: chrono::Utc::now(),
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
            }).collect(),
            duration,
        );
        if let Some(sink) = &self.debug_log {
            let _ = sink.lock().write(&record);
        }
        self.context_tracker.record(record);
    }

    /// The single synchronous entry: render this action's commands, run
    /// them behind the circuit breaker and retry manager for the selected
    /// (or preferred) provider, and dispatch recovery on failure.
    pub async fn execute(&self, ctx: &ExecutionContext, provider: Option<&str>, action: &str, software: &str, saidata: &Saidata, options: &ExecutionOptions) -> ExecutionResult {
        let span = info_span!("execute", software = %software, action = %action, provider = ?provider);
        let _guard = span.enter();
        let start = Instant::now();

        let provider_data = match self.resolve_provider(software, action, provider) {
            Ok(data) => data,
            Err(err) => return ExecutionResult::failure(err, Vec::new(), start.elapsed()),
        };
        let provider_name = provider_data.provider.name.clone();

        let commands = match self.render_commands(&provider_name, action, software, saidata, &ctx.variables, &provider_data) {
            Ok(commands) => commands,
            Err(err) => return ExecutionResult::failure(err, Vec::new(), start.elapsed()),
        };

        let breaker = self.breakers.get_or_create(&provider_name);
        let first_attempt = match breaker.allow() {
            Ok(()) => {
                let runner = self.runner;
                let run_commands = commands.clone();
                let attempt_provider = provider_name.clone();
                self.retry_manager
                    .execute(&ctx.operation_id, operation_class_for(action), |_attempt| {
                        let commands = run_commands.clone();
                        let provider = attempt_provider.clone();
                        async move { runner.run(&provider, &commands).await }
                    })
                    .await
            }
            Err(err) => AttemptOutcome {
                success: false,
                value: None,
                attempts_used: 0,
                timed_out: false,
                cancelled: false,
                total_duration: std::time::Duration::ZERO,
                last_error: Some(err),
            },
        };

        if first_attempt.success {
            breaker.record_success();
            self.degradation.record_success(software, action, &provider_name);
            let output = first_attempt.value.unwrap_or_default();
            if options.record_success_context {
                self.logger.info(
                    "action succeeded",
                    &[("software".to_string(), software.to_string()), ("action".to_string(), action.to_string()), ("provider".to_string(), provider_name.clone())].into_iter().collect(),
                );
            }
            return ExecutionResult::success(output, commands, start.elapsed());
        }

        breaker.record_failure();
        let policy = DegradationPolicy::for_action(action);
        self.degradation.record_failure(software, action, &provider_name, &policy);

        let original_error = first_attempt.last_error.unwrap_or_else(|| SaiError::new(ErrorKind::ActionFailed, format!("action '{action}' failed for provider '{provider_name}'")));

        let recovery_ctx = RecoveryContext {
            action: action.to_string(),
            software: software.to_string(),
            provider: provider_name.clone(),
            commands: commands.clone(),
            rollback_commands: self.rollback_commands(&provider_name, action, software, saidata, &ctx.variables, &provider_data),
            missing_directories: saidata.directories.iter().filter(|d| !self.validator.directory_exists(&d.path)).map(|d| d.path.clone()).collect(),
            missing_files: saidata.files.iter().filter(|f| !self.validator.file_exists(&f.path)).map(|f| f.path.clone()).collect(),
            original_error: original_error.clone(),
            rollback_timeout: self.rollback_timeout,
        };

        let candidates = self.alternative_candidates(software, action, &provider_name);
        let generated_defaults = if matches!(classify(&original_error), sai_failsafe::recovery::ErrorClassification::MissingSaidata) {
            Some(self.saidata.generate_defaults(software))
        } else {
            None
        };

        let dispatcher = RecoveryDispatcher::new(&self.retry_manager);
        let outcome = dispatcher.dispatch(&recovery_ctx, self.runner, self.resource_creator, &candidates, generated_defaults.as_ref()).await;

        let total_duration = start.elapsed();
        if outcome.success {
            if let Some(fallback) = &outcome.fallback_provider {
                self.degradation.record_success(software, action, fallback);
                self.logger.warn("recovered via alternative provider", &[("provider".to_string(), fallback.clone()), ("strategy".to_string(), outcome.recovery_strategy.clone())].into_iter().collect());
            }
            if outcome.strategy == RecoveryStrategy::GracefulDegradation {
                self.logger.warn("executed with synthesized defaults", &[("software".to_string(), software.to_string())].into_iter().collect());
            }
            let output = outcome.output.unwrap_or_default();
            return ExecutionResult::success(output, commands, total_duration);
        }

        let final_error = outcome.final_error.unwrap_or(original_error);
        self.record_error_context(ctx, action, software, &provider_name, &final_error, &commands, total_duration);
        ExecutionResult::failure(final_error, commands, total_duration)
    }

    /// Load saidata for `software` first, falling back to synthesized
    /// defaults (and the graceful-degradation recovery path) when the host
    /// has no record for it - spec.md §8 scenario 6.
    pub async fn run(&self, ctx: &ExecutionContext, provider: Option<&str>, action: &str, software: &str, options: &ExecutionOptions) -> ExecutionResult {
        match self.saidata.load(software) {
            Ok(saidata) => self.execute(ctx, provider, action, software, &saidata, options).await,
            Err(err) if err.kind == ErrorKind::SaidataNotFound => {
                let defaults = self.saidata.generate_defaults(software);
                if !defaults_sufficient(action, &defaults) {
                    return ExecutionResult::failure(err, Vec::new(), std::time::Duration::ZERO);
                }
                self.logger.warn("saidata not found, falling back to generated defaults", &[("software".to_string(), software.to_string())].into_iter().collect());
                self.execute(ctx, provider, action, software, &defaults, options).await
            }
            Err(err) => ExecutionResult::failure(err, Vec::new(), std::time::Duration::ZERO),
        }
    }

    /// Identical surface to `execute`, rendering without running anything.
    pub fn dry_run(&self, ctx: &ExecutionContext, provider: Option<&str>, action: &str, software: &str, saidata: &Saidata) -> ExecutionResult {
        let start = Instant::now();
        let provider_data = match self.resolve_provider(software, action, provider) {
            Ok(data) => data,
            Err(err) => return ExecutionResult::failure(err, Vec::new(), start.elapsed()),
        };
        match self.render_commands(&provider_data.provider.name, action, software, saidata, &ctx.variables, &provider_data) {
            Ok(commands) => ExecutionResult::success(String::new(), commands, start.elapsed()),
            Err(err) => ExecutionResult::failure(err, Vec::new(), start.elapsed()),
        }
    }

    /// Pure predicate: would `action` render cleanly for `provider` right
    /// now, with no helper errors and nothing unresolved?
    pub fn can_execute(&self, provider: &str, action: &str, software: &str, saidata: &Saidata) -> bool {
        let Some(provider_data) = self.providers.get_provider(provider) else { return false };
        let Some(action_def) = provider_data.actions.get(action) else { return false };
        let variables = HashMap::new();
        let ctx = self.render_context(software, provider, saidata, &variables);
        action_def.render_units().iter().all(|unit| sai_resolver::validate(unit, &ctx).can_execute)
    }

    /// Every action name `provider` defines that currently passes
    /// `can_execute`.
    pub fn get_executable_actions(&self, provider: &str, software: &str, saidata: &Saidata) -> Vec<String> {
        let Some(provider_data) = self.providers.get_provider(provider) else { return Vec::new() };
        provider_data.actions.keys().filter(|action| self.can_execute(provider, action, software, saidata)).cloned().collect()
    }

    pub fn cancel(&self, operation_id: &str) {
        self.retry_manager.cancel(operation_id);
    }

    pub fn error_history(&self) -> &ContextTracker {
        &self.context_tracker
    }

    /// Current circuit breaker state for `provider`, for observability and
    /// tests. A provider never executed against is reported `Closed`.
    pub fn circuit_state(&self, provider: &str) -> BreakerState {
        self.breakers.get_or_create(provider).state()
    }
}
