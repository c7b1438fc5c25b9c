//! Recovery dispatcher: classifies a failed action's error and runs the
//! matching recovery strategy, spec.md §4.5.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sai_core::{ErrorKind, SaiError};

use crate::retry::{OperationClass, TimeoutRetryManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    Transient,
    ProviderProblem,
    MissingResource,
    FailedWithRollback,
    FailedNoRollback,
    MissingSaidata,
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    Retry,
    AlternativeProvider,
    Rollback,
    ResourceCreation,
    GracefulDegradation,
    None,
}

impl RecoveryStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryStrategy::Retry => "retry",
            RecoveryStrategy::AlternativeProvider => "alternative_provider",
            RecoveryStrategy::Rollback => "rollback",
            RecoveryStrategy::ResourceCreation => "resource_creation",
            RecoveryStrategy::GracefulDegradation => "graceful_degradation",
            RecoveryStrategy::None => "none",
        }
    }
}

/// Classify `error` per spec.md §4.5's table. An action failure carrying a
/// `"rollback_available" = "true"` context entry is treated as having a
/// rollback path; everything else falls through to its kind.
pub fn classify(error: &SaiError) -> ErrorClassification {
    match error.kind {
        ErrorKind::ActionTimeout | ErrorKind::CommandTimeout | ErrorKind::NetworkTimeout | ErrorKind::NetworkUnavailable => ErrorClassification::Transient,
        ErrorKind::ProviderNotFound | ErrorKind::ProviderUnavailable => ErrorClassification::ProviderProblem,
        ErrorKind::ResourceMissing => ErrorClassification::MissingResource,
        ErrorKind::ActionFailed | ErrorKind::CommandFailed => {
            if error.context.get("rollback_available").map(|v| v == "true").unwrap_or(false) {
                ErrorClassification::FailedWithRollback
            } else {
                ErrorClassification::FailedNoRollback
            }
        }
        ErrorKind::SaidataNotFound => ErrorClassification::MissingSaidata,
        ErrorKind::Internal | ErrorKind::Unknown => ErrorClassification::Transient,
        _ => ErrorClassification::Unclassified,
    }
}

pub fn strategy_for(classification: ErrorClassification) -> RecoveryStrategy {
    match classification {
        ErrorClassification::Transient | ErrorClassification::FailedNoRollback => RecoveryStrategy::Retry,
        ErrorClassification::ProviderProblem => RecoveryStrategy::AlternativeProvider,
        ErrorClassification::MissingResource => RecoveryStrategy::ResourceCreation,
        ErrorClassification::FailedWithRollback => RecoveryStrategy::Rollback,
        ErrorClassification::MissingSaidata => RecoveryStrategy::GracefulDegradation,
        ErrorClassification::Unclassified => RecoveryStrategy::None,
    }
}

#[derive(Debug, Clone)]
pub struct ProviderCandidate {
    pub name: String,
    pub available: bool,
    pub health_score: f64,
}

/// First candidate, in the caller's priority order, that is not `exclude`,
/// is available and has a health score of at least 0.5.
pub fn select_alternative_provider<'a>(candidates: &'a [ProviderCandidate], exclude: &str) -> Option<&'a ProviderCandidate> {
    candidates.iter().find(|c| c.name != exclude && c.available && c.health_score >= 0.5)
}

/// Does `saidata` carry enough to run `action` at all? Mirrors the
/// "sufficient defaults" rule from spec.md §4.6.
pub fn defaults_sufficient(action: &str, saidata: &sai_core::saidata::Saidata) -> bool {
    match action {
        "install" | "uninstall" => !saidata.packages.is_empty(),
        "start" | "stop" | "restart" | "status" => !saidata.services.is_empty(),
        "config" => !saidata.files.is_empty(),
        _ => true,
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `commands` under `provider`, returning captured stdout on
    /// success.
    async fn run(&self, provider: &str, commands: &[String]) -> Result<String, SaiError>;
}

pub trait ResourceCreator: Send + Sync {
    fn create_directory(&self, path: &str) -> Result<(), SaiError>;
    fn create_file(&self, path: &str) -> Result<(), SaiError>;
}

#[derive(Debug, Clone)]
pub struct RecoveryContext {
    pub action: String,
    pub software: String,
    pub provider: String,
    pub commands: Vec<String>,
    pub rollback_commands: Vec<String>,
    pub missing_directories: Vec<String>,
    pub missing_files: Vec<String>,
    pub original_error: SaiError,
    /// Bound on the whole rollback sequence; each command gets an equal
    /// share of it (spec.md §4.5).
    pub rollback_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub success: bool,
    pub strategy: RecoveryStrategy,
    pub recovery_strategy: String,
    pub recovered_error: Option<SaiError>,
    pub final_error: Option<SaiError>,
    pub attempts_used: u32,
    pub rollback_executed: bool,
    pub fallback_provider: Option<String>,
    pub output: Option<String>,
    pub duration: Duration,
}

impl RecoveryOutcome {
    fn new(strategy: RecoveryStrategy) -> Self {
        Self {
            success: false,
            strategy,
            recovery_strategy: strategy.as_str().to_string(),
            recovered_error: None,
            final_error: None,
            attempts_used: 0,
            rollback_executed: false,
            fallback_provider: None,
            output: None,
            duration: Duration::ZERO,
        }
    }
}

pub struct RecoveryDispatcher<'a> {
    retry_manager: &'a TimeoutRetryManager,
}

impl<'a> RecoveryDispatcher<'a> {
    pub fn new(retry_manager: &'a TimeoutRetryManager) -> Self {
        Self { retry_manager }
    }

    pub async fn dispatch(
        &self,
        ctx: &RecoveryContext,
        runner: &dyn CommandRunner,
        resource_creator: &dyn ResourceCreator,
        candidates: &[ProviderCandidate],
        generated_defaults: Option<&sai_core::saidata::Saidata>,
    ) -> RecoveryOutcome {
        let start = Instant::now();
        let classification = classify(&ctx.original_error);
        let strategy = strategy_for(classification);

        let mut outcome = match strategy {
            RecoveryStrategy::Retry => self.retry(ctx, runner).await,
            RecoveryStrategy::AlternativeProvider => self.alternative_provider(ctx, runner, candidates).await,
            RecoveryStrategy::Rollback => self.rollback(ctx, runner).await,
            RecoveryStrategy::ResourceCreation => self.resource_creation(ctx, runner, resource_creator).await,
            RecoveryStrategy::GracefulDegradation => self.graceful_degradation(ctx, generated_defaults),
            RecoveryStrategy::None => {
                let mut o = RecoveryOutcome::new(RecoveryStrategy::None);
                o.final_error = Some(ctx.original_error.clone());
                o
            }
        };
        outcome.duration = start.elapsed();
        outcome
    }

    async fn retry(&self, ctx: &RecoveryContext, runner: &dyn CommandRunner) -> RecoveryOutcome {
        let mut outcome = RecoveryOutcome::new(RecoveryStrategy::Retry);
        let operation_id = format!("recovery:{}:{}:{}", ctx.software, ctx.action, ctx.provider);
        let commands = ctx.commands.clone();
        let provider = ctx.provider.clone();
        let result = self
            .retry_manager
            .execute(&operation_id, OperationClass::Recovery, |_attempt| {
                let commands = commands.clone();
                let provider = provider.clone();
                async move { runner.run(&provider, &commands).await }
            })
            .await;
        outcome.attempts_used = result.attempts_used;
        if result.success {
            outcome.success = true;
            outcome.recovered_error = None;
            outcome.output = result.value;
        } else {
            outcome.final_error = result.last_error.or_else(|| Some(ctx.original_error.clone()));
        }
        outcome
    }

    async fn alternative_provider(&self, ctx: &RecoveryContext, runner: &dyn CommandRunner, candidates: &[ProviderCandidate]) -> RecoveryOutcome {
        let mut outcome = RecoveryOutcome::new(RecoveryStrategy::AlternativeProvider);
        let mut tried = vec![ctx.provider.clone()];
        loop {
            let remaining: Vec<ProviderCandidate> = candidates.iter().filter(|c| !tried.contains(&c.name)).cloned().collect();
            let Some(candidate) = select_alternative_provider(&remaining, "") else {
                outcome.final_error = Some(
                    SaiError::new(ErrorKind::ProviderUnavailable, format!("no healthy alternative provider for action '{}'", ctx.action)).with_source(ctx.original_error.clone()),
                );
                return outcome;
            };
            outcome.attempts_used += 1;
            match runner.run(&candidate.name, &ctx.commands).await {
                Ok(output) => {
                    outcome.success = true;
                    outcome.fallback_provider = Some(candidate.name.clone());
                    outcome.output = Some(output);
                    return outcome;
                }
                Err(_) => {
                    tried.push(candidate.name.clone());
                }
            }
        }
    }

    async fn rollback(&self, ctx: &RecoveryContext, runner: &dyn CommandRunner) -> RecoveryOutcome {
        let mut outcome = RecoveryOutcome::new(RecoveryStrategy::Rollback);
        let per_command_timeout = ctx.rollback_timeout / ctx.rollback_commands.len().max(1) as u32;
        let mut ran = 0usize;
        for command in &ctx.rollback_commands {
            ran += 1;
            match tokio::time::timeout(per_command_timeout, runner.run(&ctx.provider, std::slice::from_ref(command))).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    outcome.rollback_executed = ran > 0;
                    outcome.final_error = Some(err.with_source(ctx.original_error.clone()));
                    return outcome;
                }
                Err(_) => {
                    outcome.rollback_executed = ran > 0;
                    outcome.final_error = Some(
                        SaiError::new(ErrorKind::CommandTimeout, format!("rollback command '{command}' exceeded its {per_command_timeout:?} timeout"))
                            .with_source(ctx.original_error.clone()),
                    );
                    return outcome;
                }
            }
        }
        outcome.rollback_executed = true;
        outcome.success = true;
        outcome.recovered_error = Some(ctx.original_error.clone());
        outcome
    }

    async fn resource_creation(&self, ctx: &RecoveryContext, runner: &dyn CommandRunner, resource_creator: &dyn ResourceCreator) -> RecoveryOutcome {
        let mut outcome = RecoveryOutcome::new(RecoveryStrategy::ResourceCreation);
        for dir in &ctx.missing_directories {
            if let Err(err) = resource_creator.create_directory(dir) {
                outcome.final_error = Some(err);
                return outcome;
            }
        }
        for file in &ctx.missing_files {
            if let Err(err) = resource_creator.create_file(file) {
                outcome.final_error = Some(err);
                return outcome;
            }
        }
        outcome.attempts_used = 1;
        match runner.run(&ctx.provider, &ctx.commands).await {
            Ok(output) => {
                outcome.success = true;
                outcome.recovered_error = Some(ctx.original_error.clone());
                outcome.output = Some(output);
            }
            Err(err) => outcome.final_error = Some(err),
        }
        outcome
    }

    fn graceful_degradation(&self, ctx: &RecoveryContext, generated_defaults: Option<&sai_core::saidata::Saidata>) -> RecoveryOutcome {
        let mut outcome = RecoveryOutcome::new(RecoveryStrategy::GracefulDegradation);
        match generated_defaults {
            Some(defaults) if defaults_sufficient(&ctx.action, defaults) => {
                outcome.success = true;
                outcome.recovered_error = Some(ctx.original_error.clone());
            }
            _ => {
                outcome.final_error = Some(
                    SaiError::new(ErrorKind::SaidataNotFound, format!("no usable defaults for '{}' action '{}'", ctx.software, ctx.action)).with_source(ctx.original_error.clone()),
                );
            }
        }
        outcome
    }
}
