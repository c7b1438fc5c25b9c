//! The engine's public call shapes: what a caller passes into
//! [`crate::engine::SaiEngine::execute`] and what comes back out.

use std::collections::HashMap;
use std::time::Duration;

use sai_core::SaiError;

/// Per-call correlation context. One of these is created per logical
/// operation (an install, a start, …) and its `operation_id` is what the
/// timeout/retry manager keys cancellation on and the context tracker keys
/// error records on.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub operation_id: String,
    pub variables: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self { operation_id: operation_id.into(), variables: HashMap::new() }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// User-facing knobs for a single `execute`/`dry_run` call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Record a context entry on success too, not just on failure.
    pub record_success_context: bool,
    /// Whether a provider reported unavailable may be substituted via the
    /// degradation manager's fallback list rather than failing outright.
    pub allow_degradation: bool,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub commands: Vec<String>,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub error: Option<SaiError>,
}

impl ExecutionResult {
    pub(crate) fn failure(error: SaiError, commands: Vec<String>, duration: Duration) -> Self {
        Self { success: false, output: String::new(), commands, exit_code: None, duration, error: Some(error) }
    }

    pub(crate) fn success(output: String, commands: Vec<String>, duration: Duration) -> Self {
        Self { success: true, output, commands, exit_code: Some(0), duration, error: None }
    }
}
