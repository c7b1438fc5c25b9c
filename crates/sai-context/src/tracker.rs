//! Execution context tracker: spec.md §4.7. Captures an `ErrorContext` per
//! failure (or, opt-in, per successful run) and keeps the most recent
//! `max_size` of them in memory for post-mortem inspection.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sai_core::error::{ErrorKind, SaiError};

#[derive(Debug, Clone, serde::Serialize)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
    pub package: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub runtime_version: String,
    pub hostname: String,
    pub current_user: String,
    pub working_dir: String,
    pub env: HashMap<String, String>,
}

impl SystemInfo {
    /// Captures the current process' info, whitelisting only the given env
    /// var names rather than dumping the whole environment.
    pub fn capture(whitelisted_env: &[&str]) -> Self {
        let platform = sai_core::platform::Platform::current();
        Self {
            os: platform.os.to_string(),
            architecture: platform.arch.to_string(),
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: hostname_best_effort(),
            current_user: std::env::var("USER").or_else(|_| std::env::var("USERNAME")).unwrap_or_else(|_| "unknown".to_string()),
            working_dir: std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_default(),
            env: whitelisted_env.iter().filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v))).collect(),
        }
    }
}

fn hostname_best_effort() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionStep {
    pub step: String,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub success: bool,
    pub error: Option<String>,
    pub context: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CommandRecord {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorContext {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub software: String,
    pub provider: String,
    pub error_kind: Option<String>,
    pub stack_trace: Vec<StackFrame>,
    pub system_info: SystemInfo,
    pub execution_path: Vec<ExecutionStep>,
    pub variables: HashMap<String, String>,
    pub commands: Vec<CommandRecord>,
    pub duration: Duration,
    pub recoverable: bool,
    pub recovery_hints: Vec<String>,
}

impl ErrorContext {
    /// Builds a context from an in-flight error and the accumulated
    /// execution log, truncating `stack_trace` to 10 frames per spec.md.
    pub fn from_error(
        id: String,
        action: impl Into<String>,
        software: impl Into<String>,
        provider: impl Into<String>,
        error: &SaiError,
        stack_trace: Vec<StackFrame>,
        system_info: SystemInfo,
        execution_path: Vec<ExecutionStep>,
        variables: HashMap<String, String>,
        commands: Vec<CommandRecord>,
        duration: Duration,
    ) -> Self {
        let mut stack_trace = stack_trace;
        stack_trace.truncate(10);
        Self {
            id,
            timestamp: Utc::now(),
            action: action.into(),
            software: software.into(),
            provider: provider.into(),
            error_kind: Some(error.kind.as_str().to_string()),
            stack_trace,
            system_info,
            execution_path,
            variables,
            commands,
            duration,
            recoverable: error.recoverable,
            recovery_hints: error.suggestions.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ErrorStats {
    pub total: usize,
    pub by_type: HashMap<String, usize>,
    pub by_action: HashMap<String, usize>,
    pub recoverable: usize,
    pub recent: Vec<String>,
}

/// Bounded, id-keyed ring buffer of [`ErrorContext`] records. Insertion
/// beyond `max_size` evicts the oldest entry; all other operations work
/// off a read lock and snapshot copies.
pub struct ContextTracker {
    max_size: usize,
    order: RwLock<VecDeque<String>>,
    contexts: RwLock<HashMap<String, ErrorContext>>,
    sequence: std::sync::atomic::AtomicU64,
}

impl ContextTracker {
    pub fn new(max_size: usize) -> Self {
        Self { max_size, order: RwLock::new(VecDeque::new()), contexts: RwLock::new(HashMap::new()), sequence: std::sync::atomic::AtomicU64::new(0) }
    }

    /// A time-unique id: current timestamp plus a monotonically increasing
    /// counter, so two contexts recorded within the same tick never collide.
    pub fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("{}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default(), seq)
    }

    pub fn record(&self, context: ErrorContext) {
        let mut order = self.order.write();
        let mut contexts = self.contexts.write();
        if contexts.len() >= self.max_size {
            if let Some(oldest) = order.pop_front() {
                contexts.remove(&oldest);
            }
        }
        order.push_back(context.id.clone());
        contexts.insert(context.id.clone(), context);
    }

    pub fn get(&self, id: &str) -> Option<ErrorContext> {
        self.contexts.read().get(id).cloned()
    }

    pub fn by_error_type(&self, kind: ErrorKind) -> Vec<ErrorContext> {
        let needle = kind.as_str();
        self.contexts.read().values().filter(|c| c.error_kind.as_deref() == Some(needle)).cloned().collect()
    }

    pub fn by_action(&self, action: &str) -> Vec<ErrorContext> {
        self.contexts.read().values().filter(|c| c.action == action).cloned().collect()
    }

    pub fn list(&self) -> Vec<ErrorContext> {
        let order = self.order.read();
        let contexts = self.contexts.read();
        order.iter().filter_map(|id| contexts.get(id).cloned()).collect()
    }

    pub fn clear(&self) {
        let mut order = self.order.write();
        let mut contexts = self.contexts.write();
        order.clear();
        contexts.clear();
    }

    pub fn stats(&self) -> ErrorStats {
        let contexts = self.contexts.read();
        let order = self.order.read();
        let mut by_type = HashMap::new();
        let mut by_action = HashMap::new();
        let mut recoverable = 0;
        for context in contexts.values() {
            if let Some(kind) = &context.error_kind {
                *by_type.entry(kind.clone()).or_insert(0) += 1;
            }
            *by_action.entry(context.action.clone()).or_insert(0) += 1;
            if context.recoverable {
                recoverable += 1;
            }
        }
        let recent = order.iter().rev().take(10).cloned().collect();
        ErrorStats { total: contexts.len(), by_type, by_action, recoverable, recent }
    }
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context(tracker: &ContextTracker, action: &str, kind: ErrorKind) -> ErrorContext {
        let error = SaiError::new(kind, "boom");
        ErrorContext::from_error(
            tracker.next_id(),
            action,
            "nginx",
            "apt",
            &error,
            vec![],
            SystemInfo::capture(&[]),
            vec![],
            HashMap::new(),
            vec![],
            Duration::from_millis(5),
        )
    }

    #[test]
    fn records_and_looks_up_by_id() {
        let tracker = ContextTracker::new(10);
        let context = sample_context(&tracker, "install", ErrorKind::ActionTimeout);
        let id = context.id.clone();
        tracker.record(context);
        assert!(tracker.get(&id).is_some());
    }

    #[test]
    fn evicts_oldest_when_max_size_exceeded() {
        let tracker = ContextTracker::new(2);
        let first = sample_context(&tracker, "install", ErrorKind::ActionTimeout);
        let first_id = first.id.clone();
        tracker.record(first);
        tracker.record(sample_context(&tracker, "install", ErrorKind::ActionTimeout));
        tracker.record(sample_context(&tracker, "install", ErrorKind::ActionTimeout));
        assert!(tracker.get(&first_id).is_none());
        assert_eq!(tracker.list().len(), 2);
    }

    #[test]
    fn filters_by_error_type_and_action() {
        let tracker = ContextTracker::new(10);
        tracker.record(sample_context(&tracker, "install", ErrorKind::ActionTimeout));
        tracker.record(sample_context(&tracker, "start", ErrorKind::NetworkTimeout));
        assert_eq!(tracker.by_error_type(ErrorKind::ActionTimeout).len(), 1);
        assert_eq!(tracker.by_action("start").len(), 1);
    }

    #[test]
    fn stats_aggregate_counts_and_recent_ids() {
        let tracker = ContextTracker::new(10);
        tracker.record(sample_context(&tracker, "install", ErrorKind::ActionTimeout));
        tracker.record(sample_context(&tracker, "install", ErrorKind::ProviderNotFound));
        let stats = tracker.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_action.get("install"), Some(&2));
        assert_eq!(stats.recoverable, 2);
        assert_eq!(stats.recent.len(), 2);
    }

    #[test]
    fn clear_empties_both_the_map_and_eviction_order() {
        let tracker = ContextTracker::new(10);
        tracker.record(sample_context(&tracker, "install", ErrorKind::ActionTimeout));
        tracker.clear();
        assert_eq!(tracker.list().len(), 0);
        assert_eq!(tracker.stats().total, 0);
    }

    #[test]
    fn stack_trace_is_truncated_to_ten_frames() {
        let tracker = ContextTracker::new(10);
        let error = SaiError::new(ErrorKind::ActionFailed, "boom");
        let frames: Vec<StackFrame> = (0..15).map(|i| StackFrame { function: format!("f{i}"), file: "main.rs".to_string(), line: i, package: "sai".to_string() }).collect();
        let context = ErrorContext::from_error(tracker.next_id(), "install", "nginx", "apt", &error, frames, SystemInfo::capture(&[]), vec![], HashMap::new(), vec![], Duration::ZERO);
        assert_eq!(context.stack_trace.len(), 10);
    }
}
