//! Execution context tracker: records an `ErrorContext` per failure (or,
//! opt-in, per successful run) for post-mortem inspection, plus a debug log
//! sink that mirrors those records to disk.

pub mod debug_log;
pub mod tracker;

pub use debug_log::DebugLogSink;
pub use tracker::{CommandRecord, ContextTracker, ErrorContext, ErrorStats, ExecutionStep, StackFrame, SystemInfo};
