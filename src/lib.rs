//! Declarative software-action execution engine.
//!
//! This crate is the facade over five lower-level crates: `sai-core` (data
//! model and error taxonomy), `sai-template` (the rendering pipeline),
//! `sai-resolver` (provider selection and resolution validation),
//! `sai-failsafe` (circuit breaker, retry, recovery, degradation) and
//! `sai-context` (post-mortem error tracking). [`engine::SaiEngine`] is the
//! single entry point a host embeds.

pub mod command_runner;
pub mod engine;
pub mod interfaces;
pub mod logging;
pub mod result;

pub use command_runner::{FsResourceCreator, ProcessCommandRunner};
pub use engine::{SaiEngine, SaiEngineBuilder};
pub use interfaces::{DefaultProviderManager, FsSaidataManager, Logger, ProviderManager, SaidataManager, TracingLogger};
pub use logging::init_tracing;
pub use result::{ExecutionContext, ExecutionOptions, ExecutionResult};

pub use sai_core::{ErrorKind, SaiError};
pub use sai_core::config::EngineConfig;
pub use sai_core::platform::Platform;
pub use sai_core::provider::{Action, ProviderData, ProviderMeta};
pub use sai_core::saidata::Saidata;
pub use sai_core::resource::{ResourceValidator, SystemResourceValidator};
pub use sai_core::defaults::{DefaultsGenerator, StandardDefaultsGenerator};
pub use sai_failsafe::circuit_breaker::CircuitBreakerConfig;
pub use sai_resolver::{ProviderRegistry, AvailabilityCache};
