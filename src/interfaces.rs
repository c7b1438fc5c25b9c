//! Host-provided interfaces the engine consumes: provider lookup, saidata
//! loading, and structured logging. `ResourceValidator` and
//! `DefaultsGenerator` already live in `sai-core`; these three complete the
//! external-interfaces list.

use std::collections::HashMap;
use std::path::PathBuf;

use sai_core::platform::Platform;
use sai_core::provider::ProviderData;
use sai_core::saidata::{Package, Saidata};
use sai_core::{ErrorKind, SaiError};
use sai_resolver::{select_provider, AvailabilityCache, ProviderRegistry};
use tracing::{debug, error, info, warn};

/// Read-side view over the provider registry: lookup and selection, no
/// mutation.
pub trait ProviderManager: Send + Sync {
    fn get_providers_for_action(&self, action: &str) -> Vec<ProviderData>;
    fn is_provider_available(&self, name: &str) -> bool;
    fn get_provider(&self, name: &str) -> Option<ProviderData>;
    fn get_all_providers(&self) -> Vec<ProviderData>;
    fn select_provider(&self, software: &str, action: &str, preferred: Option<&str>) -> Result<ProviderData, SaiError>;
}

/// `ProviderManager` backed by a `sai-resolver` registry and availability
/// cache against the current platform.
pub struct DefaultProviderManager {
    registry: ProviderRegistry,
    availability: AvailabilityCache,
    platform: Platform,
}

impl DefaultProviderManager {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry, availability: AvailabilityCache::new(), platform: Platform::current() }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

impl ProviderManager for DefaultProviderManager {
    fn get_providers_for_action(&self, action: &str) -> Vec<ProviderData> {
        self.registry.for_action(action).into_iter().cloned().collect()
    }

    fn is_provider_available(&self, name: &str) -> bool {
        match self.registry.get(name) {
            Some(data) => self.availability.is_available(&data.provider.executable),
            None => false,
        }
    }

    fn get_provider(&self, name: &str) -> Option<ProviderData> {
        self.registry.get(name).cloned()
    }

    fn get_all_providers(&self) -> Vec<ProviderData> {
        self.registry.all().into_iter().cloned().collect()
    }

    fn select_provider(&self, _software: &str, action: &str, preferred: Option<&str>) -> Result<ProviderData, SaiError> {
        select_provider(&self.registry, &self.availability, &self.platform, action, preferred).map(|p| p.clone())
    }
}

/// Load side of saidata access: fetch a record, or synthesize a minimal one
/// when none exists (spec.md scenario 6: graceful degradation).
pub trait SaidataManager: Send + Sync {
    fn load(&self, software: &str) -> Result<Saidata, SaiError>;
    fn generate_defaults(&self, software: &str) -> Saidata;
}

/// `SaidataManager` reading one JSON record per software name from a
/// directory (`<dir>/<software>.json`).
pub struct FsSaidataManager {
    dir: PathBuf,
}

impl FsSaidataManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SaidataManager for FsSaidataManager {
    fn load(&self, software: &str) -> Result<Saidata, SaiError> {
        let path = self.dir.join(format!("{software}.json"));
        let contents = std::fs::read_to_string(&path).map_err(|_| SaiError::new(ErrorKind::SaidataNotFound, format!("no saidata record for '{software}'")).with_context("path", path.display().to_string()))?;
        serde_json::from_str(&contents).map_err(|e| SaiError::new(ErrorKind::SaidataInvalid, format!("failed to parse saidata for '{software}': {e}")))
    }

    fn generate_defaults(&self, software: &str) -> Saidata {
        Saidata::new(software).with_package(Package::new(software)).generated()
    }
}

/// Structured `debug/info/warn/error` logging, each with an open field map.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str, fields: &HashMap<String, String>);
    fn info(&self, message: &str, fields: &HashMap<String, String>);
    fn warn(&self, message: &str, fields: &HashMap<String, String>);
    fn error(&self, message: &str, fields: &HashMap<String, String>);
}

/// `Logger` backed by `tracing`, one event per call with the field map
/// attached as a single `fields` debug value (the field set is open-ended,
/// unlike `tracing`'s own compile-time fields).
#[derive(Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str, fields: &HashMap<String, String>) {
        debug!(fields = ?fields, "{}", message);
    }

    fn info(&self, message: &str, fields: &HashMap<String, String>) {
        info!(fields = ?fields, "{}", message);
    }

    fn warn(&self, message: &str, fields: &HashMap<String, String>) {
        warn!(fields = ?fields, "{}", message);
    }

    fn error(&self, message: &str, fields: &HashMap<String, String>) {
        error!(fields = ?fields, "{}", message);
    }
}
