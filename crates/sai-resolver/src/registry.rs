//! Provider registry: the process-start-loaded, read-only-after-init set of
//! provider records the selector chooses from.

use std::collections::HashMap;

use sai_core::provider::ProviderData;

/// Owns provider records exclusively; selection picks references from this
/// registry and never mutates it once populated.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderData>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, data: ProviderData) {
        self.providers.insert(data.provider.name.clone(), data);
    }

    pub fn get(&self, name: &str) -> Option<&ProviderData> {
        self.providers.get(name)
    }

    pub fn all(&self) -> Vec<&ProviderData> {
        self.providers.values().collect()
    }

    /// Providers that define the given action, in no particular order.
    pub fn for_action(&self, action: &str) -> Vec<&ProviderData> {
        self.providers.values().filter(|p| p.actions.contains_key(action)).collect()
    }
}
