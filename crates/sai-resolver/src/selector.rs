//! Provider selection: spec.md §4.2 steps 1-4.

use sai_core::platform::Platform;
use sai_core::provider::ProviderData;
use sai_core::{ErrorKind, SaiError};

use crate::availability::AvailabilityCache;
use crate::registry::ProviderRegistry;

/// Select the best provider for `(action, preferred)` against `platform`.
///
/// 1. Providers defining `action`.
/// 2. ...whose platform matches the host.
/// 3. ...whose executable is discoverable on PATH.
/// 4. `preferred` if still in the set, else highest priority, ties broken
///    by name.
pub fn select_provider<'a>(
    registry: &'a ProviderRegistry,
    availability: &AvailabilityCache,
    platform: &Platform,
    action: &str,
    preferred: Option<&str>,
) -> Result<&'a ProviderData, SaiError> {
    let os = platform.os.to_string();

    let candidates: Vec<&ProviderData> = registry
        .for_action(action)
        .into_iter()
        .filter(|p| p.provider.supports_platform(&os))
        .filter(|p| availability.is_available(&p.provider.executable))
        .collect();

    if candidates.is_empty() {
        return Err(SaiError::new(ErrorKind::ProviderNotFound, format!("no available provider supports action '{}'", action)));
    }

    if let Some(name) = preferred {
        if let Some(found) = candidates.iter().find(|p| p.provider.name == name) {
            return Ok(found);
        }
    }

    let mut ranked = candidates;
    ranked.sort_by(|a, b| b.provider.priority.cmp(&a.provider.priority).then_with(|| a.provider.name.cmp(&b.provider.name)));
    Ok(ranked[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::platform::{Architecture, OperatingSystem};
    use sai_core::provider::{Action, ProviderMeta};

    fn linux() -> Platform {
        Platform { os: OperatingSystem::Linux, arch: Architecture::X86_64 }
    }

    fn registry_with_echo_providers() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderData::new("1.0", ProviderMeta::new("apt", "package-manager", "echo").with_priority(50)).with_action("install", Action::new("install")));
        registry.register(ProviderData::new("1.0", ProviderMeta::new("snap", "package-manager", "echo").with_priority(80)).with_action("install", Action::new("install")));
        registry
    }

    #[test]
    fn picks_highest_priority_when_no_preference() {
        let registry = registry_with_echo_providers();
        let availability = AvailabilityCache::new();
        let chosen = select_provider(&registry, &availability, &linux(), "install", None).unwrap();
        assert_eq!(chosen.provider.name, "snap");
    }

    #[test]
    fn honors_preferred_if_still_a_candidate() {
        let registry = registry_with_echo_providers();
        let availability = AvailabilityCache::new();
        let chosen = select_provider(&registry, &availability, &linux(), "install", Some("apt")).unwrap();
        assert_eq!(chosen.provider.name, "apt");
    }

    #[test]
    fn errors_when_no_provider_matches_platform() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderData::new("1.0", ProviderMeta::new("winget", "package-manager", "echo").with_platforms(vec!["windows".to_string()])).with_action("install", Action::new("install")));
        let availability = AvailabilityCache::new();
        let result = select_provider(&registry, &availability, &linux(), "install", None);
        assert!(result.is_err());
    }

    #[test]
    fn filters_out_providers_whose_executable_is_unavailable() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderData::new("1.0", ProviderMeta::new("ghost", "package-manager", "definitely-not-a-real-binary-abc123")).with_action("install", Action::new("install")));
        let availability = AvailabilityCache::new();
        let result = select_provider(&registry, &availability, &linux(), "install", None);
        assert!(result.is_err());
    }
}
