//! Provider data model: the registry-owned description of a system-level
//! tool capable of executing actions against saidata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMeta {
    pub name: String,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub executable: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl ProviderMeta {
    pub fn new(name: impl Into<String>, provider_type: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            provider_type: provider_type.into(),
            platforms: Vec::new(),
            executable: executable.into(),
            priority: 0,
            capabilities: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn supports_platform(&self, platform: &str) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|p| p == platform)
    }
}

/// A single executable operation a provider exposes for a piece of
/// software (install, start, stop, …).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub description: Option<String>,
    pub template: Option<String>,
    pub timeout: Option<u64>,
    #[serde(default)]
    pub requires_root: bool,
    pub validation: Option<String>,
    pub rollback: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    pub steps: Option<Vec<String>>,
}

impl Action {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Default::default()
        }
    }

    pub fn with_steps(steps: Vec<String>) -> Self {
        Self {
            steps: Some(steps),
            ..Default::default()
        }
    }

    pub fn requires_root(mut self) -> Self {
        self.requires_root = true;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// `steps`, when present, replaces `template` for rendering purposes.
    pub fn render_units(&self) -> Vec<&str> {
        if let Some(steps) = &self.steps {
            steps.iter().map(|s| s.as_str()).collect()
        } else {
            self.template.as_deref().into_iter().collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderData {
    pub version: String,
    pub provider: ProviderMeta,
    #[serde(default)]
    pub actions: HashMap<String, Action>,
}

impl ProviderData {
    pub fn new(version: impl Into<String>, provider: ProviderMeta) -> Self {
        Self {
            version: version.into(),
            provider,
            actions: HashMap::new(),
        }
    }

    pub fn with_action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.insert(name.into(), action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_units_prefers_steps_over_template() {
        let mut action = Action::new("echo one");
        action.steps = Some(vec!["echo a".to_string(), "echo b".to_string()]);
        assert_eq!(action.render_units(), vec!["echo a", "echo b"]);
    }

    #[test]
    fn render_units_falls_back_to_template() {
        let action = Action::new("echo one");
        assert_eq!(action.render_units(), vec!["echo one"]);
    }

    #[test]
    fn supports_platform_empty_means_universal() {
        let provider = ProviderMeta::new("apt", "package-manager", "apt-get");
        assert!(provider.supports_platform("linux"));
        let restricted = provider.with_platforms(vec!["linux".to_string()]);
        assert!(restricted.supports_platform("linux"));
        assert!(!restricted.supports_platform("windows"));
    }
}
