//! The provider-agnostic software description ("saidata") and its
//! sub-records, per the data model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level software description. Unique per (software-name) within one
/// invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Saidata {
    pub metadata: Metadata,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub directories: Vec<Directory>,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub sources: Vec<crate::source::SourceRecord>,
    #[serde(default)]
    pub binaries: Vec<crate::binary::BinaryRecord>,
    #[serde(default)]
    pub scripts: Vec<crate::script::ScriptRecord>,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// True when this record was synthesized by the defaults generator
    /// rather than loaded from a host source.
    #[serde(default)]
    pub is_generated: bool,
}

impl Saidata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(name),
            ..Default::default()
        }
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_provider_override(mut self, provider: impl Into<String>, config: ProviderConfig) -> Self {
        self.providers.insert(provider.into(), config);
        self
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }
}

/// The subset of `Saidata`'s array fields that a provider can override.
/// Same shape as the top level, per the "per-field override" rule in
/// spec.md §3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub directories: Vec<Directory>,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub sources: Vec<crate::source::SourceRecord>,
    #[serde(default)]
    pub binaries: Vec<crate::binary::BinaryRecord>,
    #[serde(default)]
    pub scripts: Vec<crate::script::ScriptRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub version: Option<String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub package_name: Option<String>,
    pub version: Option<String>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_name: None,
            version: None,
        }
    }

    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }

    /// The identifier actually passed to the provider: `package_name` if
    /// set, else `name`.
    pub fn effective_package_name(&self) -> &str {
        self.package_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub service_name: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_name: None,
            service_type: None,
        }
    }

    pub fn effective_service_name(&self) -> &str {
        self.service_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            file_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    pub name: String,
    pub path: String,
}

impl Directory {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub name: String,
    pub path: Option<String>,
}

impl CommandEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub port: u32,
    pub protocol: Option<String>,
    pub service: Option<String>,
}

impl Port {
    pub fn new(port: u32) -> Self {
        Self {
            port,
            protocol: None,
            service: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub tag: Option<String>,
    pub registry: Option<String>,
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            tag: None,
            registry: None,
        }
    }

    pub fn with_tag_and_registry(mut self, tag: impl Into<String>, registry: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self.registry = Some(registry.into());
        self
    }

    /// `[registry/]image[:tag]`.
    pub fn full_image(&self) -> String {
        let mut out = String::new();
        if let Some(registry) = &self.registry {
            out.push_str(registry);
            out.push('/');
        }
        out.push_str(&self.image);
        if let Some(tag) = &self.tag {
            out.push(':');
            out.push_str(tag);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_falls_back_to_name() {
        let pkg = Package::new("nginx");
        assert_eq!(pkg.effective_package_name(), "nginx");
    }

    #[test]
    fn package_uses_package_name_when_set() {
        let pkg = Package::new("nginx").with_package_name("nginx-full");
        assert_eq!(pkg.effective_package_name(), "nginx-full");
    }

    #[test]
    fn container_full_image_with_registry_and_tag() {
        let container = Container::new("web", "nginx").with_tag_and_registry("1.25", "docker.io");
        assert_eq!(container.full_image(), "docker.io/nginx:1.25");
    }

    #[test]
    fn container_full_image_bare() {
        let container = Container::new("web", "nginx");
        assert_eq!(container.full_image(), "nginx");
    }
}
