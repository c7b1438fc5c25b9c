//! Source-build alternative-installation record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    Autotools,
    Cmake,
    Meson,
    Make,
    Ninja,
    Custom,
}

impl BuildSystem {
    /// Parse the loose aliasing spec.md allows: `configure`, `automake`,
    /// `autoconf` are synonyms for `autotools`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "autotools" | "configure" | "automake" | "autoconf" | "make" => {
                if raw.eq_ignore_ascii_case("make") {
                    Some(BuildSystem::Make)
                } else {
                    Some(BuildSystem::Autotools)
                }
            }
            "cmake" => Some(BuildSystem::Cmake),
            "meson" => Some(BuildSystem::Meson),
            "ninja" => Some(BuildSystem::Ninja),
            "custom" => Some(BuildSystem::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomCommands {
    pub download: Option<String>,
    pub extract: Option<String>,
    pub configure: Option<String>,
    pub build: Option<String>,
    pub install: Option<String>,
    pub uninstall: Option<String>,
    pub validation: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    pub url: String,
    pub version: String,
    pub build_system: BuildSystem,
    pub build_dir: Option<String>,
    pub source_dir: Option<String>,
    pub install_prefix: Option<String>,
    #[serde(default)]
    pub configure_args: Vec<String>,
    #[serde(default)]
    pub build_args: Vec<String>,
    #[serde(default)]
    pub install_args: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    pub checksum: Option<String>,
    pub custom_commands: Option<CustomCommands>,
}

impl SourceRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>, version: impl Into<String>, build_system: BuildSystem) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            version: version.into(),
            build_system,
            build_dir: None,
            source_dir: None,
            install_prefix: None,
            configure_args: Vec::new(),
            build_args: Vec::new(),
            install_args: Vec::new(),
            prerequisites: Vec::new(),
            environment: HashMap::new(),
            checksum: None,
            custom_commands: None,
        }
    }

    pub fn with_install_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.install_prefix = Some(prefix.into());
        self
    }

    pub fn with_custom_commands(mut self, commands: CustomCommands) -> Self {
        self.custom_commands = Some(commands);
        self
    }

    /// The source directory to `cd` into when deriving commands: explicit
    /// `source_dir`, else `build_dir`, else `.`.
    pub fn effective_source_dir(&self) -> &str {
        self.source_dir
            .as_deref()
            .or(self.build_dir.as_deref())
            .unwrap_or(".")
    }

    /// Conventional extraction directory when neither `source_dir` nor
    /// `build_dir` is set: `/tmp/sai-build-<software>/<archive-basename>`,
    /// where the basename is the URL's final path segment with a known
    /// archive extension stripped.
    pub fn default_source_dir(&self, software: &str) -> String {
        format!("/tmp/sai-build-{}/{}", software, archive_basename(&self.url))
    }

    /// Source directory honoring the above convention when neither
    /// `source_dir` nor `build_dir` is explicitly set.
    pub fn resolved_source_dir(&self, software: &str) -> String {
        if self.source_dir.is_some() || self.build_dir.is_some() {
            self.effective_source_dir().to_string()
        } else {
            self.default_source_dir(software)
        }
    }

    /// The install prefix to substitute into derived commands, defaulting
    /// to `/usr/local` when unset.
    pub fn effective_install_prefix(&self) -> &str {
        self.install_prefix.as_deref().unwrap_or("/usr/local")
    }
}

fn archive_basename(url: &str) -> String {
    let file_name = url.rsplit('/').next().unwrap_or(url);
    for ext in [".tar.gz", ".tgz", ".tar.bz2", ".zip", ".git"] {
        if let Some(stripped) = file_name.strip_suffix(ext) {
            return stripped.to_string();
        }
    }
    file_name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_autotools_aliases() {
        for alias in ["autotools", "configure", "automake", "autoconf"] {
            assert_eq!(BuildSystem::parse(alias), Some(BuildSystem::Autotools));
        }
        assert_eq!(BuildSystem::parse("make"), Some(BuildSystem::Make));
    }

    #[test]
    fn parse_rejects_unknown_build_system() {
        assert_eq!(BuildSystem::parse("bazel"), None);
    }

    #[test]
    fn effective_source_dir_falls_back_to_build_dir_then_dot() {
        let mut record = SourceRecord::new("nginx", "https://example.com/nginx.tar.gz", "1.0", BuildSystem::Cmake);
        assert_eq!(record.effective_source_dir(), ".");
        record.build_dir = Some("build".to_string());
        assert_eq!(record.effective_source_dir(), "build");
        record.source_dir = Some("src".to_string());
        assert_eq!(record.effective_source_dir(), "src");
    }

    #[test]
    fn default_source_dir_strips_archive_extension() {
        let record = SourceRecord::new("nginx-src", "https://nginx.org/download/nginx-1.20.1.tar.gz", "1.20.1", BuildSystem::Cmake);
        assert_eq!(record.default_source_dir("nginx"), "/tmp/sai-build-nginx/nginx-1.20.1");
    }

    #[test]
    fn resolved_source_dir_prefers_explicit_source_dir() {
        let mut record = SourceRecord::new("nginx-src", "https://nginx.org/download/nginx-1.20.1.tar.gz", "1.20.1", BuildSystem::Cmake);
        assert_eq!(record.resolved_source_dir("nginx"), "/tmp/sai-build-nginx/nginx-1.20.1");
        record.source_dir = Some("/custom/src".to_string());
        assert_eq!(record.resolved_source_dir("nginx"), "/custom/src");
    }
}
