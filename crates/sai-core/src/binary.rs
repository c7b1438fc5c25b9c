//! Pre-built-binary alternative-installation record.

use serde::{Deserialize, Serialize};

use crate::source::CustomCommands;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[serde(rename = "tar.gz")]
    TarGz,
    Tgz,
    #[serde(rename = "tar.bz2")]
    TarBz2,
    Zip,
}

impl ArchiveFormat {
    /// Infer from a URL suffix, matching the source-record extraction rule.
    pub fn from_url_suffix(url: &str) -> Option<Self> {
        if url.ends_with(".tar.gz") {
            Some(ArchiveFormat::TarGz)
        } else if url.ends_with(".tgz") {
            Some(ArchiveFormat::Tgz)
        } else if url.ends_with(".tar.bz2") {
            Some(ArchiveFormat::TarBz2)
        } else if url.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }

    pub fn extract_command(self, archive_path: &str, dest: &str) -> String {
        match self {
            ArchiveFormat::TarGz | ArchiveFormat::Tgz => {
                format!("tar -xzf {} -C {}", archive_path, dest)
            }
            ArchiveFormat::TarBz2 => format!("tar -xjf {} -C {}", archive_path, dest),
            ArchiveFormat::Zip => format!("unzip {} -d {}", archive_path, dest),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub format: Option<ArchiveFormat>,
    pub strip_prefix: Option<String>,
    pub extract_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryRecord {
    pub name: String,
    /// May contain `{{os}}`/`{{arch}}` placeholders resolved from the host
    /// platform at render time.
    pub url: String,
    pub version: String,
    pub architecture: Option<String>,
    pub platform: Option<String>,
    pub checksum: Option<String>,
    pub install_path: Option<String>,
    pub executable: Option<String>,
    pub permissions: Option<String>,
    pub archive: Option<Archive>,
    pub custom_commands: Option<CustomCommands>,
}

impl BinaryRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            version: version.into(),
            architecture: None,
            platform: None,
            checksum: None,
            install_path: None,
            executable: None,
            permissions: None,
            archive: None,
            custom_commands: None,
        }
    }

    pub fn with_archive(mut self, archive: Archive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn effective_permissions(&self) -> &str {
        self.permissions.as_deref().unwrap_or("755")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_format_inferred_from_known_suffixes() {
        assert_eq!(ArchiveFormat::from_url_suffix("https://x/y.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_url_suffix("https://x/y.tgz"), Some(ArchiveFormat::Tgz));
        assert_eq!(ArchiveFormat::from_url_suffix("https://x/y.tar.bz2"), Some(ArchiveFormat::TarBz2));
        assert_eq!(ArchiveFormat::from_url_suffix("https://x/y.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_url_suffix("https://x/y.git"), None);
    }

    #[test]
    fn extract_command_matches_format() {
        assert_eq!(
            ArchiveFormat::TarGz.extract_command("/tmp/a.tar.gz", "/opt/app"),
            "tar -xzf /tmp/a.tar.gz -C /opt/app"
        );
        assert_eq!(
            ArchiveFormat::Zip.extract_command("/tmp/a.zip", "/opt/app"),
            "unzip /tmp/a.zip -d /opt/app"
        );
    }

    #[test]
    fn default_permissions_is_755() {
        let binary = BinaryRecord::new("app", "https://x/{{os}}/{{arch}}/app", "1.0");
        assert_eq!(binary.effective_permissions(), "755");
    }
}
