//! `ResourceValidator`: the host-provided predicate interface the template
//! engine's `*_exists` helpers and the safety pass delegate to.

use std::path::Path;

use tracing::debug;

/// Queried by name/path, never mutates host state.
pub trait ResourceValidator: Send + Sync {
    fn file_exists(&self, path: &str) -> bool;
    fn directory_exists(&self, path: &str) -> bool;
    fn command_exists(&self, name: &str) -> bool;
    fn service_exists(&self, name: &str) -> bool;
}

/// Default `ResourceValidator` probing the real host: `stat()` for files
/// and directories, `which` (or absolute-path recognition) for commands,
/// and the platform's service manager for services.
pub struct SystemResourceValidator {
    platform: crate::platform::Platform,
}

impl SystemResourceValidator {
    pub fn new() -> Self {
        Self {
            platform: crate::platform::Platform::current(),
        }
    }
}

impl Default for SystemResourceValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceValidator for SystemResourceValidator {
    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn directory_exists(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn command_exists(&self, name: &str) -> bool {
        if Path::new(name).is_absolute() {
            return Path::new(name).exists();
        }
        which::which(name).is_ok()
    }

    fn service_exists(&self, name: &str) -> bool {
        use crate::platform::OperatingSystem;
        match self.platform.os {
            OperatingSystem::Linux => {
                Path::new("/etc/init.d").join(name).exists()
                    || Path::new("/etc/init").join(format!("{}.conf", name)).exists()
                    || systemd_unit_exists(name)
            }
            OperatingSystem::MacOS => launchd_plist_exists(name),
            OperatingSystem::Windows => {
                debug!(service = name, "service existence probing on windows delegates to sc query at the host boundary");
                false
            }
            _ => false,
        }
    }
}

fn systemd_unit_exists(name: &str) -> bool {
    let candidates = [
        format!("/etc/systemd/system/{}.service", name),
        format!("/lib/systemd/system/{}.service", name),
        format!("/usr/lib/systemd/system/{}.service", name),
    ];
    candidates.iter().any(|c| Path::new(c).exists())
}

fn launchd_plist_exists(name: &str) -> bool {
    let candidates = [
        format!("/Library/LaunchDaemons/{}.plist", name),
        format!("/Library/LaunchAgents/{}.plist", name),
    ];
    candidates.iter().any(|c| Path::new(c).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_exists_false_for_missing_path() {
        let validator = SystemResourceValidator::new();
        assert!(!validator.file_exists("/definitely/not/a/real/path/abc123"));
    }

    #[test]
    fn directory_exists_true_for_tmp() {
        let validator = SystemResourceValidator::new();
        assert!(validator.directory_exists(std::env::temp_dir().to_str().unwrap()));
    }

    #[test]
    fn command_exists_for_absolute_path_checks_existence_not_path() {
        let validator = SystemResourceValidator::new();
        assert!(!validator.command_exists("/definitely/not/a/real/binary/abc123"));
    }
}
