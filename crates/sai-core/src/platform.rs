//! Platform detection used by the defaults generator and resolution
//! validator to pick OS-appropriate candidate paths and package-manager
//! hints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatingSystem {
    Linux,
    MacOS,
    Windows,
    FreeBSD,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    X86_64,
    X86,
    Aarch64,
    Arm,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: OperatingSystem,
    pub arch: Architecture,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            os: Self::current_os(),
            arch: Self::current_arch(),
        }
    }

    pub fn current_os() -> OperatingSystem {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else if cfg!(target_os = "macos") {
            OperatingSystem::MacOS
        } else if cfg!(target_os = "linux") {
            OperatingSystem::Linux
        } else if cfg!(target_os = "freebsd") {
            OperatingSystem::FreeBSD
        } else {
            OperatingSystem::Other(std::env::consts::OS.to_string())
        }
    }

    pub fn current_arch() -> Architecture {
        if cfg!(target_arch = "x86_64") {
            Architecture::X86_64
        } else if cfg!(target_arch = "x86") {
            Architecture::X86
        } else if cfg!(target_arch = "aarch64") {
            Architecture::Aarch64
        } else if cfg!(target_arch = "arm") {
            Architecture::Arm
        } else {
            Architecture::Other(std::env::consts::ARCH.to_string())
        }
    }

    /// Default binary install directories to probe, in priority order.
    /// Used by the defaults generator (spec.md §6) when saidata omits an
    /// explicit `files[]`/`directories[]` entry for a binary action.
    pub fn default_bin_dirs(&self) -> Vec<String> {
        match self.os {
            OperatingSystem::Windows => vec![
                "C:\\Program Files".to_string(),
                "C:\\ProgramData\\chocolatey\\bin".to_string(),
            ],
            OperatingSystem::MacOS => vec![
                "/opt/homebrew/bin".to_string(),
                "/usr/local/bin".to_string(),
            ],
            _ => vec!["/usr/local/bin".to_string(), "/usr/bin".to_string()],
        }
    }

    /// Default config directories to probe, in priority order.
    pub fn default_config_dirs(&self) -> Vec<String> {
        match self.os {
            OperatingSystem::Windows => vec!["C:\\ProgramData".to_string()],
            _ => vec!["/etc".to_string(), "/usr/local/etc".to_string()],
        }
    }

    pub fn executable_extension(&self) -> &'static str {
        match self.os {
            OperatingSystem::Windows => "exe",
            _ => "",
        }
    }

    pub fn archive_extension(&self) -> &'static str {
        match self.os {
            OperatingSystem::Windows => "zip",
            _ => "tar.gz",
        }
    }
}

impl std::fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatingSystem::Linux => write!(f, "linux"),
            OperatingSystem::MacOS => write!(f, "macos"),
            OperatingSystem::Windows => write!(f, "windows"),
            OperatingSystem::FreeBSD => write!(f, "freebsd"),
            OperatingSystem::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::X86 => write!(f, "x86"),
            Architecture::Aarch64 => write!(f, "aarch64"),
            Architecture::Arm => write!(f, "arm"),
            Architecture::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_detects_a_concrete_platform() {
        let platform = Platform::current();
        assert!(!matches!(platform.os, OperatingSystem::Other(_)));
        assert!(!matches!(platform.arch, Architecture::Other(_)));
    }

    #[test]
    fn default_bin_dirs_nonempty_for_every_os() {
        for os in [
            OperatingSystem::Linux,
            OperatingSystem::MacOS,
            OperatingSystem::Windows,
            OperatingSystem::FreeBSD,
        ] {
            let platform = Platform {
                os,
                arch: Architecture::X86_64,
            };
            assert!(!platform.default_bin_dirs().is_empty());
        }
    }

    #[test]
    fn display_is_os_dash_arch() {
        let platform = Platform {
            os: OperatingSystem::Linux,
            arch: Architecture::Aarch64,
        };
        assert_eq!(platform.to_string(), "linux-aarch64");
    }
}
