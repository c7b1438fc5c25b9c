//! `DefaultsGenerator`: platform-specific candidate-path probing for
//! config, log, data, bin, and service-unit-name defaults.

use crate::platform::{OperatingSystem, Platform};
use crate::resource::ResourceValidator;

/// Given a software name, produce canonical paths. Candidate lists are
/// probed in order; the first that exists wins, otherwise the
/// documented fallback default (the first candidate).
pub trait DefaultsGenerator: Send + Sync {
    fn default_config_path(&self, software: &str) -> String;
    fn default_log_path(&self, software: &str) -> String;
    fn default_data_dir(&self, software: &str) -> String;
    fn default_service_name(&self, software: &str) -> String;
    fn default_command_path(&self, command: &str) -> String;
}

pub struct StandardDefaultsGenerator<'a> {
    platform: Platform,
    validator: &'a dyn ResourceValidator,
}

impl<'a> StandardDefaultsGenerator<'a> {
    pub fn new(validator: &'a dyn ResourceValidator) -> Self {
        Self {
            platform: Platform::current(),
            validator,
        }
    }

    fn first_existing_or(&self, candidates: &[String], exists: impl Fn(&str) -> bool) -> String {
        candidates
            .iter()
            .find(|candidate| exists(candidate))
            .cloned()
            .unwrap_or_else(|| candidates.first().cloned().unwrap_or_default())
    }

    fn config_candidates(&self, software: &str) -> Vec<String> {
        match self.platform.os {
            OperatingSystem::Linux => vec![
                format!("/etc/{}/{}.conf", software, software),
                format!("/etc/{}.conf", software),
                format!("/etc/{}/config", software),
                format!("/etc/{}/{}.yaml", software, software),
                format!("/etc/{}/{}.yml", software, software),
            ],
            OperatingSystem::MacOS => vec![
                format!("/usr/local/etc/{}/{}.conf", software, software),
                format!("/opt/homebrew/etc/{}/{}.conf", software, software),
                format!("/etc/{}/{}.conf", software, software),
            ],
            OperatingSystem::Windows => {
                let program_data = std::env::var("PROGRAMDATA").unwrap_or_else(|_| "C:\\ProgramData".to_string());
                let title_case = title_case(software);
                vec![
                    format!("{}\\{}\\{}.conf", program_data, title_case, software),
                    format!("{}\\{}\\{}.ini", program_data, title_case, software),
                ]
            }
            _ => vec![format!("/etc/{}/{}.conf", software, software)],
        }
    }

    fn log_candidates(&self, software: &str) -> Vec<String> {
        match self.platform.os {
            OperatingSystem::Windows => {
                let program_data = std::env::var("PROGRAMDATA").unwrap_or_else(|_| "C:\\ProgramData".to_string());
                vec![format!("{}\\{}\\logs", program_data, title_case(software))]
            }
            _ => vec![format!("/var/log/{}/{}.log", software, software), format!("/var/log/{}.log", software)],
        }
    }

    fn data_candidates(&self, software: &str) -> Vec<String> {
        match self.platform.os {
            OperatingSystem::Windows => {
                let program_data = std::env::var("PROGRAMDATA").unwrap_or_else(|_| "C:\\ProgramData".to_string());
                vec![format!("{}\\{}", program_data, title_case(software))]
            }
            OperatingSystem::MacOS => vec![format!("/usr/local/var/{}", software), format!("/opt/homebrew/var/{}", software)],
            _ => vec![format!("/var/lib/{}", software)],
        }
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl<'a> DefaultsGenerator for StandardDefaultsGenerator<'a> {
    fn default_config_path(&self, software: &str) -> String {
        let candidates = self.config_candidates(software);
        self.first_existing_or(&candidates, |p| self.validator.file_exists(p))
    }

    fn default_log_path(&self, software: &str) -> String {
        let candidates = self.log_candidates(software);
        self.first_existing_or(&candidates, |p| self.validator.file_exists(p) || self.validator.directory_exists(p))
    }

    fn default_data_dir(&self, software: &str) -> String {
        let candidates = self.data_candidates(software);
        self.first_existing_or(&candidates, |p| self.validator.directory_exists(p))
    }

    fn default_service_name(&self, software: &str) -> String {
        software.to_string()
    }

    fn default_command_path(&self, command: &str) -> String {
        if self.validator.command_exists(command) {
            which::which(command)
                .ok()
                .and_then(|p| p.to_str().map(str::to_string))
                .unwrap_or_else(|| command.to_string())
        } else {
            self.platform.default_bin_dirs().first().map(|dir| format!("{}/{}", dir, command)).unwrap_or_else(|| command.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysMissing;
    impl ResourceValidator for AlwaysMissing {
        fn file_exists(&self, _: &str) -> bool {
            false
        }
        fn directory_exists(&self, _: &str) -> bool {
            false
        }
        fn command_exists(&self, _: &str) -> bool {
            false
        }
        fn service_exists(&self, _: &str) -> bool {
            false
        }
    }

    #[test]
    fn default_config_path_falls_back_to_first_candidate() {
        let validator = AlwaysMissing;
        let generator = StandardDefaultsGenerator::new(&validator);
        let path = generator.default_config_path("nginx");
        assert!(path.contains("nginx"));
    }

    #[test]
    fn default_service_name_is_software_name() {
        let validator = AlwaysMissing;
        let generator = StandardDefaultsGenerator::new(&validator);
        assert_eq!(generator.default_service_name("nginx"), "nginx");
    }

    #[test]
    fn title_case_capitalizes_first_letter_only() {
        assert_eq!(title_case("nginx"), "Nginx");
        assert_eq!(title_case(""), "");
    }
}
