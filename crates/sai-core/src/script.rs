//! One-shot script-installer alternative-installation record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::source::CustomCommands;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpreter {
    Bash,
    Sh,
    Python,
    Other(String),
}

impl Interpreter {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "bash" => Interpreter::Bash,
            "sh" => Interpreter::Sh,
            "python" | "python3" => Interpreter::Python,
            other => Interpreter::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Interpreter::Bash => "bash",
            Interpreter::Sh => "sh",
            Interpreter::Python => "python",
            Interpreter::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub name: String,
    pub url: String,
    pub version: String,
    pub interpreter: Interpreter,
    pub checksum: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    pub working_dir: Option<String>,
    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: Option<u64>,
    pub custom_commands: Option<CustomCommands>,
}

impl ScriptRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>, version: impl Into<String>, interpreter: Interpreter) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            version: version.into(),
            interpreter,
            checksum: None,
            arguments: Vec::new(),
            environment: HashMap::new(),
            working_dir: None,
            timeout_seconds: None,
            custom_commands: None,
        }
    }

    /// Render `environment` as `export K='V' && export K2='V2' && …` with
    /// keys sorted lexicographically for deterministic output.
    pub fn environment_vars_joined(&self) -> String {
        let mut keys: Vec<&String> = self.environment.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|k| format!("export {}='{}'", k, self.environment[k]))
            .collect::<Vec<_>>()
            .join(" && ")
    }

    pub fn arguments_joined(&self) -> String {
        self.arguments.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_vars_joined_sorts_keys() {
        let mut record = ScriptRecord::new("x", "https://x/install.sh", "1.0", Interpreter::Bash);
        record.environment.insert("ZKEY".to_string(), "z".to_string());
        record.environment.insert("AKEY".to_string(), "a".to_string());
        assert_eq!(record.environment_vars_joined(), "export AKEY='a' && export ZKEY='z'");
    }

    #[test]
    fn interpreter_parse_falls_back_to_other() {
        assert_eq!(Interpreter::parse("ruby"), Interpreter::Other("ruby".to_string()));
        assert_eq!(Interpreter::parse("bash"), Interpreter::Bash);
    }
}
