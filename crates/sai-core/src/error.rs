//! Typed error taxonomy for the sai execution core.
//!
//! Errors are classified by [`ErrorKind`] rather than by Rust type: every
//! operational failure in the engine is represented as a single [`SaiError`]
//! struct carrying a kind, a message, an optional chained cause, a free-form
//! context map, actionable suggestions and a `recoverable` flag. This mirrors
//! how the rest of the pipeline (recovery dispatcher, context tracker) wants
//! to inspect errors generically instead of matching on dozens of variants.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result alias used throughout the sai crates.
pub type Result<T> = std::result::Result<T, SaiError>;

/// Closed taxonomy of error kinds, grouped by subsystem (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    // Provider
    ProviderNotFound,
    ProviderUnavailable,
    ProviderInvalid,
    ProviderLoadFailed,
    // Saidata
    SaidataNotFound,
    SaidataInvalid,
    SaidataLoadFailed,
    SaidataValidation,
    // Action
    ActionNotSupported,
    ActionFailed,
    ActionTimeout,
    ActionCancelled,
    ActionValidation,
    // Command
    CommandFailed,
    CommandTimeout,
    CommandNotFound,
    CommandPermission,
    // Resource
    ResourceMissing,
    ResourceInvalid,
    ResourcePermission,
    ResourceValidation,
    // Configuration
    ConfigInvalid,
    ConfigNotFound,
    ConfigLoadFailed,
    // Repository
    RepositoryNotFound,
    RepositoryInvalid,
    RepositorySync,
    RepositoryAccess,
    // Template
    TemplateInvalid,
    TemplateRender,
    TemplateVariable,
    // System
    SystemRequirement,
    SystemPermission,
    SystemUnsupported,
    // Network
    NetworkTimeout,
    NetworkUnavailable,
    NetworkPermission,
    // Catch-all
    Internal,
    Unknown,
}

impl ErrorKind {
    /// Default recoverability for a kind, per spec.md §7.
    ///
    /// `recoverable=true` for: provider_not_found, provider_unavailable,
    /// saidata_not_found, action_timeout, network_timeout,
    /// network_unavailable, resource_missing, config_not_found. All others
    /// default to `false`.
    pub fn default_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::ProviderNotFound
                | ErrorKind::ProviderUnavailable
                | ErrorKind::SaidataNotFound
                | ErrorKind::ActionTimeout
                | ErrorKind::NetworkTimeout
                | ErrorKind::NetworkUnavailable
                | ErrorKind::ResourceMissing
                | ErrorKind::ConfigNotFound
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ProviderNotFound => "provider_not_found",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::ProviderInvalid => "provider_invalid",
            ErrorKind::ProviderLoadFailed => "provider_load_failed",
            ErrorKind::SaidataNotFound => "saidata_not_found",
            ErrorKind::SaidataInvalid => "saidata_invalid",
            ErrorKind::SaidataLoadFailed => "saidata_load_failed",
            ErrorKind::SaidataValidation => "saidata_validation",
            ErrorKind::ActionNotSupported => "action_not_supported",
            ErrorKind::ActionFailed => "action_failed",
            ErrorKind::ActionTimeout => "action_timeout",
            ErrorKind::ActionCancelled => "action_cancelled",
            ErrorKind::ActionValidation => "action_validation",
            ErrorKind::CommandFailed => "command_failed",
            ErrorKind::CommandTimeout => "command_timeout",
            ErrorKind::CommandNotFound => "command_not_found",
            ErrorKind::CommandPermission => "command_permission",
            ErrorKind::ResourceMissing => "resource_missing",
            ErrorKind::ResourceInvalid => "resource_invalid",
            ErrorKind::ResourcePermission => "resource_permission",
            ErrorKind::ResourceValidation => "resource_validation",
            ErrorKind::ConfigInvalid => "config_invalid",
            ErrorKind::ConfigNotFound => "config_not_found",
            ErrorKind::ConfigLoadFailed => "config_load_failed",
            ErrorKind::RepositoryNotFound => "repository_not_found",
            ErrorKind::RepositoryInvalid => "repository_invalid",
            ErrorKind::RepositorySync => "repository_sync",
            ErrorKind::RepositoryAccess => "repository_access",
            ErrorKind::TemplateInvalid => "template_invalid",
            ErrorKind::TemplateRender => "template_render",
            ErrorKind::TemplateVariable => "template_variable",
            ErrorKind::SystemRequirement => "system_requirement",
            ErrorKind::SystemPermission => "system_permission",
            ErrorKind::SystemUnsupported => "system_unsupported",
            ErrorKind::NetworkTimeout => "network_timeout",
            ErrorKind::NetworkUnavailable => "network_unavailable",
            ErrorKind::NetworkPermission => "network_permission",
            ErrorKind::Internal => "internal",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The engine's single error type. See module docs for the rationale behind
/// a flat struct rather than one enum variant per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Box<SaiError>>,
    #[serde(default)]
    pub context: HashMap<String, String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub recoverable: bool,
}

impl SaiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let recoverable = kind.default_recoverable();
        Self {
            kind,
            message: message.into(),
            source: None,
            context: HashMap::new(),
            suggestions: Vec::new(),
            recoverable,
        }
    }

    pub fn with_source(mut self, source: SaiError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// Walk the `source` chain and return the root cause.
    pub fn root_cause(&self) -> &SaiError {
        match &self.source {
            Some(inner) => inner.root_cause(),
            None => self,
        }
    }
}

impl fmt::Display for SaiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SaiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for SaiError {
    fn from(err: std::io::Error) -> Self {
        SaiError::new(ErrorKind::Internal, err.to_string())
    }
}

#[macro_export]
macro_rules! provider_not_found {
    ($name:expr) => {
        $crate::error::SaiError::new(
            $crate::error::ErrorKind::ProviderNotFound,
            format!("provider '{}' not found", $name),
        )
    };
}

#[macro_export]
macro_rules! saidata_not_found {
    ($name:expr) => {
        $crate::error::SaiError::new(
            $crate::error::ErrorKind::SaidataNotFound,
            format!("saidata for '{}' not found", $name),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_recoverable_matches_spec_list() {
        assert!(ErrorKind::ProviderNotFound.default_recoverable());
        assert!(ErrorKind::ActionTimeout.default_recoverable());
        assert!(!ErrorKind::ActionFailed.default_recoverable());
        assert!(!ErrorKind::TemplateRender.default_recoverable());
    }

    #[test]
    fn display_includes_kind_and_chained_source() {
        let inner = SaiError::new(ErrorKind::NetworkTimeout, "connect timed out");
        let outer = SaiError::new(ErrorKind::ActionFailed, "install failed").with_source(inner);
        let rendered = outer.to_string();
        assert!(rendered.contains("action_failed"));
        assert!(rendered.contains("network_timeout"));
    }

    #[test]
    fn root_cause_walks_chain() {
        let root = SaiError::new(ErrorKind::NetworkUnavailable, "no route to host");
        let mid = SaiError::new(ErrorKind::NetworkTimeout, "timed out").with_source(root.clone());
        let top = SaiError::new(ErrorKind::ActionFailed, "install failed").with_source(mid);
        assert_eq!(top.root_cause().kind, ErrorKind::NetworkUnavailable);
    }

    #[test]
    fn builder_sets_context_and_suggestions() {
        let err = SaiError::new(ErrorKind::ResourceMissing, "missing dir")
            .with_context("path", "/opt/nginx")
            .with_suggestion("create the directory first");
        assert_eq!(err.context.get("path").unwrap(), "/opt/nginx");
        assert_eq!(err.suggestions.len(), 1);
    }
}
