//! Typed render failures, plus a snapshot of the render context for
//! diagnostics.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateErrorKind {
    UnresolvedVariables,
    NoValue,
    FunctionError,
    ResourceValidation,
}

#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub software: String,
    pub provider: String,
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Error)]
#[error("{kind:?}: {message} (template: {template})")]
pub struct TemplateResolutionError {
    pub kind: TemplateErrorKind,
    pub message: String,
    pub template: String,
    pub context_snapshot: ContextSnapshot,
    /// Populated for `UnresolvedVariables`.
    pub unresolved_tokens: Vec<String>,
    /// Populated for `ResourceValidation`.
    pub missing_resources: Vec<String>,
}

impl TemplateResolutionError {
    pub fn new(kind: TemplateErrorKind, message: impl Into<String>, template: impl Into<String>, context_snapshot: ContextSnapshot) -> Self {
        Self {
            kind,
            message: message.into(),
            template: template.into(),
            context_snapshot,
            unresolved_tokens: Vec::new(),
            missing_resources: Vec::new(),
        }
    }

    pub fn with_unresolved_tokens(mut self, tokens: Vec<String>) -> Self {
        self.unresolved_tokens = tokens;
        self
    }

    pub fn with_missing_resources(mut self, resources: Vec<String>) -> Self {
        self.missing_resources = resources;
        self
    }
}

impl From<TemplateResolutionError> for sai_core::SaiError {
    fn from(err: TemplateResolutionError) -> Self {
        use sai_core::ErrorKind;
        let kind = match err.kind {
            TemplateErrorKind::UnresolvedVariables => ErrorKind::TemplateVariable,
            TemplateErrorKind::NoValue => ErrorKind::TemplateVariable,
            TemplateErrorKind::FunctionError => ErrorKind::TemplateRender,
            TemplateErrorKind::ResourceValidation => ErrorKind::ResourceValidation,
        };
        sai_core::SaiError::new(kind, err.message.clone())
            .with_context("template", err.template.clone())
            .with_context("software", err.context_snapshot.software.clone())
    }
}
