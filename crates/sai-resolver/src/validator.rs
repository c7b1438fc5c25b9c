//! Resolution validator: classifies an action's template as
//! valid/resolvable/executable without running anything.

use sai_template::render::render;
use sai_template::{RenderContext, TemplateErrorKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub valid: bool,
    pub resolvable: bool,
    pub can_execute: bool,
    pub unresolved_variables: Vec<String>,
    pub missing_resources: Vec<String>,
    pub errors: Vec<String>,
}

/// Render `template` against `ctx` with safety mode on and classify the
/// outcome per spec.md §4.2.
pub fn validate(template: &str, ctx: &RenderContext) -> ResolutionReport {
    match render(template, ctx, true) {
        Ok(_) => ResolutionReport {
            valid: true,
            resolvable: true,
            can_execute: true,
            ..Default::default()
        },
        Err(err) => match err.kind {
            TemplateErrorKind::UnresolvedVariables => ResolutionReport {
                valid: true,
                resolvable: false,
                can_execute: false,
                unresolved_variables: err.unresolved_tokens,
                ..Default::default()
            },
            TemplateErrorKind::ResourceValidation => ResolutionReport {
                valid: true,
                resolvable: true,
                can_execute: false,
                missing_resources: err.missing_resources,
                ..Default::default()
            },
            TemplateErrorKind::FunctionError => ResolutionReport {
                valid: false,
                resolvable: false,
                can_execute: false,
                errors: vec![err.message],
                ..Default::default()
            },
            TemplateErrorKind::NoValue => ResolutionReport {
                valid: true,
                resolvable: true,
                can_execute: false,
                errors: vec![err.message],
                ..Default::default()
            },
        },
    }
}
