//! Second-phase safety validation: scans rendered output for signs that
//! rendering silently produced something unsafe to execute.

use crate::error::{ContextSnapshot, TemplateErrorKind, TemplateResolutionError};
use crate::helpers::RenderContext;

#[derive(Debug, Default, Clone, Copy)]
pub struct UsedResourceHelpers {
    pub file: bool,
    pub directory: bool,
    pub command: bool,
}

impl UsedResourceHelpers {
    fn any(&self) -> bool {
        self.file || self.directory || self.command
    }
}

const KNOWN_ERROR_PREFIXES: &[&str] = &["sai_package error:", "sai_service error:", "no saidata context available"];

pub fn validate(
    rendered: &str,
    original_template: &str,
    ctx: &RenderContext,
    used: &UsedResourceHelpers,
) -> Result<(), TemplateResolutionError> {
    // 1. residual placeholder delimiters.
    if rendered.contains("{{") || rendered.contains("}}") {
        return Err(fail(TemplateErrorKind::UnresolvedVariables, "rendered output still contains placeholder delimiters", original_template, ctx));
    }

    // 2. literal "<no value>".
    if rendered.contains("<no value>") {
        return Err(fail(TemplateErrorKind::NoValue, "rendered output contains the literal '<no value>'", original_template, ctx));
    }

    // 3. known helper error prefixes.
    for prefix in KNOWN_ERROR_PREFIXES {
        if rendered.contains(prefix) {
            return Err(fail(TemplateErrorKind::FunctionError, format!("rendered output contains a helper error marker: '{}'", prefix), original_template, ctx));
        }
    }
    if rendered.contains("no ") && rendered.contains(" found") {
        return Err(fail(TemplateErrorKind::FunctionError, "rendered output contains a 'no … found' helper error marker", original_template, ctx));
    }

    // 4. port-helper failure sentinel.
    if original_template.contains("sai_port") && contains_port_sentinel(rendered) {
        return Err(fail(TemplateErrorKind::FunctionError, "sai_port produced its -1 failure sentinel", original_template, ctx));
    }

    // 5. resource-validation heuristic: only checked when the template
    // actually asked for a resource.
    if used.any() {
        if let Some(validator) = ctx.validator {
            let missing: Vec<String> = rendered
                .split_whitespace()
                .filter(|token| looks_like_path(token))
                .filter(|token| !path_declared_in_saidata(token, ctx))
                .filter(|token| !validator.file_exists(token) && !validator.directory_exists(token))
                .map(|s| s.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(fail(TemplateErrorKind::ResourceValidation, "rendered command references resources that do not exist", original_template, ctx)
                    .with_missing_resources(missing));
            }
        }
    }

    Ok(())
}

fn looks_like_path(token: &str) -> bool {
    (token.contains('/') || token.contains('\\')) && !token.contains(' ')
}

fn path_declared_in_saidata(token: &str, ctx: &RenderContext) -> bool {
    ctx.saidata.files.iter().any(|f| f.path == token)
        || ctx.saidata.directories.iter().any(|d| d.path == token)
        || ctx.saidata.commands.iter().any(|c| c.path.as_deref() == Some(token))
}

/// True when `-1` occurs in `haystack` as the sentinel value itself, not as
/// part of a larger number like `-10` or `-123`. `-1` may be embedded in a
/// token (`http://localhost:-1/`), so this checks substrings, not only
/// whitespace-delimited tokens.
fn contains_port_sentinel(haystack: &str) -> bool {
    haystack.match_indices("-1").any(|(idx, _)| {
        let digit_before = haystack[..idx].chars().last().is_some_and(|c| c.is_ascii_digit());
        let digit_after = haystack[idx + 2..].chars().next().is_some_and(|c| c.is_ascii_digit());
        !digit_before && !digit_after
    })
}

fn fail(kind: TemplateErrorKind, message: impl Into<String>, template: &str, ctx: &RenderContext) -> TemplateResolutionError {
    TemplateResolutionError::new(
        kind,
        message,
        template.to_string(),
        ContextSnapshot {
            software: ctx.software.to_string(),
            provider: ctx.provider.to_string(),
            variables: ctx.variables.clone(),
        },
    )
}
