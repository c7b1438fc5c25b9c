//! Two-phase render: normalize + parse + substitute, then (optionally)
//! safety-validate.

use crate::error::{ContextSnapshot, TemplateErrorKind, TemplateResolutionError};
use crate::helpers::{call_helper, RenderContext};
use crate::normalize::normalize_template;
use crate::parser::{parse_placeholder, Placeholder, VariablePath};
use crate::safety::{self, UsedResourceHelpers};

/// Render `template` against `ctx`. When `safety_mode` is true, the output
/// is additionally scanned by the safety pass before being returned.
pub fn render(template: &str, ctx: &RenderContext, safety_mode: bool) -> Result<String, TemplateResolutionError> {
    let normalized = normalize_template(template);
    let mut used = UsedResourceHelpers::default();
    let mut unresolved = Vec::new();
    let mut function_error: Option<String> = None;

    let mut out = String::with_capacity(normalized.len());
    let mut rest = normalized.as_str();
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str("{{");
            rest = after_open;
            continue;
        };
        let body = after_open[..end].trim();
        rest = &after_open[end + 2..];

        match parse_placeholder(body) {
            Ok(Placeholder::Variable(path)) => match resolve_variable(&path, ctx) {
                Some(value) => out.push_str(&value),
                None => {
                    unresolved.push(body.to_string());
                    out.push_str("{{ ");
                    out.push_str(body);
                    out.push_str(" }}");
                }
            },
            Ok(Placeholder::Helper { name, args }) => {
                track_resource_helper(&name, &mut used);
                match call_helper(ctx, &name, &args) {
                    Ok(value) => out.push_str(&value),
                    Err(message) => {
                        function_error.get_or_insert(message);
                    }
                }
            }
            Err(parse_error) => {
                function_error.get_or_insert(parse_error.0);
            }
        }
    }
    out.push_str(rest);

    if let Some(message) = function_error {
        return Err(TemplateResolutionError::new(
            TemplateErrorKind::FunctionError,
            message,
            template.to_string(),
            snapshot(ctx),
        ));
    }

    if !unresolved.is_empty() {
        return Err(TemplateResolutionError::new(
            TemplateErrorKind::UnresolvedVariables,
            format!("{} unresolved placeholder(s)", unresolved.len()),
            template.to_string(),
            snapshot(ctx),
        )
        .with_unresolved_tokens(unresolved));
    }

    if safety_mode {
        safety::validate(&out, template, ctx, &used)?;
    }

    Ok(out)
}

fn track_resource_helper(name: &str, used: &mut UsedResourceHelpers) {
    match name {
        "sai_file" => used.file = true,
        "sai_directory" => used.directory = true,
        "sai_command" => used.command = true,
        _ => {}
    }
}

fn resolve_variable(path: &VariablePath, ctx: &RenderContext) -> Option<String> {
    match path {
        VariablePath::Software => Some(ctx.software.to_string()),
        VariablePath::Provider => Some(ctx.provider.to_string()),
        VariablePath::Variable(key) => ctx.variables.get(key).cloned(),
    }
}

fn snapshot(ctx: &RenderContext) -> ContextSnapshot {
    ContextSnapshot {
        software: ctx.software.to_string(),
        provider: ctx.provider.to_string(),
        variables: ctx.variables.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::saidata::{Package, Saidata};
    use sai_core::platform::Platform;
    use std::collections::HashMap;

    #[test]
    fn renders_variable_and_helper_together() {
        let saidata = Saidata::new("nginx").with_package(Package::new("nginx").with_package_name("nginx-full"));
        let variables = HashMap::new();
        let platform = Platform::current();
        let ctx = RenderContext {
            software: "nginx",
            provider: "apt",
            saidata: &saidata,
            variables: &variables,
            platform: &platform,
            validator: None,
            defaults: None,
        };
        let rendered = render("apt-get install -y {{ sai_package prov }}", &ctx, false).unwrap();
        assert_eq!(rendered, "apt-get install -y nginx-full");
    }

    #[test]
    fn leaves_unresolved_variable_and_reports_it() {
        let saidata = Saidata::new("nginx");
        let variables = HashMap::new();
        let platform = Platform::current();
        let ctx = RenderContext {
            software: "nginx",
            provider: "apt",
            saidata: &saidata,
            variables: &variables,
            platform: &platform,
            validator: None,
            defaults: None,
        };
        let err = render("echo {{ .Variables.missing }}", &ctx, false).unwrap_err();
        assert_eq!(err.kind, TemplateErrorKind::UnresolvedVariables);
        assert_eq!(err.unresolved_tokens, vec![".Variables.missing".to_string()]);
    }

    #[test]
    fn render_is_idempotent_on_its_own_output() {
        let saidata = Saidata::new("nginx").with_package(Package::new("nginx"));
        let variables = HashMap::new();
        let platform = Platform::current();
        let ctx = RenderContext {
            software: "nginx",
            provider: "apt",
            saidata: &saidata,
            variables: &variables,
            platform: &platform,
            validator: None,
            defaults: None,
        };
        let once = render("{{ sai_package prov }}", &ctx, false).unwrap();
        let twice = render(&once, &ctx, false).unwrap();
        assert_eq!(once, twice);
    }
}
