//! Helper catalogue dispatch: each named helper consults provider overrides
//! before falling back to top-level data, via `sai_core::MergedView`.

use std::collections::HashMap;

use sai_core::defaults::DefaultsGenerator;
use sai_core::platform::Platform;
use sai_core::resource::ResourceValidator;
use sai_core::{MergedView, Saidata};

use crate::derive;
use crate::parser::Arg;

pub struct RenderContext<'a> {
    pub software: &'a str,
    pub provider: &'a str,
    pub saidata: &'a Saidata,
    pub variables: &'a HashMap<String, String>,
    pub platform: &'a Platform,
    pub validator: Option<&'a dyn ResourceValidator>,
    pub defaults: Option<&'a dyn DefaultsGenerator>,
}

impl<'a> RenderContext<'a> {
    fn merged_view(&self, provider: &str) -> MergedView<'_> {
        MergedView::new(self.saidata, provider)
    }

    fn resolve_provider(&self, arg: &Arg) -> Result<String, String> {
        match arg {
            Arg::CurrentProvider => Ok(self.provider.to_string()),
            Arg::Str(s) => Ok(s.clone()),
            Arg::Int(_) => Err("expected a provider argument, found an integer".to_string()),
        }
    }
}

/// Dispatch a single helper call, returning the rendered string or an
/// error message (wrapped into `TemplateResolutionError` by the caller).
pub fn call_helper(ctx: &RenderContext, name: &str, args: &[Arg]) -> Result<String, String> {
    match name {
        "sai_package" => sai_package(ctx, args),
        "sai_packages" => sai_packages(ctx, args),
        "sai_service" => sai_service(ctx, args),
        "sai_port" => sai_port(ctx, args),
        "sai_file" => sai_file(ctx, args),
        "sai_directory" => sai_directory(ctx, args),
        "sai_command" => sai_command(ctx, args),
        "sai_container" => sai_container(ctx, args),
        "sai_source" => sai_source(ctx, args),
        "sai_binary" => sai_binary(ctx, args),
        "sai_script" => sai_script(ctx, args),
        "file_exists" => predicate(ctx, args, |ctx, path| ctx.validator.map(|v| v.file_exists(path)).unwrap_or(false)),
        "service_exists" => predicate(ctx, args, |ctx, name| ctx.validator.map(|v| v.service_exists(name)).unwrap_or(false)),
        "command_exists" => predicate(ctx, args, |ctx, name| ctx.validator.map(|v| v.command_exists(name)).unwrap_or(false)),
        "directory_exists" => predicate(ctx, args, |ctx, path| ctx.validator.map(|v| v.directory_exists(path)).unwrap_or(false)),
        "default_config_path" => default_path(ctx, args, |gen, sw| gen.default_config_path(sw)),
        "default_log_path" => default_path(ctx, args, |gen, sw| gen.default_log_path(sw)),
        "default_data_dir" => default_path(ctx, args, |gen, sw| gen.default_data_dir(sw)),
        "default_service_name" => default_path(ctx, args, |gen, sw| gen.default_service_name(sw)),
        "default_command_path" => default_path(ctx, args, |gen, sw| gen.default_command_path(sw)),
        other => Err(format!("no helper named '{}' found", other)),
    }
}

fn arg_str<'a>(args: &'a [Arg], i: usize) -> Result<&'a str, String> {
    args.get(i).and_then(Arg::as_str).ok_or_else(|| format!("expected a string argument at position {}", i))
}

fn single_name_arg(args: &[Arg]) -> Result<&str, String> {
    match args {
        [Arg::Str(name)] => Ok(name),
        _ => Err("expected a single logical-name argument".to_string()),
    }
}

fn sai_package(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    match args {
        [prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let view = ctx.merged_view(&provider);
            view.package(0)
                .map(|p| p.effective_package_name().to_string())
                .ok_or_else(|| "no package found".to_string())
        }
        [prov, idx] => {
            let provider = ctx.resolve_provider(prov)?;
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let view = ctx.merged_view(&provider);
            view.package(i)
                .map(|p| p.effective_package_name().to_string())
                .ok_or_else(|| format!("no package at index {}", i))
        }
        [first, field, prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let view = ctx.merged_view(&provider);
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            if matches!(first, Arg::Str(s) if s == "*") {
                let joined = view
                    .packages()
                    .iter()
                    .filter_map(|p| package_field(p, field_name))
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(joined)
            } else {
                let i = first.as_int().ok_or("expected an integer index")? as usize;
                let pkg = view.package(i).ok_or_else(|| format!("no package at index {}", i))?;
                package_field(&pkg, field_name).ok_or_else(|| format!("unknown package field '{}'", field_name))
            }
        }
        _ => Err("sai_package: unsupported arity".to_string()),
    }
}

fn package_field(pkg: &sai_core::saidata::Package, field: &str) -> Option<String> {
    match field {
        "name" => Some(pkg.name.clone()),
        "package_name" => Some(pkg.effective_package_name().to_string()),
        _ => None,
    }
}

fn sai_packages(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    let [prov] = args else {
        return Err("sai_packages: expected (prov)".to_string());
    };
    let provider = ctx.resolve_provider(prov)?;
    let view = ctx.merged_view(&provider);
    Ok(view
        .packages()
        .iter()
        .map(|p| p.effective_package_name().to_string())
        .collect::<Vec<_>>()
        .join(" "))
}

fn sai_service(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    match args {
        [Arg::Str(logical_name)] => {
            let view = ctx.merged_view(ctx.provider);
            view.service_by_name(logical_name)
                .map(|s| s.effective_service_name().to_string())
                .ok_or_else(|| format!("no service found for '{}'", logical_name))
        }
        [idx, field, prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            let view = ctx.merged_view(&provider);
            let svc = view.service(i).ok_or_else(|| format!("no service at index {}", i))?;
            match field_name {
                "service_name" => Ok(svc.effective_service_name().to_string()),
                "name" => Ok(svc.name.clone()),
                other => Err(format!("unknown service field '{}'", other)),
            }
        }
        _ => Err("sai_service: unsupported arity".to_string()),
    }
}

/// Returns the `-1` sentinel (not an error) on failure, per spec.
fn sai_port(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    let view = ctx.merged_view(ctx.provider);
    let index = match args {
        [] => 0,
        [idx] => idx.as_int().unwrap_or(-1),
        [idx, _field, _prov] => idx.as_int().unwrap_or(-1),
        _ => return Err("sai_port: unsupported arity".to_string()),
    };
    if index < 0 {
        return Ok("-1".to_string());
    }
    match view.port(index as usize) {
        Some(port) => Ok(port.port.to_string()),
        None => Ok("-1".to_string()),
    }
}

fn sai_file(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    match args {
        [Arg::Str(logical_name)] => {
            let view = ctx.merged_view(ctx.provider);
            view.file(logical_name).map(|f| f.path).ok_or_else(|| format!("no file found for '{}'", logical_name))
        }
        [Arg::Str(logical_name), field, prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            if field_name != "path" {
                return Err(format!("unknown file field '{}'", field_name));
            }
            let view = ctx.merged_view(&provider);
            view.file(logical_name).map(|f| f.path).ok_or_else(|| format!("no file found for '{}'", logical_name))
        }
        _ => Err("sai_file: unsupported arity".to_string()),
    }
}

fn sai_directory(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    let logical_name = single_name_arg(args)?;
    let view = ctx.merged_view(ctx.provider);
    view.directory(logical_name).map(|d| d.path).ok_or_else(|| format!("no directory found for '{}'", logical_name))
}

fn sai_command(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    let logical_name = single_name_arg(args)?;
    let view = ctx.merged_view(ctx.provider);
    if let Some(cmd) = view.command(logical_name) {
        if let Some(path) = cmd.path {
            return Ok(path);
        }
    }
    ctx.defaults
        .map(|gen| gen.default_command_path(logical_name))
        .ok_or_else(|| format!("no command path for '{}' and no defaults generator available", logical_name))
}

fn sai_container(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    match args {
        [Arg::Str(logical_name)] => {
            let view = ctx.merged_view(ctx.provider);
            view.container_by_name(logical_name).map(|c| c.full_image()).ok_or_else(|| format!("no container found for '{}'", logical_name))
        }
        [idx, field, prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            let view = ctx.merged_view(&provider);
            let container = view.container(i).ok_or_else(|| format!("no container at index {}", i))?;
            match field_name {
                "image" => Ok(container.image.clone()),
                "tag" => Ok(container.tag.clone().unwrap_or_default()),
                "registry" => Ok(container.registry.clone().unwrap_or_default()),
                "full_image" => Ok(container.full_image()),
                "name" => Ok(container.name.clone()),
                other => Err(format!("unknown container field '{}'", other)),
            }
        }
        _ => Err("sai_container: unsupported arity".to_string()),
    }
}

fn source_field(ctx: &RenderContext, provider: &str, i: usize, field: &str) -> Result<String, String> {
    let view = ctx.merged_view(provider);
    let source = view.source(i).ok_or_else(|| format!("no source at index {}", i))?;
    if let Some(rest) = field.strip_prefix("environment.") {
        return Ok(source.environment.get(rest).cloned().unwrap_or_default());
    }
    if let Some(rest) = field.strip_prefix("custom_commands.") {
        let custom = source.custom_commands.as_ref();
        return Ok(custom
            .and_then(|c| match rest {
                "download" => c.download.clone(),
                "extract" => c.extract.clone(),
                "configure" => c.configure.clone(),
                "build" => c.build.clone(),
                "install" => c.install.clone(),
                "uninstall" => c.uninstall.clone(),
                "validation" => c.validation.clone(),
                "version" => c.version.clone(),
                _ => None,
            })
            .unwrap_or_default());
    }
    let commands = derive::source_commands(source, ctx.software);
    match field {
        "name" => Ok(source.name.clone()),
        "url" => Ok(source.url.clone()),
        "version" => Ok(source.version.clone()),
        "build_system" => Ok(format!("{:?}", source.build_system).to_lowercase()),
        "build_dir" => Ok(source.build_dir.clone().unwrap_or_default()),
        "source_dir" => Ok(source.resolved_source_dir(ctx.software)),
        "install_prefix" => Ok(source.effective_install_prefix().to_string()),
        "configure_args" => Ok(source.configure_args.join(" ")),
        "build_args" => Ok(source.build_args.join(" ")),
        "install_args" => Ok(source.install_args.join(" ")),
        "prerequisites" => Ok(source.prerequisites.join(" ")),
        "checksum" => Ok(source.checksum.clone().unwrap_or_default()),
        "download_cmd" => Ok(derive::source_download_cmd(&source.url, "source.tar.gz")),
        "extract_cmd" => Ok(derive::source_extract_cmd(&source.url, "source.tar.gz", &source.resolved_source_dir(ctx.software))),
        "configure_cmd" => Ok(commands.configure),
        "build_cmd" => Ok(commands.build),
        "install_cmd" => Ok(commands.install),
        "prerequisites_install_cmd" => Ok(if source.prerequisites.is_empty() {
            String::new()
        } else {
            format!("install {}", source.prerequisites.join(" "))
        }),
        other => Err(format!("unknown source field '{}'", other)),
    }
}

fn sai_source(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    match args {
        [idx, field] => {
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            source_field(ctx, ctx.provider, i, field_name)
        }
        [idx, field, prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            source_field(ctx, &provider, i, field_name)
        }
        _ => Err("sai_source: unsupported arity".to_string()),
    }
}

fn binary_field(ctx: &RenderContext, provider: &str, i: usize, field: &str) -> Result<String, String> {
    let view = ctx.merged_view(provider);
    let binary = view.binary(i).ok_or_else(|| format!("no binary at index {}", i))?;
    if let Some(rest) = field.strip_prefix("archive.") {
        let archive = binary.archive.as_ref();
        return Ok(match rest {
            "format" => archive.and_then(|a| a.format).map(|f| format!("{:?}", f).to_lowercase()).unwrap_or_default(),
            "strip_prefix" => archive.and_then(|a| a.strip_prefix.clone()).unwrap_or_default(),
            "extract_path" => archive.and_then(|a| a.extract_path.clone()).unwrap_or_default(),
            _ => return Err(format!("unknown archive field '{}'", rest)),
        });
    }
    match field {
        "url" => Ok(substitute_os_arch(&binary.url, ctx.platform)),
        "version" => Ok(binary.version.clone()),
        "install_path" => Ok(binary.install_path.clone().unwrap_or_else(|| "/usr/local/bin".to_string())),
        "executable" => Ok(binary.executable.clone().unwrap_or_default()),
        "permissions" => Ok(binary.effective_permissions().to_string()),
        "download_cmd" => Ok(derive::source_download_cmd(&substitute_os_arch(&binary.url, ctx.platform), "binary.archive")),
        "extract_cmd" => Ok(derive::binary_extract_cmd(binary, "binary.archive", "extracted")),
        "install_cmd" => Ok(derive::binary_install_cmd(binary, "extracted/bin")),
        "verify_checksum_cmd" => binary
            .checksum
            .as_deref()
            .and_then(|digest| derive::verify_checksum_cmd(digest, "binary.archive"))
            .ok_or_else(|| "no checksum configured".to_string()),
        other => Err(format!("unknown binary field '{}'", other)),
    }
}

fn substitute_os_arch(url: &str, platform: &Platform) -> String {
    url.replace("{{os}}", &platform.os.to_string()).replace("{{arch}}", &platform.arch.to_string())
}

fn sai_binary(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    match args {
        [idx, field] => {
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            binary_field(ctx, ctx.provider, i, field_name)
        }
        [idx, field, prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            binary_field(ctx, &provider, i, field_name)
        }
        _ => Err("sai_binary: unsupported arity".to_string()),
    }
}

fn script_field(ctx: &RenderContext, provider: &str, i: usize, field: &str) -> Result<String, String> {
    let view = ctx.merged_view(provider);
    let script = view.script(i).ok_or_else(|| format!("no script at index {}", i))?;
    if let Some(rest) = field.strip_prefix("environment.") {
        return Ok(script.environment.get(rest).cloned().unwrap_or_default());
    }
    match field {
        "interpreter" => Ok(script.interpreter.as_str().to_string()),
        "arguments" => Ok(script.arguments_joined()),
        "environment_vars" => Ok(script.environment_vars_joined()),
        "download_cmd" => Ok(derive::script_download_cmd(script, "install.sh")),
        "execute_cmd" => Ok(derive::script_execute_cmd(script, "install.sh")),
        "verify_checksum_cmd" => script
            .checksum
            .as_deref()
            .and_then(|digest| derive::verify_checksum_cmd(digest, "install.sh"))
            .ok_or_else(|| "no checksum configured".to_string()),
        "timeout" => Ok(script.timeout_seconds.map(|s| s.to_string()).unwrap_or_default()),
        other => Err(format!("unknown script field '{}'", other)),
    }
}

fn sai_script(ctx: &RenderContext, args: &[Arg]) -> Result<String, String> {
    match args {
        [idx, field] => {
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            script_field(ctx, ctx.provider, i, field_name)
        }
        [idx, field, prov] => {
            let provider = ctx.resolve_provider(prov)?;
            let i = idx.as_int().ok_or("expected an integer index")? as usize;
            let field_name = field.as_str().ok_or("expected a field name argument")?;
            script_field(ctx, &provider, i, field_name)
        }
        _ => Err("sai_script: unsupported arity".to_string()),
    }
}

fn predicate(ctx: &RenderContext, args: &[Arg], check: impl Fn(&RenderContext, &str) -> bool) -> Result<String, String> {
    let target = arg_str(args, 0)?;
    Ok(check(ctx, target).to_string())
}

fn default_path(ctx: &RenderContext, args: &[Arg], lookup: impl Fn(&dyn DefaultsGenerator, &str) -> String) -> Result<String, String> {
    let target = if args.is_empty() { ctx.software } else { arg_str(args, 0)? };
    ctx.defaults.map(|gen| lookup(gen, target)).ok_or_else(|| "no defaults generator available".to_string())
}
