//! Derived-command generation: the deterministic recipes that fill in
//! `*_cmd` helper fields for source builds, binaries, and scripts when no
//! `custom_commands` override is supplied.

use sai_core::binary::{ArchiveFormat, BinaryRecord};
use sai_core::script::ScriptRecord;
use sai_core::source::{BuildSystem, SourceRecord};

/// Infer a checksum algorithm from digest length: 32 hex chars → md5, 40 →
/// sha1, 64 → sha256.
pub fn checksum_algorithm(digest: &str) -> Option<&'static str> {
    match digest.len() {
        32 => Some("md5"),
        40 => Some("sha1"),
        64 => Some("sha256"),
        _ => None,
    }
}

pub fn verify_checksum_cmd(digest: &str, path: &str) -> Option<String> {
    let alg = checksum_algorithm(digest)?;
    Some(format!("echo '{} {}' | {}sum -c", digest, path, alg))
}

/// Extraction command inferred from a source URL's suffix. Git URLs clone
/// rather than extract.
pub fn source_extract_cmd(url: &str, archive_path: &str, dest: &str) -> String {
    if url.ends_with(".git") {
        return format!("git clone {} {}", url, dest);
    }
    match ArchiveFormat::from_url_suffix(url) {
        Some(format) => format.extract_command(archive_path, dest),
        None => format!("tar -xf {} -C {}", archive_path, dest),
    }
}

pub fn source_download_cmd(url: &str, dest: &str) -> String {
    if url.ends_with(".git") {
        return format!("git clone {} {}", url, dest);
    }
    format!("curl -fsSL -o {} {}", dest, url)
}

fn join_args(args: &[String]) -> String {
    args.join(" ")
}

/// Derived `configure`/`build`/`install` commands per build system. A
/// `custom_commands` field set on the record always overrides the derived
/// command unconditionally, per spec.
pub struct SourceCommands {
    pub configure: String,
    pub build: String,
    pub install: String,
}

pub fn source_commands(source: &SourceRecord, software: &str) -> SourceCommands {
    if let Some(custom) = &source.custom_commands {
        if let (Some(configure), Some(build), Some(install)) = (&custom.configure, &custom.build, &custom.install) {
            return SourceCommands {
                configure: configure.clone(),
                build: build.clone(),
                install: install.clone(),
            };
        }
    }

    let dir = source.resolved_source_dir(software);
    let prefix = source.effective_install_prefix();
    let configure_args = join_args(&source.configure_args);
    let build_args = join_args(&source.build_args);
    let install_args = join_args(&source.install_args);

    let (configure, build, install) = match source.build_system {
        BuildSystem::Cmake => (
            format!("cd {} && cmake -DCMAKE_INSTALL_PREFIX={} . {}", dir, prefix, configure_args),
            format!("cd {} && cmake --build . {}", dir, build_args),
            format!("cd {} && cmake --install . {}", dir, install_args),
        ),
        BuildSystem::Autotools => (
            format!("cd {} && ./configure --prefix={} {}", dir, prefix, configure_args),
            format!("cd {} && make {}", dir, build_args),
            format!("cd {} && make install {}", dir, install_args),
        ),
        BuildSystem::Make => (
            format!("cd {} && ./configure --prefix={} {}", dir, prefix, configure_args),
            format!("cd {} && make {}", dir, build_args),
            format!("cd {} && make install {}", dir, install_args),
        ),
        BuildSystem::Meson => (
            format!("cd {} && meson setup build --prefix={} {}", dir, prefix, configure_args),
            format!("cd {} && meson compile -C build {}", dir, build_args),
            format!("cd {} && meson install -C build {}", dir, install_args),
        ),
        BuildSystem::Ninja => (
            format!("cd {} && meson setup build --prefix={} {}", dir, prefix, configure_args),
            format!("cd {} && ninja -C build {}", dir, build_args),
            format!("cd {} && ninja -C build install {}", dir, install_args),
        ),
        BuildSystem::Custom => (
            custom_fallback(source, "configure"),
            custom_fallback(source, "build"),
            custom_fallback(source, "install"),
        ),
    };

    SourceCommands {
        configure: trim_trailing(configure),
        build: trim_trailing(build),
        install: trim_trailing(install),
    }
}

fn custom_fallback(source: &SourceRecord, phase: &str) -> String {
    source
        .custom_commands
        .as_ref()
        .and_then(|c| match phase {
            "configure" => c.configure.clone(),
            "build" => c.build.clone(),
            "install" => c.install.clone(),
            _ => None,
        })
        .unwrap_or_else(|| format!("# no custom_commands.{} supplied for custom build system", phase))
}

fn trim_trailing(s: String) -> String {
    s.trim_end().to_string()
}

pub fn binary_extract_cmd(binary: &BinaryRecord, archive_path: &str, dest: &str) -> String {
    let format = binary.archive.as_ref().and_then(|a| a.format).or_else(|| ArchiveFormat::from_url_suffix(&binary.url));
    match format {
        Some(format) => format.extract_command(archive_path, dest),
        None => format!("cp {} {}", archive_path, dest),
    }
}

pub fn binary_install_cmd(binary: &BinaryRecord, extracted_path: &str) -> String {
    let dest = binary.install_path.as_deref().unwrap_or("/usr/local/bin");
    format!(
        "install -m {} {} {}",
        binary.effective_permissions(),
        extracted_path,
        dest
    )
}

pub fn script_execute_cmd(script: &ScriptRecord, script_path: &str) -> String {
    let args = script.arguments_joined();
    if args.is_empty() {
        format!("{} {}", script.interpreter.as_str(), script_path)
    } else {
        format!("{} {} {}", script.interpreter.as_str(), script_path, args)
    }
}

pub fn script_download_cmd(script: &ScriptRecord, dest: &str) -> String {
    format!("curl -fsSL -o {} {}", dest, script.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::source::SourceRecord;

    #[test]
    fn checksum_algorithm_by_digest_length() {
        assert_eq!(checksum_algorithm(&"a".repeat(32)), Some("md5"));
        assert_eq!(checksum_algorithm(&"a".repeat(40)), Some("sha1"));
        assert_eq!(checksum_algorithm(&"a".repeat(64)), Some("sha256"));
        assert_eq!(checksum_algorithm("short"), None);
    }

    #[test]
    fn cmake_build_commands_use_install_prefix_and_source_dir() {
        let source = SourceRecord::new("nginx-src", "https://nginx.org/download/nginx-1.20.1.tar.gz", "1.20.1", BuildSystem::Cmake)
            .with_install_prefix("/opt/nginx");
        let commands = source_commands(&source, "nginx");
        assert_eq!(
            commands.configure,
            "cd /tmp/sai-build-nginx/nginx-1.20.1 && cmake -DCMAKE_INSTALL_PREFIX=/opt/nginx ."
        );
        assert!(commands.build.contains("cmake --build ."));
        assert!(commands.install.contains("cmake --install ."));
    }

    #[test]
    fn autotools_build_commands_use_configure_script() {
        let source = SourceRecord::new("nginx", "https://example.com/nginx.tar.gz", "1.25", BuildSystem::Autotools)
            .with_install_prefix("/usr/local");
        let commands = source_commands(&source, "nginx");
        assert!(commands.configure.contains("./configure --prefix=/usr/local"));
        assert!(commands.build.contains("make"));
    }

    #[test]
    fn custom_commands_override_derived_recipe() {
        use sai_core::source::CustomCommands;
        let source = SourceRecord::new("nginx", "https://example.com/nginx.tar.gz", "1.25", BuildSystem::Cmake).with_custom_commands(CustomCommands {
            configure: Some("./my-configure".to_string()),
            build: Some("./my-build".to_string()),
            install: Some("./my-install".to_string()),
            ..Default::default()
        });
        let commands = source_commands(&source, "nginx");
        assert_eq!(commands.configure, "./my-configure");
        assert_eq!(commands.build, "./my-build");
        assert_eq!(commands.install, "./my-install");
    }
}
