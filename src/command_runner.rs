//! Production `CommandRunner`/`ResourceCreator`: real subprocess execution
//! and filesystem mutation, platform-aware the way the teacher's command
//! builder handles Windows `.cmd`/`.bat` shells.

use async_trait::async_trait;
use sai_core::{ErrorKind, SaiError};
use sai_failsafe::recovery::{CommandRunner, ResourceCreator};
use tokio::process::Command;

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Runs each command string through the host shell, serially, aborting on
/// the first non-zero exit. Returns the concatenated stdout of every
/// command that ran.
pub struct ProcessCommandRunner;

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, provider: &str, commands: &[String]) -> Result<String, SaiError> {
        let mut combined_output = String::new();
        for command in commands {
            let output = shell_command(command)
                .output()
                .await
                .map_err(|e| SaiError::new(ErrorKind::CommandFailed, format!("failed to spawn '{command}' under provider '{provider}': {e}")))?;

            combined_output.push_str(&String::from_utf8_lossy(&output.stdout));

            if !output.status.success() {
                return Err(SaiError::new(
                    ErrorKind::CommandFailed,
                    format!("command '{command}' under provider '{provider}' exited with {:?}", output.status.code()),
                )
                .with_context("provider", provider)
                .with_context("command", command.clone())
                .with_context("stderr", String::from_utf8_lossy(&output.stderr).to_string()));
            }
        }
        Ok(combined_output)
    }
}

/// Creates missing directories/files on the real filesystem.
pub struct FsResourceCreator;

impl ResourceCreator for FsResourceCreator {
    fn create_directory(&self, path: &str) -> Result<(), SaiError> {
        std::fs::create_dir_all(path).map_err(|e| SaiError::new(ErrorKind::ResourceInvalid, format!("failed to create directory '{path}': {e}")))
    }

    fn create_file(&self, path: &str) -> Result<(), SaiError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| SaiError::new(ErrorKind::ResourceInvalid, format!("failed to create parent directory for '{path}': {e}")))?;
        }
        std::fs::OpenOptions::new().create(true).write(true).open(path).map(|_| ()).map_err(|e| SaiError::new(ErrorKind::ResourceInvalid, format!("failed to create file '{path}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_a_successful_command_and_captures_stdout() {
        let runner = ProcessCommandRunner;
        let output = runner.run("test", &["echo hello".to_string()]).await.unwrap();
        assert!(output.contains("hello"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_as_command_failed() {
        let runner = ProcessCommandRunner;
        let err = runner.run("test", &["exit 1".to_string()]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CommandFailed);
    }

    #[test]
    fn creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let creator = FsResourceCreator;
        creator.create_directory(nested.to_str().unwrap()).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn creates_file_and_its_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested/file.txt");
        let creator = FsResourceCreator;
        creator.create_file(file.to_str().unwrap()).unwrap();
        assert!(file.is_file());
    }
}
