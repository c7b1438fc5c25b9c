//! Debug log sink: writes recorded [`ErrorContext`] records as JSON lines to
//! a per-process file in the OS temp dir, so a failed run leaves a trail an
//! operator can attach to a bug report without re-running with a debugger.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use sai_core::error::{ErrorKind, SaiError};

use crate::tracker::ErrorContext;

pub struct DebugLogSink {
    path: PathBuf,
    file: File,
}

impl DebugLogSink {
    /// Opens `sai-debug-<epoch_seconds>` under the OS temp dir for append.
    pub fn open(epoch_seconds: i64) -> Result<Self, SaiError> {
        let path = std::env::temp_dir().join(format!("sai-debug-{epoch_seconds}"));
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> Result<Self, SaiError> {
        let file = OpenOptions::new().create(true).append(true).open(&path).map_err(|e| SaiError::new(ErrorKind::Internal, format!("failed to open debug log '{}': {}", path.display(), e)))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn write(&mut self, context: &ErrorContext) -> Result<(), SaiError> {
        let line = serde_json::to_string(context).map_err(|e| SaiError::new(ErrorKind::Internal, format!("failed to serialize error context: {e}")))?;
        writeln!(self.file, "{line}").map_err(|e| SaiError::new(ErrorKind::Internal, format!("failed to write debug log: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn writes_one_json_line_per_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sai-debug-test");
        let mut sink = DebugLogSink::open_at(path.clone()).unwrap();

        let error = SaiError::new(ErrorKind::ActionTimeout, "boom");
        let context = ErrorContext::from_error(
            "1-0".to_string(),
            "install",
            "nginx",
            "apt",
            &error,
            vec![],
            crate::tracker::SystemInfo::capture(&[]),
            vec![],
            HashMap::new(),
            vec![],
            Duration::from_millis(1),
        );
        sink.write(&context).unwrap();
        sink.write(&context).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"action_timeout\""));
    }
}
