//! Running external installer programs.

use std::path::Path;
use tokio::process::Command;

use crate::error::ExecutionError;
use crate::reporter::Reporter;

/// Run `cmd` to completion, forwarding its output to the reporter.
///
/// Standard output is reported at info level and standard error as
/// warnings. A non-zero exit status is an error.
pub(crate) async fn run(mut cmd: Command, program: &Path, reporter: &dyn Reporter) -> Result<(), ExecutionError> {
    let name = program.display().to_string();
    reporter.debug(&format!("Running {name}"));

    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ExecutionError::Launch {
            program: name.clone(),
            source,
        })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if !line.trim().is_empty() {
            reporter.info(line);
        }
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        if !line.trim().is_empty() {
            reporter.warn(line);
        }
    }

    if output.status.success() {
        Ok(())
    } else {
        Err(ExecutionError::Installer {
            program: name,
            status: output.status.to_string(),
        })
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use crate::reporter::MemoryReporter;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script.
    pub(crate) fn write_script(path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_output_is_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tool");
        write_script(&script, "echo installed servlet-4.0\necho careful >&2");

        let reporter = MemoryReporter::default();
        run(Command::new(&script), &script, &reporter).await.unwrap();
        assert!(reporter.contains("info", "installed servlet-4.0"));
        assert!(reporter.contains("warn", "careful"));
    }

    #[tokio::test]
    async fn test_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tool");
        write_script(&script, "exit 3");

        let err = run(Command::new(&script), &script, &MemoryReporter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Installer { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let missing = Path::new("/nonexistent/installUtility");
        let err = run(Command::new(missing), missing, &MemoryReporter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Launch { .. }));
    }
}
