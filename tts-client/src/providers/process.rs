//! Helpers for providers that drive a local executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, TtsError};

/// Resolve the executable for a CLI provider.
///
/// An explicit path must exist; a bare name is looked up on `PATH`.
pub(crate) fn locate_executable(
    configured: Option<&Path>,
    default_name: &str,
    provider_name: &str,
) -> Result<PathBuf> {
    let candidate = configured.unwrap_or(Path::new(default_name));

    if candidate.components().count() > 1 || candidate.is_absolute() {
        if !candidate.exists() {
            return Err(TtsError::Configuration(format!(
                "{} executable not found at specified path: {}",
                provider_name,
                candidate.display()
            )));
        }
        return Ok(candidate.to_path_buf());
    }

    which::which(candidate).map_err(|_| {
        TtsError::Configuration(format!(
            "{} executable '{}' not found in PATH",
            provider_name,
            candidate.display()
        ))
    })
}

/// Run a command to completion, feeding `stdin` if given.
///
/// A non-zero exit, spawn failure or timeout is reported as a synthesis error.
pub(crate) async fn run_command(
    mut cmd: Command,
    stdin: Option<&str>,
    timeout: Duration,
    provider_name: &str,
) -> Result<()> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::null())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| TtsError::synthesis(provider_name, format!("Failed to execute: {}", e)))?;

    if let Some(text) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(text.as_bytes())
                .await
                .map_err(|e| TtsError::synthesis(provider_name, format!("Failed to write input: {}", e)))?;
            // Closing stdin signals end of input
            drop(pipe);
        }
    }

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            TtsError::synthesis(
                provider_name,
                format!("Timed out after {} seconds", timeout.as_secs()),
            )
        })?
        .map_err(|e| TtsError::synthesis(provider_name, format!("Failed to wait: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TtsError::synthesis(
            provider_name,
            format!("Command failed ({}): {}", output.status, stderr.trim()),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_path() {
        let result = locate_executable(Some(Path::new("/no/such/tts")), "tts", "Test");
        assert!(matches!(result, Err(TtsError::Configuration(_))));
    }

    #[test]
    fn test_missing_name_on_path() {
        let result = locate_executable(None, "definitely-not-a-real-tts-binary", "Test");
        assert!(matches!(result, Err(TtsError::Configuration(_))));
    }

    #[test]
    fn test_explicit_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("fake-tts");
        std::fs::write(&exe, b"").unwrap();
        let found = locate_executable(Some(&exe), "tts", "Test").unwrap();
        assert_eq!(found, exe);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_reports_failure() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);
        let err = run_command(cmd, None, Duration::from_secs(10), "Test")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken"), "unexpected message: {}", msg);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_times_out() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5"]);
        let err = run_command(cmd, None, Duration::from_millis(100), "Test")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_feeds_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(format!("cat > '{}'", out.display()));
        run_command(cmd, Some("hello piper"), Duration::from_secs(10), "Test")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello piper");
    }
}
