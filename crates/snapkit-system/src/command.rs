//! Blocking invocation of system tools
//!
//! No timeout is applied: a tool that hangs hangs the caller.

use tokio::process::Command;

use crate::error::{Result, SystemError};

/// Run `program` with `args`, returning its stdout
///
/// A non-zero exit becomes [`SystemError::ExternalCommand`] carrying the
/// combined output.
pub async fn run(program: &str, args: &[&str]) -> Result<String> {
    let command_line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!("running {}", command_line);

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| SystemError::ExternalCommand {
            command: command_line.clone(),
            output: e.to_string(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SystemError::ExternalCommand {
            command: command_line,
            output: format!("{}{}", stdout, stderr).trim().to_string(),
        });
    }

    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let out = run("sh", &["-c", "echo hello"]).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_failure_carries_output() {
        let err = run("sh", &["-c", "echo broken >&2; exit 3"]).await.unwrap_err();
        match err {
            SystemError::ExternalCommand { command, output } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run("snapkit-no-such-program", &[]).await.unwrap_err();
        assert!(matches!(err, SystemError::ExternalCommand { .. }));
    }
}
