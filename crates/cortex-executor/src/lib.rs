//! Shell-command execution for the install execute phase (§4.6, §6).
//!
//! `SandboxExecutor` is a capability trait rather than a concrete type so
//! the Operation Engine can be tested against a fake that never touches the
//! host. The real implementation spawns one command at a time via
//! `tokio::process::Command`, isolated in its own process group, the same
//! shape `spawn_tool` uses for tool subprocesses: piped stdio, `kill_on_drop`
//! as a safety net, `setsid` in `pre_exec` so the dashboard and the child
//! don't share a controlling terminal's signal group.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub const ELEVATION_TOKEN: &str = "sudo";
const STDIN_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of running a single shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
}

/// Does this pending command require the elevation secret?
pub fn needs_elevation(command: &str) -> bool {
    command.trim_start().starts_with(ELEVATION_TOKEN)
}

/// Rewrite a `sudo`-prefixed command into a form that reads the password
/// from stdin with no prompt printed (`-S -p ""`), per the Executor contract.
pub fn rewrite_for_elevation(command: &str) -> String {
    let rest = command
        .trim_start()
        .strip_prefix(ELEVATION_TOKEN)
        .unwrap_or(command)
        .trim_start();
    format!("{ELEVATION_TOKEN} -S -p \"\" {rest}")
}

#[async_trait::async_trait]
pub trait SandboxExecutor: Send + Sync {
    async fn execute(&self, command: &str, stdin: Option<&str>) -> Result<ExecutionResult>;
}

/// Runs commands through `/bin/sh -c` on the host, one at a time.
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SandboxExecutor for ShellExecutor {
    async fn execute(&self, command: &str, stdin: Option<&str>) -> Result<ExecutionResult> {
        let (program, arg, effective_command) = if needs_elevation(command) {
            ("sh".to_string(), "-c".to_string(), rewrite_for_elevation(command))
        } else {
            ("sh".to_string(), "-c".to_string(), command.to_string())
        };

        let mut cmd = Command::new(program);
        cmd.arg(arg).arg(&effective_command);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.kill_on_drop(true);

        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let mut child = cmd.spawn().context("failed to spawn command")?;

        if let Some(payload) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                let payload = format!("{payload}\n");
                let _ = tokio::time::timeout(STDIN_WRITE_TIMEOUT, async {
                    pipe.write_all(payload.as_bytes()).await?;
                    pipe.shutdown().await
                })
                .await;
            }
        }

        let output = child.wait_with_output().await.context("command wait failed")?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(ExecutionResult {
            success: output.status.success(),
            stdout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_elevation_prefix() {
        assert!(needs_elevation("sudo apt-get update"));
        assert!(!needs_elevation("apt-get update"));
    }

    #[test]
    fn rewrite_reads_password_from_stdin_silently() {
        let rewritten = rewrite_for_elevation("sudo apt-get install -y nginx");
        assert_eq!(rewritten, "sudo -S -p \"\" apt-get install -y nginx");
    }

    #[tokio::test]
    async fn executes_plain_command() {
        let executor = ShellExecutor::new();
        let result = executor.execute("echo hello", None).await.unwrap();
        assert!(result.success);
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn failing_command_reports_failure() {
        let executor = ShellExecutor::new();
        let result = executor.execute("exit 1", None).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn feeds_stdin_to_child() {
        let executor = ShellExecutor::new();
        let result = executor.execute("cat", Some("secret")).await.unwrap();
        assert!(result.success);
        assert!(result.stdout.contains("secret"));
    }
}
