//! Subprocess execution with a hard timeout.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::{expand_tilde, TaskCommand};

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// One task execution as reported by the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRun {
    pub name: String,
    pub exit_code: Option<i32>,
    pub stdout_preview: String,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

impl TaskRun {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }
}

/// Spawn `argv`, wait at most `timeout`, and kill the child if it overruns.
pub async fn run_with_timeout(
    argv: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput> {
    let Some((program, args)) = argv.split_first() else {
        bail!("empty command");
    };

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(out) => out.with_context(|| format!("failed to wait for {program}"))?,
        Err(_) => bail!(TimedOut(timeout)),
    };

    Ok(CommandOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Marker error so callers can tell a timeout from other failures.
#[derive(Debug, thiserror::Error)]
#[error("timed out after {}s", .0.as_secs_f64())]
pub struct TimedOut(pub Duration);

/// Run one scheduled task and log the result. Never fails; problems land in [`TaskRun::error`].
pub async fn run_task(task: &TaskCommand, timeout: Duration, preview_chars: usize) -> TaskRun {
    info!(task = %task.name, cmd = ?task.cmd, "running task");
    let started = Instant::now();
    let cwd = task.cwd.as_deref().map(expand_tilde);

    let result = run_with_timeout(&task.cmd, cwd.as_deref(), timeout).await;
    let elapsed_ms = started.elapsed().as_millis();

    match result {
        Ok(out) => {
            let stdout_preview: String = out.stdout.trim().chars().take(preview_chars).collect();
            if out.success {
                info!(task = %task.name, exit_code = ?out.exit_code, output = %stdout_preview, "task finished");
            } else {
                warn!(task = %task.name, exit_code = ?out.exit_code, stderr = %out.stderr.trim(), "task exited non-zero");
            }
            TaskRun {
                name: task.name.clone(),
                exit_code: out.exit_code,
                stdout_preview,
                timed_out: false,
                error: None,
                elapsed_ms,
            }
        }
        Err(e) => {
            let timed_out = e.downcast_ref::<TimedOut>().is_some();
            warn!(task = %task.name, error = %e, timed_out, "task failed");
            TaskRun {
                name: task.name.clone(),
                exit_code: None,
                stdout_preview: String::new(),
                timed_out,
                error: Some(format!("{e:#}")),
                elapsed_ms,
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> TaskCommand {
        TaskCommand {
            name: parts.join(" "),
            cmd: parts.iter().map(|s| s.to_string()).collect(),
            cwd: None,
        }
    }

    #[tokio::test]
    async fn captures_stdout_preview() {
        let run = run_task(&cmd(&["echo", "hello scheduler"]), Duration::from_secs(5), 5).await;
        assert!(run.succeeded());
        assert_eq!(run.stdout_preview, "hello");
        assert!(!run.timed_out);
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let run = run_task(&cmd(&["false"]), Duration::from_secs(5), 200).await;
        assert_eq!(run.exit_code, Some(1));
        assert!(!run.succeeded());
        assert!(run.error.is_none());
    }

    #[tokio::test]
    async fn overrun_is_killed() {
        let started = Instant::now();
        let run = run_task(&cmd(&["sleep", "10"]), Duration::from_millis(200), 200).await;
        assert!(run.timed_out);
        assert!(run.error.is_some());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error_value() {
        let run = run_task(
            &cmd(&["definitely-not-a-real-binary-xyz"]),
            Duration::from_secs(1),
            200,
        )
        .await;
        assert!(!run.timed_out);
        assert!(run.error.unwrap().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        assert!(run_with_timeout(&[], None, Duration::from_secs(1)).await.is_err());
    }
}
