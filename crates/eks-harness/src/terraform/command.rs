//! Terraform CLI execution with streamed output
//!
//! Every line terraform prints is forwarded to `tracing` as it arrives and
//! also captured, so callers can parse `-json` output or report the tail of
//! stderr on failure.
//!
//! A command whose future is dropped (the run was cancelled or timed out)
//! is interrupted rather than killed: terraform gets SIGINT and a grace
//! period to write its state and release the state lock, so the teardown
//! that follows sees everything the interrupted apply created.

use crate::provider::ProviderError;
use anyhow::{Context, Result, bail};
use eks_harness_common::defaults::DEFAULT_INTERRUPT_GRACE_SECS;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lines of stderr quoted in the error for a failed command
const STDERR_TAIL_LINES: usize = 20;

/// Time to wait for streaming tasks to flush after the process exits
const STREAM_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Captured result of one terraform invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Last few stderr lines, for error messages
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
        lines[start..].join("\n")
    }
}

/// Runs terraform in one module directory
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: String,
    module_dir: PathBuf,
    timeout: Duration,
    interrupt_grace: Duration,
}

impl TerraformCli {
    pub fn new(binary: impl Into<String>, module_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            module_dir: module_dir.into(),
            timeout,
            interrupt_grace: Duration::from_secs(DEFAULT_INTERRUPT_GRACE_SECS),
        }
    }

    /// How long an interrupted command may take to exit before it is killed
    pub fn with_interrupt_grace(mut self, grace: Duration) -> Self {
        self.interrupt_grace = grace;
        self
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Run terraform and capture its output.
    ///
    /// `workspace` is passed through `TF_WORKSPACE` so concurrent runs in
    /// the same module directory do not fight over the selected workspace.
    /// The child is interrupted if the returned future is dropped.
    pub async fn run(&self, args: &[&str], workspace: Option<&str>) -> Result<CommandOutput> {
        info!(
            cmd = %self.binary,
            args = ?args,
            workspace = ?workspace,
            timeout_secs = self.timeout.as_secs(),
            "Running terraform"
        );

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .current_dir(&self.module_dir)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        match workspace {
            Some(workspace) => command.env("TF_WORKSPACE", workspace),
            None => command.env_remove("TF_WORKSPACE"),
        };

        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn command: {}", self.binary))?;
        let mut child = InterruptOnDrop::new(child, self.interrupt_grace);

        let stdout = child.inner()?.stdout.take().context("Failed to capture stdout")?;
        let stderr = child.inner()?.stderr.take().context("Failed to capture stderr")?;
        let stdout_handle = stream_lines(stdout, "stdout");
        let stderr_handle = stream_lines(stderr, "stderr");

        let status = match tokio::time::timeout(self.timeout, child.inner()?.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(e).context("Failed waiting for terraform"),
            Err(_) => {
                warn!(
                    args = ?args,
                    timeout_secs = self.timeout.as_secs(),
                    "Terraform timed out, killing process"
                );
                if let Err(e) = child.inner()?.kill().await {
                    warn!(error = %e, "Failed to kill timed-out process");
                }
                bail!(
                    "terraform {} timed out after {}s",
                    args.first().copied().unwrap_or_default(),
                    self.timeout.as_secs()
                );
            }
        };

        let stdout = collect(stdout_handle).await;
        let stderr = collect(stderr_handle).await;

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout,
            stderr,
        })
    }

    /// Like [`run`](Self::run) but a non-zero exit is an error
    pub async fn run_checked(&self, args: &[&str], workspace: Option<&str>) -> Result<CommandOutput> {
        let output = self.run(args, workspace).await?;
        if !output.success {
            let code = output.code.map(|c| c.to_string());
            return Err(ProviderError::Other {
                message: format!(
                    "terraform {} exited with code {}:\n{}",
                    args.first().copied().unwrap_or_default(),
                    code.as_deref().unwrap_or("signal"),
                    output.stderr_tail()
                ),
                code,
            }
            .into());
        }
        Ok(output)
    }
}

/// Owns a running terraform process and interrupts it if dropped early
struct InterruptOnDrop {
    child: Option<Child>,
    grace: Duration,
}

impl InterruptOnDrop {
    fn new(child: Child, grace: Duration) -> Self {
        Self {
            child: Some(child),
            grace,
        }
    }

    fn inner(&mut self) -> Result<&mut Child> {
        self.child.as_mut().context("terraform process already released")
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if !matches!(child.try_wait(), Ok(None)) {
            return;
        }
        // Without a runtime to wait on the child, dropping it kills it
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if let Err(e) = interrupt(&child) {
            warn!(error = %e, "Failed to interrupt terraform, killing it");
            return;
        }

        let grace = self.grace;
        warn!(
            pid = ?child.id(),
            grace_secs = grace.as_secs(),
            "Interrupted terraform, waiting for it to save state"
        );
        runtime.spawn(async move {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => info!(%status, "Interrupted terraform exited"),
                Ok(Err(e)) => warn!(error = %e, "Failed waiting for interrupted terraform"),
                Err(_) => {
                    warn!("Interrupted terraform did not exit in time, killing it");
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill terraform");
                    }
                }
            }
        });
    }
}

#[cfg(unix)]
fn interrupt(child: &Child) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = child.id().context("terraform process has no pid")?;
    let pid = i32::try_from(pid).context("terraform pid out of range")?;
    kill(Pid::from_raw(pid), Signal::SIGINT).context("Failed to send SIGINT")?;
    Ok(())
}

#[cfg(not(unix))]
fn interrupt(_child: &Child) -> Result<()> {
    bail!("interrupting a process is only supported on unix")
}

fn stream_lines<R>(reader: R, stream: &'static str) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut captured = String::new();
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "terraform", stream, "{line}");
            captured.push_str(&line);
            captured.push('\n');
        }
        captured
    })
}

async fn collect(handle: JoinHandle<String>) -> String {
    match tokio::time::timeout(STREAM_FLUSH_TIMEOUT, handle).await {
        Ok(Ok(captured)) => captured,
        _ => String::new(),
    }
}
