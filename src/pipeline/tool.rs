//! External Tool Invocation
//!
//! Every external process (latex, dvisvgm, pandoc) is launched through the
//! [`ToolRunner`] trait. The production [`ProcessRunner`] spawns the process
//! with `tokio::process`, captures both output streams and enforces a timeout.
//!
//! Runners report how the process ended; [`run_checked`] turns an
//! unsuccessful exit into `SlideError::ExternalTool` so each stage gets a
//! tagged result instead of raw exit codes.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::types::{Result, SlideError, ToolFailure};

/// A single external command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Name used in logs and errors, e.g. `latex [tikz-2]`
    pub label: String,
    /// Program name or path
    pub program: String,
    pub args: Vec<OsString>,
    /// Working directory (inherits the current one when unset)
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program file name without directories, e.g. `pandoc` for `/usr/bin/pandoc`
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }

    /// Arguments rendered lossily, for logging and matching
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Executes external commands
///
/// Implementations return `Ok` for any process that ran to completion,
/// successful or not; `Err` is reserved for launch failures and timeouts.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Run an invocation and require a zero exit status
pub async fn run_checked(runner: &dyn ToolRunner, invocation: &ToolInvocation) -> Result<ToolOutput> {
    debug!(
        "Running {}: {} {}",
        invocation.label,
        invocation.program,
        invocation.args_lossy().join(" ")
    );

    let output = runner.run(invocation).await?;
    if output.success {
        return Ok(output);
    }

    Err(SlideError::external_tool(
        &invocation.label,
        ToolFailure::ExitStatus(output.code),
        output.stderr,
        output.stdout,
    ))
}

/// Runs commands as child processes
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let start = Instant::now();

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            SlideError::external_tool(
                &invocation.label,
                ToolFailure::Spawn(format!("{}: {}. Is it installed?", invocation.program, e)),
                "",
                "",
            )
        })?;

        // Dropping the wait future on timeout kills the child (kill_on_drop)
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                SlideError::external_tool(
                    &invocation.label,
                    ToolFailure::Timeout(self.timeout),
                    "",
                    "",
                )
            })?
            .map_err(|e| {
                SlideError::external_tool(
                    &invocation.label,
                    ToolFailure::Spawn(e.to_string()),
                    "",
                    "",
                )
            })?;

        debug!(
            "{} finished in {:?} (status: {})",
            invocation.label,
            start.elapsed(),
            output.status
        );

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
