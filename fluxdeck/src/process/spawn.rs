//! Child process execution with line-by-line output streaming.
//!
//! stdout and stderr are each drained by their own reader task into one
//! channel, so a chatty generator can never block on a full pipe while we
//! wait for it to exit.

use anyhow::{Context, Result};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Output line from a spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutput {
    Stdout(String),
    Stderr(String),
}

/// What to run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub program: String,
    pub args: Vec<String>,
    /// Capacity of the output channel.
    pub buffer_size: usize,
}

impl ProcessOptions {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            buffer_size: 256,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-style rendering for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("{part:?}")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result from a finished process.
#[derive(Debug)]
pub struct ProcessResult {
    pub status: ExitStatus,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stderr_string(&self) -> String {
        self.stderr.join("\n")
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Spawn a process, handing every output line to `on_output` as it arrives.
///
/// Lines are also collected into the returned [`ProcessResult`]. Failing to
/// start the program is an error; a non-zero exit is not.
pub async fn spawn_process_with<F>(
    options: ProcessOptions,
    mut on_output: F,
) -> Result<ProcessResult>
where
    F: FnMut(&ProcessOutput),
{
    let mut cmd = Command::new(&options.program);
    cmd.args(&options.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(command = %options.command_line(), "spawning process");

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn process: {}", options.program))?;

    let (tx, mut rx) = mpsc::channel::<ProcessOutput>(options.buffer_size.max(1));

    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if tx.send(ProcessOutput::Stdout(line)).await.is_err() {
                    break;
                }
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if tx.send(ProcessOutput::Stderr(line)).await.is_err() {
                    break;
                }
            }
        });
    }

    // Channel closes once both readers hit EOF.
    drop(tx);

    let mut stdout_lines = Vec::new();
    let mut stderr_lines = Vec::new();
    while let Some(output) = rx.recv().await {
        on_output(&output);
        match output {
            ProcessOutput::Stdout(line) => stdout_lines.push(line),
            ProcessOutput::Stderr(line) => stderr_lines.push(line),
        }
    }

    let status = child
        .wait()
        .await
        .context("Failed to wait for process to exit")?;

    Ok(ProcessResult {
        status,
        stdout: stdout_lines,
        stderr: stderr_lines,
    })
}
