//! Subprocess runner
//!
//! Starts the package manager, streams stdout and stderr line by line into a
//! single caller-supplied sink, and turns a non-zero exit into an error.
//! There is no timeout: a hung child blocks the build until it exits.

use crate::error::{ModlayerError, ModlayerResult};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

/// A single invocation of an executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Arguments following the program (and its configured prefix)
    pub args: Vec<String>,
    /// Working directory for the child
    pub dir: PathBuf,
    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

/// Abstract executable interface
#[async_trait]
pub trait Executable: Send + Sync {
    /// Run to completion, writing combined output into `output`
    async fn execute(
        &self,
        execution: &Execution,
        output: &mut (dyn Write + Send),
    ) -> ModlayerResult<()>;

    /// Human-readable command line for an execution
    fn command_line(&self, execution: &Execution) -> String;
}

/// Executable backed by a real program on disk
#[derive(Debug, Clone)]
pub struct CommandExecutable {
    program: String,
    prefix: Vec<String>,
}

impl CommandExecutable {
    /// Create from a command vector: program followed by leading arguments
    pub fn new(command: &[String]) -> ModlayerResult<Self> {
        let (program, prefix) = command.split_first().ok_or_else(|| {
            ModlayerError::command_failed(
                "<empty>",
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "no program given"),
            )
        })?;

        Ok(Self {
            program: program.clone(),
            prefix: prefix.to_vec(),
        })
    }
}

#[async_trait]
impl Executable for CommandExecutable {
    async fn execute(
        &self,
        execution: &Execution,
        output: &mut (dyn Write + Send),
    ) -> ModlayerResult<()> {
        let command_line = self.command_line(execution);
        debug!(
            "Executing: {} (dir: {})",
            command_line,
            execution.dir.display()
        );

        let mut child = Command::new(&self.program)
            .args(&self.prefix)
            .args(&execution.args)
            .current_dir(&execution.dir)
            .envs(execution.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ModlayerError::command_failed(command_line.clone(), e))?;

        stream_child_output(&mut child, output)
            .await
            .map_err(|e| ModlayerError::io(format!("capturing output of {}", command_line), e))?;

        let status = child
            .wait()
            .await
            .map_err(|e| ModlayerError::command_failed(command_line.clone(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ModlayerError::CommandExit {
                command: command_line,
                code: status.code(),
            })
        }
    }

    fn command_line(&self, execution: &Execution) -> String {
        std::iter::once(&self.program)
            .chain(&self.prefix)
            .chain(&execution.args)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Stream stdout+stderr from a child process into one sink, line by line.
///
/// Lines are forwarded as raw bytes, so output that is not UTF-8 keeps both
/// pipes drained. On a read or write failure the child is killed and reaped
/// before the error is returned.
async fn stream_child_output(
    child: &mut Child,
    output: &mut (dyn Write + Send),
) -> std::io::Result<()> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("stderr not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("stdout not piped"))?;

    let result = pump_lines(BufReader::new(stdout), BufReader::new(stderr), output).await;
    if result.is_err() {
        if let Err(e) = child.kill().await {
            debug!("Failed to kill child after output error: {}", e);
        }
    }
    result
}

async fn pump_lines(
    mut stdout: impl AsyncBufRead + Unpin,
    mut stderr: impl AsyncBufRead + Unpin,
    output: &mut (dyn Write + Send),
) -> std::io::Result<()> {
    // Partial lines stay buffered across select iterations; read_until
    // appends to the buffer, so a cancelled read loses nothing.
    let mut stdout_line = Vec::new();
    let mut stderr_line = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            read = stderr.read_until(b'\n', &mut stderr_line), if !stderr_done => {
                if read? == 0 {
                    stderr_done = true;
                }
                flush_line(&mut stderr_line, output, stderr_done)?;
            }
            read = stdout.read_until(b'\n', &mut stdout_line), if !stdout_done => {
                if read? == 0 {
                    stdout_done = true;
                }
                flush_line(&mut stdout_line, output, stdout_done)?;
            }
        }
    }

    Ok(())
}

/// Write a complete line, or whatever is left once the stream has ended
fn flush_line(
    line: &mut Vec<u8>,
    output: &mut (dyn Write + Send),
    at_eof: bool,
) -> std::io::Result<()> {
    if line.is_empty() || !(at_eof || line.ends_with(b"\n")) {
        return Ok(());
    }
    if !line.ends_with(b"\n") {
        line.push(b'\n');
    }
    output.write_all(line)?;
    line.clear();
    Ok(())
}
