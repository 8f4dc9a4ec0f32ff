//! Builder for executing external tool commands with timeout support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use hf_core::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use hf_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> hf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-version")
///     .execute()
///     .await?;
/// assert!(output.stdout.starts_with("ffmpeg version"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn spawn(&self, stdout: Stdio) -> Result<tokio::process::Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %self.program.display(), args = ?self.args, "Spawning tool");

        cmd.spawn()
            .map_err(|e| Error::toolchain(self.program_name(), format!("failed to spawn: {e}")))
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolchainUnavailable`] if the process cannot be spawned.
    /// - [`Error::EncodeFailure`] on timeout (the child is killed) or a
    ///   non-zero exit (message includes the stderr tail).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let name = self.program_name();
        let child = self.spawn(Stdio::piped())?;

        // Dropping the future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(Error::encode(
                        name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            stderr_tail(&tool_output.stderr)
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::encode(name, format!("I/O error waiting for process: {e}"))),
            Err(_elapsed) => Err(Error::encode(name, format!("timed out after {:?}", self.timeout))),
        }
    }

    /// Execute the command, handing every stderr line to `on_line` as it
    /// arrives. Used for ffmpeg's `-progress pipe:2` output.
    ///
    /// Stdout is discarded. When `cancel` fires the child is killed and an
    /// [`Error::EncodeFailure`] is returned.
    pub async fn execute_with_stderr_callback(
        &self,
        mut on_line: impl FnMut(&str),
        cancel: Option<CancellationToken>,
    ) -> Result<ToolOutput> {
        let name = self.program_name();
        let mut child = self.spawn(Stdio::null())?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("child stderr was not captured".into()))?;

        let mut lines = BufReader::new(stderr).lines();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let cancelled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(cancelled);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        on_line(&line);
                        if !is_progress_line(&line) {
                            if tail.len() == STDERR_TAIL_LINES {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        return Err(Error::encode(name, format!("failed to read stderr: {e}")));
                    }
                },
                _ = &mut deadline => {
                    let _ = child.kill().await;
                    return Err(Error::encode(name, format!("timed out after {:?}", self.timeout)));
                }
                _ = &mut cancelled => {
                    let _ = child.kill().await;
                    return Err(Error::encode(name, "cancelled"));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::encode(name.clone(), format!("I/O error waiting for process: {e}")))?;
        let stderr: Vec<String> = tail.into_iter().collect();
        let stderr = stderr.join("\n");

        if !status.success() {
            return Err(Error::encode(
                name,
                format!("exited with status {status}: {}", stderr.trim()),
            ));
        }

        Ok(ToolOutput {
            status,
            stdout: String::new(),
            stderr,
        })
    }
}

/// `key=value` lines emitted by `-progress`.
fn is_progress_line(line: &str) -> bool {
    line.split_once('=').is_some_and(|(key, _)| {
        !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// The last few lines of `stderr`, trimmed.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
