use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

const DEFAULT_SHELL: &str = "/bin/sh";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Returned instead of an empty string when a command succeeds silently.
pub const NO_OUTPUT_MESSAGE: &str = "(Command completed with no output)";

/// First line of every failure result.
pub const ERROR_MARKER: &str = "Error occurred:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub shell: PathBuf,
    pub timeout: Duration,
    /// Cap on stdout and stderr combined.
    pub max_output_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("failed to start shell: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed reading command output: {0}")]
    Io(#[source] io::Error),
    #[error("command exited with code {0}")]
    ExitCode(i32),
    #[error("command terminated by signal")]
    Signalled,
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    #[error("command output exceeded {0} bytes")]
    OutputLimit(usize),
}

#[derive(Debug, Default)]
struct CapturedOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Runs one shell command at a time with a wall-clock timeout and output cap.
///
/// Environment and working directory are inherited from the host process.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs `command` and renders the outcome as tool output text.
    ///
    /// Never fails: non-zero exits, timeouts, and spawn errors come back as
    /// text starting with [`ERROR_MARKER`].
    pub async fn execute(&self, command: &str) -> String {
        let mut captured = CapturedOutput::default();
        let outcome = self.run(command, &mut captured).await;
        debug!(
            stdout_bytes = captured.stdout.len(),
            stderr_bytes = captured.stderr.len(),
            ok = outcome.is_ok(),
            "command finished"
        );

        let stdout = String::from_utf8_lossy(&captured.stdout);
        let stderr = String::from_utf8_lossy(&captured.stderr);
        match outcome {
            Ok(()) => {
                let output = join_present([stdout.as_ref(), stderr.as_ref()]);
                if output.is_empty() {
                    NO_OUTPUT_MESSAGE.to_string()
                } else {
                    output
                }
            }
            Err(error) => {
                let message = error.to_string();
                format!(
                    "{ERROR_MARKER}\n{}",
                    join_present([stdout.as_ref(), stderr.as_ref(), message.as_str()])
                )
            }
        }
    }

    async fn run(&self, command: &str, captured: &mut CapturedOutput) -> Result<(), RunError> {
        let mut child = Command::new(&self.config.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RunError::Spawn)?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let total = AtomicUsize::new(0);
        let limit = self.config.max_output_bytes;
        let CapturedOutput { stdout, stderr } = captured;

        let collect = async {
            tokio::try_join!(
                read_capped(stdout_pipe.as_mut(), stdout, &total, limit),
                read_capped(stderr_pipe.as_mut(), stderr, &total, limit),
            )?;
            child.wait().await.map_err(RunError::Io)
        };
        let outcome = tokio::time::timeout(self.config.timeout, collect).await;

        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(error)) => {
                let _ = child.kill().await;
                return Err(error);
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(RunError::Timeout(self.config.timeout));
            }
        };

        exit_result(status)
    }
}

fn exit_result(status: ExitStatus) -> Result<(), RunError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(RunError::ExitCode(code)),
        None => Err(RunError::Signalled),
    }
}

async fn read_capped<R>(
    pipe: Option<&mut R>,
    sink: &mut Vec<u8>,
    total: &AtomicUsize,
    limit: usize,
) -> Result<(), RunError>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(());
    };

    let mut buffer = [0_u8; READ_CHUNK_BYTES];
    loop {
        let read = pipe.read(&mut buffer).await.map_err(RunError::Io)?;
        if read == 0 {
            return Ok(());
        }

        let seen = total.fetch_add(read, Ordering::Relaxed) + read;
        if seen > limit {
            let room = read.saturating_sub(seen - limit);
            sink.extend_from_slice(&buffer[..room]);
            return Err(RunError::OutputLimit(limit));
        }
        sink.extend_from_slice(&buffer[..read]);
    }
}

fn join_present<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
