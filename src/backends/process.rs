//! Subprocess command runner.
//!
//! Spawns the engine as an OS process with piped output and enforces the
//! deadline. On unix the child leads its own process group. A child that
//! runs past its deadline has its whole group killed, and is reaped before
//! the timeout error is returned, so nothing it forked outlives the call.

use crate::core::{CommandRunner, CommandSpec, ProcessOutcome, ScanError};

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// How long output is still collected after the child has exited.
///
/// A command that backgrounds a daemon can leave the daemon holding the
/// output pipes open; the exit status is what counts.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<ProcessOutcome, ScanError> {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| ScanError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        tracing::trace!(
            command = %command,
            pid = ?child.id(),
            timeout_ms = timeout.as_millis() as u64,
            "Spawned engine process"
        );

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let waited = {
            let io = async {
                tokio::try_join!(drain(stdout, &mut stdout_buf), drain(stderr, &mut stderr_buf))
                    .map(|_| ())
            };
            tokio::pin!(io);
            let mut drained = None;

            let exited = tokio::time::timeout_at(deadline, async {
                loop {
                    tokio::select! {
                        status = child.wait() => break status,
                        result = &mut io, if drained.is_none() => drained = Some(result),
                    }
                }
            })
            .await;

            match exited {
                Ok(Ok(status)) => {
                    if drained.is_none() {
                        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                        match tokio::time::timeout(DRAIN_GRACE.min(remaining), &mut io).await {
                            Ok(result) => drained = Some(result),
                            Err(_) => tracing::debug!(
                                command = %command,
                                "Output still open after exit, keeping what was read"
                            ),
                        }
                    }
                    match drained {
                        Some(Err(e)) => Some(Err(e)),
                        _ => Some(Ok(status)),
                    }
                }
                Ok(Err(e)) => Some(Err(e)),
                Err(_) => None,
            }
        };

        match waited {
            Some(Ok(status)) => Ok(finish(command, status, &stdout_buf, &stderr_buf, start)),
            Some(Err(e)) => {
                reap(&mut child, command).await;
                Err(ScanError::Io(e))
            }
            None => {
                reap(&mut child, command).await;
                Err(ScanError::timeout(&command.program, start.elapsed()))
            }
        }
    }
}

fn finish(
    command: &CommandSpec,
    status: ExitStatus,
    stdout: &[u8],
    stderr: &[u8],
    start: Instant,
) -> ProcessOutcome {
    let mut output = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        output.push_str(&String::from_utf8_lossy(stderr));
    }

    tracing::trace!(
        command = %command,
        code = ?status.code(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Engine process exited"
    );

    ProcessOutcome::from_exit(status.code(), output)
}

/// Kills the child's process group, then the child, and waits for it.
async fn reap(child: &mut Child, command: &CommandSpec) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        if let Err(e) = kill_group(pid) {
            tracing::debug!(command = %command, pid, error = %e, "Failed to signal process group");
        }
    }

    if let Err(e) = child.kill().await {
        tracing::warn!(
            command = %command,
            error = %e,
            "Failed to kill engine process"
        );
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_group(pid: u32) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
    // SAFETY: killpg takes no pointers. The group id is the child's pid,
    // which leads the group created at spawn and has not been reaped yet.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    if let Some(mut reader) = reader {
        reader.read_to_end(buf).await?;
    }
    Ok(())
}
