use crate::config::SandboxConfig;
use crate::tools::{ToolError, ToolResult};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const TRUNCATION_MARKER: &str = "[output truncated]";

/// Captured result of a finished child process
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Spawns child processes under a [`SandboxConfig`]: cleared environment plus an
/// allowlist, optional working directory, a hard timeout, and bounded output.
/// Each child leads its own process group; the whole group is killed once the
/// run ends, times out, or the future driving it is dropped.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    sandbox: SandboxConfig,
}

impl ProcessRunner {
    pub fn new(sandbox: SandboxConfig) -> Self {
        Self { sandbox }
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).env_clear().kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        for key in &self.sandbox.env_allowlist {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }
        if let Some(dir) = &self.sandbox.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run `program` to completion.
    /// `stdin` is written then closed; stdout is only collected when `capture_stdout` is set.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<String>,
        capture_stdout: bool,
    ) -> ToolResult<ProcessOutput> {
        let mut cmd = self.command(program, args);
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to start '{}': {}", program, e))
        })?;
        debug!(target: "process", program = %program, pid = ?child.id(), "Spawned child");
        let _group = GroupKill::new(child.id());

        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(mut pipe), Some(input)) = (pipe, stdin) {
                // The child may exit without reading everything
                if let Err(e) = pipe.write_all(input.as_bytes()).await {
                    debug!(target: "process", error = %e, "Child closed stdin early");
                }
            }
        };

        let timeout = self.sandbox.timeout();
        let run = async {
            let (_, output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = match tokio::time::timeout(timeout, run).await {
            Ok(res) => res.map_err(|e| {
                ToolError::ExecutionFailed(format!("Failed to wait for '{}': {}", program, e))
            })?,
            Err(_) => {
                warn!(target: "process", program = %program, timeout_ms = timeout.as_millis() as u64, "Child timed out; killed");
                return Err(ToolError::Timeout(timeout));
            }
        };

        let limit = self.sandbox.max_output_bytes;
        Ok(ProcessOutput {
            status: output.status,
            stdout: truncate(String::from_utf8_lossy(&output.stdout).into_owned(), limit),
            stderr: truncate_front(String::from_utf8_lossy(&output.stderr).into_owned(), limit),
        })
    }
}

/// Kills a child's process group on drop, taking any descendants with it
struct GroupKill {
    pgid: Option<u32>,
}

impl GroupKill {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }
}

impl Drop for GroupKill {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else { return };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!(target: "process", pgid, "Killed process group"),
        // Group already gone
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(target: "process", pgid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Keep the head of `text`, at most `limit` bytes on a char boundary, marking the cut
fn truncate(mut text: String, limit: usize) -> String {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push('\n');
    text.push_str(TRUNCATION_MARKER);
    text
}

/// Keep the tail of `text`, at most `limit` bytes, marking the cut at the front
fn truncate_front(text: String, limit: usize) -> String {
    if text.len() <= limit {
        return text;
    }
    let mut start = text.len() - limit;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("{}\n{}", TRUNCATION_MARKER, &text[start..])
}
