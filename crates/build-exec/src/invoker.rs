use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::outcome::{InvocationResult, OutcomeKind};

/// Wall-clock bound applied to a build when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound applied to `<tool> version` availability probes.
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// An external binary plus the fixed arguments it is always called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    program: OsString,
    args: Vec<OsString>,
}

impl ExternalTool {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `<program> build --enable-helm`, the manifest build with chart inflation.
    pub fn kustomize(program: impl Into<OsString>) -> Self {
        Self::new(program).args(["build", "--enable-helm"])
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

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Run the tool against a workspace directory, passed as the last argument.
    pub async fn invoke(&self, workspace: &Path, timeout: Duration) -> InvocationResult {
        self.run(&[workspace.as_os_str()], timeout).await
    }

    /// Run `<program> version` under [`VERSION_PROBE_TIMEOUT`].
    pub async fn probe_version(&self) -> InvocationResult {
        Self::new(self.program.clone())
            .arg("version")
            .run(&[], VERSION_PROBE_TIMEOUT)
            .await
    }

    /// Spawn the tool once and wait for it, never longer than `timeout`.
    ///
    /// The child gets its own process group so that anything it forks is
    /// killed along with it when the deadline passes.
    pub async fn run(&self, extra_args: &[&OsStr], timeout: Duration) -> InvocationResult {
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(extra_args);
        configure_command(&mut command);
        let cmdline = command_line_string(&command);

        let start = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(command = %cmdline, error = %err, "failed to spawn external tool");
                return InvocationResult::infrastructure(format!(
                    "Failed to run '{}': {}",
                    self.program.to_string_lossy(),
                    err
                ));
            }
        };
        let pid = child.id();
        debug!(command = %cmdline, ?pid, "spawned external tool");

        let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let waited = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            let stdout = (&mut stdout_task).await.unwrap_or_default();
            let stderr = (&mut stderr_task).await.unwrap_or_default();
            Ok::<_, std::io::Error>(CommandLogs {
                stdout,
                stderr,
                exit_status: status.code(),
            })
        })
        .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let result = match waited {
            Ok(Ok(logs)) => {
                InvocationResult::exited(logs.exit_status, logs.stdout, logs.stderr, elapsed_ms)
            }
            Ok(Err(err)) => {
                terminate(&mut child, pid).await;
                InvocationResult::infrastructure(format!(
                    "Failed waiting for '{}': {}",
                    self.program.to_string_lossy(),
                    err
                ))
            }
            Err(_) => {
                terminate(&mut child, pid).await;
                InvocationResult::timed_out(elapsed_ms)
            }
        };
        stdout_task.abort();
        stderr_task.abort();

        match result.kind() {
            OutcomeKind::Success => {
                info!(command = %cmdline, duration_ms = elapsed_ms, "external tool succeeded")
            }
            OutcomeKind::ToolFailure => warn!(
                command = %cmdline,
                exit_code = ?result.exit_code(),
                stderr = %truncate(result.stderr(), 512),
                "external tool failed"
            ),
            OutcomeKind::Timeout => warn!(
                command = %cmdline,
                timeout_ms = timeout.as_millis() as u64,
                "external tool timed out and was killed"
            ),
            OutcomeKind::InfrastructureError => warn!(
                command = %cmdline,
                error = result.message().unwrap_or_default(),
                "external tool could not be run"
            ),
        }

        result
    }
}

fn configure_command(command: &mut Command) {
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
}

/// Kill the child's process group, then kill and reap the child itself.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        // The group id equals the child's pid because it was spawned with process_group(0).
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    // kill() also waits, so the child is reaped before we return.
    if let Err(err) = child.kill().await {
        debug!(error = %err, "child already exited before kill");
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(err) = stream.read_to_end(&mut buffer).await {
            debug!(error = %err, "failed to read child output");
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[derive(Debug, Clone)]
struct CommandLogs {
    stdout: String,
    stderr: String,
    exit_status: Option<i32>,
}

fn command_line_string(cmd: &Command) -> String {
    let cmd = cmd.as_std();
    let mut s = String::new();
    s.push_str(&cmd.get_program().to_string_lossy());
    for a in cmd.get_args() {
        s.push(' ');
        let a = a.to_string_lossy();
        if a.is_empty() || a.contains(' ') || a.contains('"') || a.contains('\'') {
            s.push_str(&shell_escape(&a));
        } else {
            s.push_str(&a);
        }
    }
    s
}

/// Single-quote `arg` for a POSIX shell.
pub fn shell_escape(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let escaped = arg.replace('\'', "'\\''");
    format!("'{}'", escaped)
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        text.to_string()
    } else {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut truncated = text[..end].to_string();
        truncated.push_str("… (truncated)");
        truncated
    }
}
