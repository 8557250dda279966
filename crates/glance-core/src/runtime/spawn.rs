//! Asynchronous process executor.
//!
//! Scripts ask for external programs through `glance.spawn`. Each request runs
//! in its own task with piped output, so the event loop never waits on a
//! child. Results come back over a channel and are resolved against the
//! request's callback handle on the event loop.
//!
//! A request is created, then running. It ends completed (the child exited,
//! or could not be started) or timed out (the child was killed at the
//! deadline). Output read before the kill is kept.
//!
//! On Unix each child leads its own process group, and a timeout kills the
//! whole group so programs started by a shell die with it.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Handle;

/// Exit code reported when the child could not be started or was killed by a signal.
pub const FAILED_EXIT_CODE: i32 = -1;

/// How long output readers may keep draining after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

const READ_CHUNK: usize = 8192;

/// A request to run an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Program and arguments. Never empty.
    pub argv: Vec<String>,
    /// Deadline in milliseconds. `None` or zero means no deadline.
    pub timeout_millis: Option<u64>,
    /// Callback to resolve with the result.
    pub handle: Handle,
}

/// How a spawned program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// The program exited (or failed to start) with this code.
    Completed {
        /// Exit code, [`FAILED_EXIT_CODE`] when unavailable.
        exit_code: i32,
    },
    /// The program was killed at its deadline.
    TimedOut,
}

/// Result of a spawn request, delivered back to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnResult {
    /// Program and arguments, as requested.
    pub argv: Vec<String>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). Holds the start-up error if the
    /// program could not be run.
    pub stderr: String,
    /// How the program ended.
    pub outcome: SpawnOutcome,
    /// Callback handle of the request.
    pub handle: Handle,
}

impl SpawnResult {
    /// Returns true if the program was killed at its deadline.
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        matches!(self.outcome, SpawnOutcome::TimedOut)
    }

    /// Exit code, absent when the program timed out.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            SpawnOutcome::Completed { exit_code } => Some(exit_code),
            SpawnOutcome::TimedOut => None,
        }
    }
}

/// Runs spawn requests in background tasks and reports their results.
#[derive(Debug, Clone)]
pub struct SpawnExecutor {
    results: mpsc::UnboundedSender<SpawnResult>,
    limit: Option<Arc<Semaphore>>,
}

impl SpawnExecutor {
    /// Creates an executor delivering results to `results`.
    #[must_use]
    pub const fn new(results: mpsc::UnboundedSender<SpawnResult>) -> Self {
        Self {
            results,
            limit: None,
        }
    }

    /// Caps the number of programs running at once. Further requests wait
    /// for a free slot.
    #[must_use]
    pub fn with_limit(mut self, max_concurrent: usize) -> Self {
        self.limit = Some(Arc::new(Semaphore::new(max_concurrent.max(1))));
        self
    }

    /// Starts `request` in the background and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn execute(&self, request: SpawnRequest) {
        let results = self.results.clone();
        let limit = self.limit.clone();

        tokio::spawn(async move {
            let _permit = match limit {
                Some(limit) => limit.acquire_owned().await.ok(),
                None => None,
            };
            let result = run(request).await;
            if results.send(result).is_err() {
                debug!("event loop gone, dropping spawn result");
            }
        });
    }
}

/// Runs a program to completion (or its deadline) and collects its output.
pub async fn run(request: SpawnRequest) -> SpawnResult {
    let SpawnRequest {
        argv,
        timeout_millis,
        handle,
    } = request;

    let Some((program, args)) = argv.split_first() else {
        return failed(argv, handle, "empty command line".to_string());
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %program, error = %e, "failed to spawn");
            let message = format!("{program}: {e}");
            return failed(argv, handle, message);
        }
    };
    debug!(%handle, ?argv, "spawned");

    let stdout = Capture::start(child.stdout.take());
    let stderr = Capture::start(child.stderr.take());

    let deadline = timeout_millis.filter(|&ms| ms > 0).map(Duration::from_millis);
    let outcome = match deadline {
        Some(deadline) => match tokio::time::timeout(deadline, child.wait()).await {
            Ok(status) => completed(status),
            Err(_) => {
                info!(%handle, ?argv, ?deadline, "spawn timed out, killing");
                kill_tree(&mut child).await;
                SpawnOutcome::TimedOut
            }
        },
        None => completed(child.wait().await),
    };

    let (stdout, stderr) = tokio::join!(stdout.finish(), stderr.finish());
    SpawnResult {
        stdout,
        stderr,
        argv,
        outcome,
        handle,
    }
}

/// Kills the child's process group, then the child itself, and reaps it.
async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            debug!(pid, error = %e, "failed to kill process group");
        }
    }
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill timed out child");
    }
}

fn completed(status: std::io::Result<ExitStatus>) -> SpawnOutcome {
    let exit_code = match status {
        Ok(status) => status.code().unwrap_or(FAILED_EXIT_CODE),
        Err(e) => {
            warn!(error = %e, "failed to wait for child");
            FAILED_EXIT_CODE
        }
    };
    SpawnOutcome::Completed { exit_code }
}

fn failed(argv: Vec<String>, handle: Handle, stderr: String) -> SpawnResult {
    SpawnResult {
        argv,
        stdout: String::new(),
        stderr,
        outcome: SpawnOutcome::Completed {
            exit_code: FAILED_EXIT_CODE,
        },
        handle,
    }
}

/// Output of one pipe, read concurrently with the child.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else {
                return;
            };
            let mut chunk = vec![0u8; READ_CHUNK];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!(error = %e, "pipe read failed");
                        break;
                    }
                }
            }
        });
        Self { buffer, task }
    }

    /// Waits briefly for the reader to hit end of file, then returns
    /// whatever was read.
    async fn finish(self) -> String {
        let mut task = self.task;
        if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
            task.abort();
        }
        let bytes = self.buffer.lock().await;
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
