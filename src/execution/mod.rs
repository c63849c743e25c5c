//! Scanner process execution
//!
//! Spawns the scanner directly (no shell, no PTY) and streams its output
//! line by line over a bounded channel. One worker task supervises the
//! child; reader tasks forward lines in the order the child wrote them, and
//! the exit status is sent only after every reader has finished.
//!
//! All entry points must be called from within a tokio runtime.

use crate::commands::split_command_line;
use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};

/// Exit code reported when the real status is unknown (signal, I/O failure)
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Something the running process produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// One output line, always ending in `\n`
    Line(String),
    /// A failure while the process was running
    Error(String),
    /// The process ended; always the last event
    Exited(i32),
}

/// Requests termination of a running process; cheap to clone
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Ask the supervisor to terminate the process; repeated calls are no-ops
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Events of one running process
pub struct RunHandle {
    events: mpsc::Receiver<RunEvent>,
    canceller: Canceller,
    pid: Option<u32>,
    command: String,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub lines: Vec<String>,
    pub errors: Vec<String>,
    pub exit_code: Option<i32>,
}

impl RunHandle {
    /// Next event; `None` once the exit status has been delivered
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Handle that can cancel this run from elsewhere
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Terminate the process
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// OS process id, if the platform reported one
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The command line this run was started from
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Deliver the remaining events to callbacks on a new consumer task
    pub fn deliver<L, X, E>(self, mut on_line: L, on_exit: X, on_error: E) -> RunTask
    where
        L: FnMut(String) + Send + 'static,
        X: FnOnce(i32) + Send + 'static,
        E: Fn(String) + Send + 'static,
    {
        let (mut events, canceller) = self.into_parts();
        let join = tokio::spawn(async move {
            let mut on_exit = Some(on_exit);
            while let Some(event) = events.recv().await {
                match event {
                    RunEvent::Line(line) => on_line(line),
                    RunEvent::Error(message) => on_error(message),
                    RunEvent::Exited(code) => {
                        if let Some(on_exit) = on_exit.take() {
                            on_exit(code);
                        }
                    }
                }
            }
        });

        RunTask { canceller, join }
    }

    /// Drain every event until the process ends
    pub async fn collect(mut self) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        while let Some(event) = self.recv().await {
            match event {
                RunEvent::Line(line) => outcome.lines.push(line),
                RunEvent::Error(message) => outcome.errors.push(message),
                RunEvent::Exited(code) => outcome.exit_code = Some(code),
            }
        }
        outcome
    }

    fn into_parts(self) -> (mpsc::Receiver<RunEvent>, Canceller) {
        (self.events, self.canceller)
    }
}

/// A run whose events are delivered to callbacks on one consumer task
pub struct RunTask {
    canceller: Canceller,
    join: JoinHandle<()>,
}

impl RunTask {
    /// Terminate the process; remaining callbacks still fire
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Whether the last callback has been delivered
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait until the last callback has been delivered
    pub async fn wait(self) {
        if let Err(e) = self.join.await {
            warn!("Run consumer task failed: {}", e);
        }
    }
}

/// Launches scanner processes
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    config: RunnerConfig,
}

impl CommandRunner {
    /// Create a runner with the given settings
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Start `command_line` and return a handle to its event stream.
    ///
    /// Launch failures are returned as [`Error::ProcessLaunchFailed`]; no
    /// events are produced for them.
    pub fn spawn(&self, command_line: &str) -> Result<RunHandle> {
        let (program, args) = split_command_line(command_line)?;

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.config.merge_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_directory {
            command.current_dir(dir);
        }
        // Own process group, so cancelling reaches whatever the scanner spawned
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| Error::ProcessLaunchFailed {
            command: program.clone(),
            reason: e.to_string(),
        })?;
        let pid = child.id();
        info!("Started '{}' (pid {:?})", command_line, pid);

        // Capacity was validated, but a zero would panic inside tokio
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump_lines(stdout, tx.clone(), "stdout")));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump_lines(stderr, tx.clone(), "stderr")));
        }

        let (canceller, cancel_rx) = Canceller::new();
        let grace = Duration::from_millis(self.config.terminate_grace_ms);
        tokio::spawn(supervise(child, readers, tx, cancel_rx, grace));

        Ok(RunHandle {
            events: rx,
            canceller,
            pid,
            command: command_line.to_string(),
        })
    }

    /// Start `command_line` and deliver its events to callbacks.
    ///
    /// Returns immediately. `on_line` receives each line in order,
    /// `on_exit` fires exactly once after the last line, and `on_error`
    /// receives launch and mid-run failures. On a launch failure only
    /// `on_error` fires and `None` is returned.
    pub fn run<L, X, E>(
        &self,
        command_line: &str,
        on_line: L,
        on_exit: X,
        on_error: E,
    ) -> Option<RunTask>
    where
        L: FnMut(String) + Send + 'static,
        X: FnOnce(i32) + Send + 'static,
        E: Fn(String) + Send + 'static,
    {
        match self.spawn(command_line) {
            Ok(handle) => Some(handle.deliver(on_line, on_exit, on_error)),
            Err(e) => {
                on_error(e.to_string());
                None
            }
        }
    }
}

/// Forward lines from one pipe until it closes; true if reading failed
async fn pump_lines<R>(reader: R, tx: mpsc::Sender<RunEvent>, stream: &'static str) -> bool
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(RunEvent::Line(decode_line(&buf))).await.is_err() {
                    debug!("{} receiver dropped, stopping reader", stream);
                    break;
                }
            }
            Err(e) => {
                let err = Error::ProcessIoFailed {
                    reason: format!("{}: {}", stream, e),
                };
                warn!("{}", err);
                let _ = tx.send(RunEvent::Error(err.to_string())).await;
                return true;
            }
        }
    }
    debug!("{} reader exiting", stream);
    false
}

/// One line of output with its terminator normalized to `\n`
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let mut line = String::from_utf8_lossy(bytes).into_owned();
    line.push('\n');
    line
}

/// Resolve when cancellation is requested or nobody listens anymore
async fn cancel_requested(cancel_rx: &mut watch::Receiver<bool>, tx: &mpsc::Sender<RunEvent>) {
    tokio::select! {
        cancellers_gone = async { cancel_rx.wait_for(|&cancelled| cancelled).await.is_err() } => {
            if cancellers_gone {
                // Every canceller is gone; only a dropped receiver can stop us now
                tx.closed().await;
            }
        }
        _ = tx.closed() => {
            debug!("Event receiver dropped, terminating process");
        }
    }
}

/// Wait for the child, then for its readers, then report the exit status.
///
/// Readers finish when every holder of the pipes is gone, which includes
/// background processes the scanner left behind. Cancellation is honored in
/// both phases; readers still open `grace` after it are killed with their
/// process group and aborted.
async fn supervise(
    mut child: Child,
    readers: Vec<JoinHandle<bool>>,
    tx: mpsc::Sender<RunEvent>,
    mut cancel_rx: watch::Receiver<bool>,
    grace: Duration,
) {
    let pgid = child.id();
    let mut cancelled = false;
    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel_requested(&mut cancel_rx, &tx) => {
            cancelled = true;
            terminate(&mut child, pgid, grace).await
        }
    };

    let aborts: Vec<AbortHandle> = readers.iter().map(JoinHandle::abort_handle).collect();
    let mut drained = std::pin::pin!(futures::future::join_all(readers));
    let mut results = None;

    if !cancelled {
        tokio::select! {
            done = &mut drained => results = Some(done),
            _ = cancel_requested(&mut cancel_rx, &tx) => {
                debug!("Cancelled while output is still open, stopping process group");
                signal_group(pgid, false);
            }
        }
    }

    let results = match results {
        Some(results) => results,
        None => match tokio::time::timeout(grace, &mut drained).await {
            Ok(results) => results,
            Err(_) => {
                debug!("Output still open {:?} after cancellation, killing", grace);
                signal_group(pgid, true);
                for abort in &aborts {
                    abort.abort();
                }
                // Aborted readers can no longer send once this resolves
                drained.await
            }
        },
    };
    let io_failed = results.iter().any(|result| matches!(result, Ok(true)));

    let code = match status {
        Ok(status) if !io_failed => exit_code(status),
        Ok(_) => UNKNOWN_EXIT_CODE,
        Err(e) => {
            let err = Error::ProcessIoFailed {
                reason: e.to_string(),
            };
            warn!("{}", err);
            let _ = tx.send(RunEvent::Error(err.to_string())).await;
            UNKNOWN_EXIT_CODE
        }
    };
    info!("Process exited with code {}", code);
    let _ = tx.send(RunEvent::Exited(code)).await;
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(UNKNOWN_EXIT_CODE)
}

/// SIGTERM the process group, wait up to `grace`, then kill
async fn terminate(
    child: &mut Child,
    pgid: Option<u32>,
    grace: Duration,
) -> std::io::Result<ExitStatus> {
    if signal_group(pgid, false) {
        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            return status;
        }
        debug!("Process group {:?} ignored SIGTERM for {:?}, killing", pgid, grace);
        signal_group(pgid, true);
    }

    if let Err(e) = child.kill().await {
        // Usually the process exited on its own just now
        debug!("Kill failed: {}", e);
    }
    child.wait().await
}

/// Send SIGTERM, or SIGKILL when `hard`, to the whole process group.
///
/// Returns whether a signal was delivered.
#[cfg(unix)]
fn signal_group(pgid: Option<u32>, hard: bool) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pgid else {
        return false;
    };
    let signal = if hard { Signal::SIGKILL } else { Signal::SIGTERM };
    match killpg(Pid::from_raw(pgid as i32), signal) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(e) => {
            warn!("Failed to send {} to group {}: {}", signal, pgid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_pgid: Option<u32>, _hard: bool) -> bool {
    false
}
