//! Process runner: spawn a rendered command and relay its output as events.
//!
//! One relay task per run owns the child exclusively and pushes events onto a
//! bounded channel:
//!
//!   Line(..)*  [Drain(..)]  Finished { code }      (normal exit / cancel)
//!   Line(..)*  Fault(..)    Finished { code: None } (spawn / read / wait fault)
//!
//! `Finished` is always last; the channel closes right after it.
//!
//! stdout and stderr share one OS pipe, so lines arrive in the order the
//! process tree wrote them. The pipe is read by a dedicated thread that feeds
//! the relay task. On Unix the child leads its own process group and
//! cancellation kills the whole group.

use std::io::{self, BufRead, BufReader, PipeReader};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::PackError;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// How long output may keep arriving after a cancelled child was reaped.
const CANCEL_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// One observation from a running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A newline-terminated chunk of stdout or stderr, terminator stripped.
    Line(String),
    /// Unterminated output left over when the streams closed.
    Drain(String),
    /// Spawn/read/wait failure; the run is over.
    Fault(String),
    /// Terminal event. `code` is `None` after a fault or a signal.
    Finished { code: Option<i32> },
}

impl RunEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunEvent::Finished { .. })
    }

    /// Recover the error value carried by a `Fault` event.
    pub fn as_fault(&self) -> Option<PackError> {
        match self {
            RunEvent::Fault(msg) => Some(PackError::ProcessFault(msg.clone())),
            _ => None,
        }
    }
}

/// How a rendered command string becomes a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpreter {
    /// `<program> <flag> "<command>"`, e.g. `sh -c` or `cmd /C`.
    Shell { program: String, flag: String },
    /// Split with shell-word rules and exec `argv[0]` directly.
    Direct,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::system_shell()
    }
}

impl Interpreter {
    pub fn system_shell() -> Self {
        if cfg!(windows) {
            Self::shell("cmd", "/C")
        } else {
            Self::shell("sh", "-c")
        }
    }

    pub fn shell(program: impl Into<String>, flag: impl Into<String>) -> Self {
        Interpreter::Shell {
            program: program.into(),
            flag: flag.into(),
        }
    }

    pub(crate) fn command(&self, line: &str) -> Result<Command, String> {
        match self {
            Interpreter::Shell { program, flag } => {
                let mut cmd = Command::new(program);
                cmd.arg(flag);
                push_command_line(&mut cmd, program, line);
                Ok(cmd)
            }
            Interpreter::Direct => {
                let parts = shell_words::split(line)
                    .map_err(|e| format!("failed to split command line: {e}"))?;
                let (program, args) = parts
                    .split_first()
                    .ok_or_else(|| "command line is empty".to_string())?;
                let mut cmd = Command::new(program);
                cmd.args(args);
                Ok(cmd)
            }
        }
    }
}

/// File name of a shell program, without directories or an `.exe` suffix.
///
/// Splits on both `/` and `\` so Windows paths resolve on any host.
pub fn shell_name(program: &str) -> &str {
    let name = program.rsplit(['/', '\\']).next().unwrap_or(program);
    match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".exe") => {
            &name[..cut]
        }
        _ => name,
    }
}

pub fn is_cmd_shell(program: &str) -> bool {
    shell_name(program).eq_ignore_ascii_case("cmd")
}

/// cmd.exe does not understand MSVC-style `\"` escapes: hand it the line
/// verbatim inside one pair of quotes.
#[cfg(windows)]
fn push_command_line(cmd: &mut Command, program: &str, line: &str) {
    if is_cmd_shell(program) {
        cmd.raw_arg(cmd_payload(line));
    } else {
        cmd.arg(line);
    }
}

#[cfg(not(windows))]
fn push_command_line(cmd: &mut Command, _program: &str, line: &str) {
    cmd.arg(line);
}

#[cfg(any(windows, test))]
fn cmd_payload(line: &str) -> String {
    format!("\"{line}\"")
}

/// Spawns runs. Does not itself prevent overlapping runs; see `Session`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interpreter: Interpreter,
    buffer: usize,
    working_dir: Option<PathBuf>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Interpreter::default())
    }
}

impl ProcessRunner {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            buffer: DEFAULT_EVENT_BUFFER,
            working_dir: None,
        }
    }

    /// Channel capacity (minimum 1).
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Start a run in the background. Must be called from within a Tokio runtime.
    pub fn start(&self, command: impl Into<String>) -> ProcessRun {
        let command = command.into();
        let (tx, rx) = mpsc::channel(self.buffer);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let prepared = self.interpreter.command(&command).map(|mut cmd| {
            if let Some(dir) = &self.working_dir {
                cmd.current_dir(dir);
            }
            cmd
        });

        debug!(command = %command, interpreter = ?self.interpreter, "starting run");
        let task = tokio::spawn(relay(prepared, self.buffer, tx, cancel_rx));

        ProcessRun {
            command,
            events: rx,
            cancel: Some(cancel_tx),
            task,
        }
    }
}

/// Handle to one active execution.
#[derive(Debug)]
pub struct ProcessRun {
    command: String,
    events: mpsc::Receiver<RunEvent>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ProcessRun {
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Next event in production order; `None` once `Finished` was delivered.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Ask the relay to kill the child. Output already produced is still
    /// delivered and `Finished` still fires. Repeated calls are no-ops.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the relay task to exit. Call after the event stream closed.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "relay task ended abnormally");
        }
    }

    /// Consume every remaining event.
    pub async fn collect(mut self) -> Vec<RunEvent> {
        let mut out = Vec::new();
        while let Some(ev) = self.next_event().await {
            out.push(ev);
        }
        self.join().await;
        out
    }
}

/* ---- Relay ---- */

async fn relay(
    prepared: Result<Command, String>,
    buffer: usize,
    tx: mpsc::Sender<RunEvent>,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut cmd = match prepared {
        Ok(cmd) => cmd,
        Err(msg) => return fault(&tx, msg).await,
    };
    let (pipe, stdout, stderr) = match merged_pipe() {
        Ok(p) => p,
        Err(e) => return fault(&tx, format!("failed to create output pipe: {e}")).await,
    };
    cmd.stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let spawned = cmd.spawn();
    // the command holds the parent's copies of the pipe writer
    drop(cmd);
    let mut child = match spawned {
        Ok(c) => c,
        Err(e) => return fault(&tx, format!("failed to start process: {e}")).await,
    };

    let (out_tx, mut output) = mpsc::channel(buffer);
    if let Err(e) = spawn_reader(pipe, out_tx) {
        kill_tree(&mut child);
        return fault(&tx, format!("failed to start output reader: {e}")).await;
    }

    let mut cancel_seen = false;
    let mut cancelled = false;
    let mut output_closed = false;

    while !cancelled {
        tokio::select! {
            msg = output.recv() => match msg {
                Some(Ok(ev)) => {
                    // receiver gone: keep draining so the child never blocks on a full pipe
                    let _ = tx.send(ev).await;
                }
                Some(Err(e)) => {
                    kill_tree(&mut child);
                    return fault(&tx, format!("failed to read process output: {e}")).await;
                }
                None => {
                    output_closed = true;
                    break;
                }
            },
            r = &mut cancel, if !cancel_seen => {
                cancel_seen = true;
                if r.is_ok() {
                    kill_tree(&mut child);
                    cancelled = true;
                }
            }
        }
    }

    let status = loop {
        tokio::select! {
            s = child.wait() => break s,
            r = &mut cancel, if !cancel_seen => {
                cancel_seen = true;
                if r.is_ok() {
                    kill_tree(&mut child);
                }
            }
        }
    };

    if !output_closed {
        drain_after_cancel(&mut output, &tx).await;
    }

    match status {
        Ok(status) => {
            debug!(code = ?status.code(), "process exited");
            let _ = tx.send(RunEvent::Finished { code: status.code() }).await;
        }
        Err(e) => fault(&tx, format!("failed to wait for process: {e}")).await,
    }
}

/// Forward what is still buffered once a cancelled child was reaped. A
/// descendant that escaped the kill may hold the pipe open; the reader is
/// detached after the grace period so `Finished` is not held back.
async fn drain_after_cancel(
    output: &mut mpsc::Receiver<io::Result<RunEvent>>,
    tx: &mpsc::Sender<RunEvent>,
) {
    let grace = tokio::time::sleep(CANCEL_DRAIN_GRACE);
    tokio::pin!(grace);
    loop {
        tokio::select! {
            msg = output.recv() => match msg {
                Some(Ok(ev)) => {
                    let _ = tx.send(ev).await;
                }
                Some(Err(_)) | None => return,
            },
            _ = &mut grace => {
                debug!("output pipe still open after cancel, detaching reader");
                output.close();
                return;
            }
        }
    }
}

/// One pipe, two write ends: stdout and stderr of the child.
fn merged_pipe() -> io::Result<(PipeReader, Stdio, Stdio)> {
    let (reader, writer) = io::pipe()?;
    let second = writer.try_clone()?;
    Ok((reader, Stdio::from(writer), Stdio::from(second)))
}

/// Blocking reader on a plain thread; an abandoned reader must not hold up
/// runtime shutdown the way a `spawn_blocking` task would.
fn spawn_reader(pipe: PipeReader, out: mpsc::Sender<io::Result<RunEvent>>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("packy-output".to_string())
        .spawn(move || read_merged(pipe, out))
        .map(|_| ())
}

fn read_merged(pipe: PipeReader, out: mpsc::Sender<io::Result<RunEvent>>) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) if buf.last() == Some(&b'\n') => {
                RunEvent::Line(String::from_utf8_lossy(strip_terminator(&buf)).into_owned())
            }
            // no terminator means the stream ended mid-line
            Ok(_) => {
                let _ = out.blocking_send(Ok(RunEvent::Drain(
                    String::from_utf8_lossy(&buf).into_owned(),
                )));
                return;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = out.blocking_send(Err(e));
                return;
            }
        };
        if out.blocking_send(Ok(ev)).is_err() {
            return;
        }
    }
}

fn strip_terminator(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Kill the child and everything it started.
fn kill_tree(child: &mut Child) {
    debug!(pid = ?child.id(), "killing process tree");
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // process_group(0) at spawn: the group id is the child's pid
            let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                warn!(error = %io::Error::last_os_error(), "failed to kill process group");
            }
        }
    }
    #[cfg(windows)]
    {
        if let Some(pid) = child.id() {
            let status = std::process::Command::new("taskkill")
                .args(["/T", "/F", "/PID", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            if let Err(e) = status {
                warn!(error = %e, "taskkill failed");
            }
        }
    }
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "child already gone");
    }
}

async fn fault(tx: &mpsc::Sender<RunEvent>, msg: String) {
    warn!(error = %msg, "process fault");
    let _ = tx.send(RunEvent::Fault(msg)).await;
    let _ = tx.send(RunEvent::Finished { code: None }).await;
}
