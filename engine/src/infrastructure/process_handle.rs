//! Tokio-backed worker process handle
//! Real implementation of the WorkerProcess port
//!
//! - Spawns `<binary> -config <config>` with the host environment
//! - Relays stdout/stderr lines and the exit code as `ProcessEvent`s
//! - Unix: SIGTERM, then SIGKILL once the stop timeout elapses
//! - Windows: `taskkill /f /t` right away, there is no graceful phase

use crate::constants::process as defaults;
use crate::domain::ports::WorkerProcess;
use crate::domain::{DomainError, OutputStream, ProcessEvent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Static description of the worker to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub binary_path: PathBuf,
    pub config_path: PathBuf,
    pub port: u16,
    /// Window between SIGTERM and SIGKILL
    pub stop_timeout: Duration,
    /// Respawn with backoff after the worker exits on its own with a failure
    pub auto_restart: bool,
}

impl WorkerSpec {
    pub fn new(binary_path: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            config_path: config_path.into(),
            port: defaults::DEFAULT_PORT,
            stop_timeout: defaults::STOP_TIMEOUT,
            auto_restart: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn with_auto_restart(mut self, auto_restart: bool) -> Self {
        self.auto_restart = auto_restart;
        self
    }
}

/// Owns at most one running worker process
///
/// Cloning yields another handle to the same worker.
#[derive(Clone)]
pub struct ProcessHandle {
    shared: Arc<HandleShared>,
}

struct HandleShared {
    binary_path: PathBuf,
    config_path: PathBuf,
    port: AtomicU16,
    stop_timeout: Duration,
    auto_restart: AtomicBool,
    run: Mutex<RunState>,
    running_tx: watch::Sender<bool>,
    events: broadcast::Sender<ProcessEvent>,
}

#[derive(Debug, Default)]
struct RunState {
    pid: Option<u32>,
    exit_code: Option<i32>,
    /// Identifies the current child for the SIGKILL escalation
    run_id: u64,
    /// Bumped by every spawn and stop; a pending exit restart only fires if unchanged
    epoch: u64,
    stop_requested: bool,
    exit_restarts: u32,
}

#[derive(Debug, Clone, Copy)]
enum SpawnTrigger {
    /// Caller-initiated start or restart
    Explicit,
    /// Backoff respawn scheduled at `epoch`
    ExitRestart { epoch: u64 },
}

impl ProcessHandle {
    pub fn new(spec: WorkerSpec) -> Self {
        let (running_tx, _) = watch::channel(false);
        let (events, _) = broadcast::channel(defaults::EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(HandleShared {
                binary_path: spec.binary_path,
                config_path: spec.config_path,
                port: AtomicU16::new(spec.port),
                stop_timeout: spec.stop_timeout,
                auto_restart: AtomicBool::new(spec.auto_restart),
                run: Mutex::new(RunState::default()),
                running_tx,
                events,
            }),
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.shared.binary_path
    }

    pub fn config_path(&self) -> &Path {
        &self.shared.config_path
    }

    pub fn port(&self) -> u16 {
        self.shared.port.load(Ordering::SeqCst)
    }

    /// Takes effect on the next start
    pub fn set_port(&self, port: u16) {
        self.shared.port.store(port, Ordering::SeqCst);
    }

    pub fn set_auto_restart(&self, enabled: bool) {
        self.shared.auto_restart.store(enabled, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock_run().pid.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.shared.lock_run().pid
    }

    /// Exit code of the last run; `None` while running, before the first exit,
    /// or when the worker was killed by a signal
    pub fn exit_code(&self) -> Option<i32> {
        self.shared.lock_run().exit_code
    }

    fn spawn_worker(&self, trigger: SpawnTrigger) -> Result<(), DomainError> {
        let shared = &self.shared;
        let mut run = shared.lock_run();

        if let Some(pid) = run.pid {
            debug!(pid = pid, "Worker already running");
            return Ok(());
        }

        match trigger {
            SpawnTrigger::Explicit => run.exit_restarts = 0,
            SpawnTrigger::ExitRestart { epoch } if epoch != run.epoch => {
                debug!("Pending worker respawn cancelled");
                return Ok(());
            }
            SpawnTrigger::ExitRestart { .. } => {}
        }
        run.epoch += 1;

        if !shared.binary_path.exists() {
            let err = DomainError::BinaryNotFound(shared.binary_path.display().to_string());
            error!(path = %shared.binary_path.display(), "Worker binary not found");
            shared.emit(ProcessEvent::Error {
                message: err.to_string(),
            });
            return Err(err);
        }

        let mut cmd = Command::new(&shared.binary_path);
        cmd.arg(defaults::CONFIG_FLAG).arg(&shared.config_path);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            error!(
                path = %shared.binary_path.display(),
                error = %e,
                "Failed to spawn worker"
            );
            let err = DomainError::SpawnFailed(e.to_string());
            shared.emit(ProcessEvent::Error {
                message: err.to_string(),
            });
            err
        })?;

        let pid = child.id().unwrap_or_default();
        run.run_id += 1;
        run.pid = Some(pid);
        run.exit_code = None;
        run.stop_requested = false;
        drop(run);

        shared.running_tx.send_replace(true);
        info!(
            pid = pid,
            port = self.port(),
            binary = %shared.binary_path.display(),
            "Worker spawned"
        );
        shared.emit(ProcessEvent::Started { pid });

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, OutputStream::Stdout, shared.events.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, OutputStream::Stderr, shared.events.clone());
        }

        let handle = self.clone();
        tokio::spawn(async move { handle.watch_exit(child).await });

        Ok(())
    }

    /// Await the child's exit, clear the reference and notify listeners
    async fn watch_exit(self, mut child: Child) {
        let exit_code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(error = %e, "Failed to wait for worker exit");
                None
            }
        };

        let respawn = {
            let mut run = self.shared.lock_run();
            run.pid = None;
            run.exit_code = exit_code;
            self.plan_exit_restart(&mut run, exit_code)
        };

        self.shared.running_tx.send_replace(false);
        info!(exit_code = ?exit_code, "Worker exited");
        self.shared.emit(ProcessEvent::Stopped { exit_code });

        if let Some((delay, epoch)) = respawn {
            self.schedule_exit_restart(delay, epoch);
        }
    }

    fn plan_exit_restart(&self, run: &mut RunState, exit_code: Option<i32>) -> Option<(Duration, u64)> {
        if !self.shared.auto_restart.load(Ordering::SeqCst)
            || run.stop_requested
            || exit_code == Some(0)
        {
            return None;
        }

        if run.exit_restarts >= defaults::MAX_EXIT_RESTARTS {
            warn!(
                exit_restarts = run.exit_restarts,
                "Worker keeps exiting, giving up on automatic respawn"
            );
            return None;
        }

        run.exit_restarts += 1;
        Some((exit_restart_delay(run.exit_restarts), run.epoch))
    }

    fn schedule_exit_restart(&self, delay: Duration, epoch: u64) {
        info!(
            delay_ms = delay.as_millis() as u64,
            "Worker exited unexpectedly, scheduling respawn"
        );

        let handle = self.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = handle.spawn_worker(SpawnTrigger::ExitRestart { epoch }) {
                warn!(error = %e, "Worker respawn failed");
            }
        });
    }

    /// Terminate the worker and wait until its exit has been observed.
    /// Returns false if it is still running once the wait bound elapses.
    async fn stop_and_wait(&self) -> bool {
        let mut running = self.shared.running_tx.subscribe();
        self.terminate();

        let limit = self.shared.stop_timeout + defaults::EXIT_WAIT_MARGIN;
        let exited = timeout(limit, running.wait_for(|running| !*running))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false);

        if !exited {
            warn!(
                pid = ?self.pid(),
                wait_ms = limit.as_millis() as u64,
                "Worker exit not observed after stop"
            );
        }
        exited
    }

    /// Request termination; the exit itself is observed by `watch_exit`
    fn terminate(&self) {
        let (pid, run_id) = {
            let mut run = self.shared.lock_run();
            run.epoch += 1;
            match run.pid {
                Some(pid) => {
                    run.stop_requested = true;
                    (pid, run.run_id)
                }
                None => return,
            }
        };

        info!(pid = pid, "Stopping worker");

        #[cfg(unix)]
        {
            if let Err(e) = send_signal(pid, libc::SIGTERM) {
                warn!(pid = pid, error = %e, "Failed to send SIGTERM to worker");
            }
            self.escalate_after_timeout(pid, run_id);
        }

        #[cfg(windows)]
        {
            let _ = run_id;
            kill_process_tree(pid);
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = run_id;
            warn!(pid = pid, "Process termination not implemented on this platform");
        }
    }

    /// SIGKILL the same child if it outlives the stop timeout
    #[cfg(unix)]
    fn escalate_after_timeout(&self, pid: u32, run_id: u64) {
        let handle = self.clone();
        let stop_timeout = self.shared.stop_timeout;
        let mut running = self.shared.running_tx.subscribe();

        tokio::spawn(async move {
            let exited = timeout(stop_timeout, running.wait_for(|running| !*running))
                .await
                .map(|result| result.is_ok())
                .unwrap_or(false);
            if exited {
                return;
            }

            let still_running = {
                let run = handle.shared.lock_run();
                run.run_id == run_id && run.pid.is_some()
            };
            if still_running {
                warn!(
                    pid = pid,
                    timeout_ms = stop_timeout.as_millis() as u64,
                    "Worker still running after SIGTERM, sending SIGKILL"
                );
                if let Err(e) = send_signal(pid, libc::SIGKILL) {
                    warn!(pid = pid, error = %e, "Failed to send SIGKILL to worker");
                }
            }
        });
    }
}

#[async_trait]
impl WorkerProcess for ProcessHandle {
    async fn start(&self) -> Result<(), DomainError> {
        self.spawn_worker(SpawnTrigger::Explicit)
    }

    async fn stop(&self) {
        self.stop_and_wait().await;
    }

    async fn restart(&self) -> Result<(), DomainError> {
        if !self.stop_and_wait().await {
            return Err(DomainError::SpawnFailed(
                "previous worker did not exit".to_string(),
            ));
        }
        self.spawn_worker(SpawnTrigger::Explicit)
    }

    fn is_running(&self) -> bool {
        ProcessHandle::is_running(self)
    }

    fn port(&self) -> u16 {
        ProcessHandle::port(self)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.shared.events.subscribe()
    }
}

impl HandleShared {
    fn lock_run(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ProcessEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Backoff before the `attempt`-th respawn: 1s, 2s, 4s, ... capped at 10s
pub fn exit_restart_delay(attempt: u32) -> Duration {
    let factor = 1u32
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    defaults::EXIT_RESTART_BASE_DELAY
        .saturating_mul(factor)
        .min(defaults::EXIT_RESTART_MAX_DELAY)
}

/// Relay non-empty output lines; invalid UTF-8 is replaced, never fatal
fn forward_lines<R>(reader: R, stream: OutputStream, events: broadcast::Sender<ProcessEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim_end();
                    if !line.trim().is_empty() {
                        let _ = events.send(ProcessEvent::Log {
                            stream,
                            line: line.to_string(),
                        });
                    }
                }
                Err(e) => {
                    debug!(stream = %stream, error = %e, "Stopped reading worker output");
                    break;
                }
            }
        }
    });
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    // pid 0 would address our own process group
    if pid == 0 {
        return Ok(());
    }
    let result = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
fn kill_process_tree(pid: u32) {
    let result = std::process::Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/f", "/t"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match result {
        Ok(_) => debug!(pid = pid, "Issued taskkill for worker process tree"),
        Err(e) => warn!(pid = pid, error = %e, "Failed to run taskkill"),
    }
}
