//! Health supervisor
//! Sequences worker start, grace period, health polling, failure accounting
//! and bounded automatic restart for a single worker process.
//!
//! All timers of one `start()` live in a single monitor task (grace phase,
//! poll phase, restart phase). `stop()` aborts it and bumps the epoch, so a
//! probe that resolves after a stop can never mutate the status.

use crate::domain::ports::{HealthCheckExecutor, WorkerProcess};
use crate::domain::{
    HealthPolicy, HealthState, HealthStateChanged, HealthStatus, ProbeOutcome, ProcessEvent,
};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const STATE_CHANNEL_CAPACITY: usize = 64;

/// Supervises one worker process through its health endpoint
pub struct HealthSupervisor {
    shared: Arc<Shared>,
}

struct Shared {
    process: Arc<dyn WorkerProcess>,
    checker: Arc<dyn HealthCheckExecutor>,
    policy: HealthPolicy,
    control: Mutex<Control>,
    /// Current monitor task; only touched synchronously so `Drop` can always reach it
    monitor: StdMutex<Option<JoinHandle<()>>>,
    status_tx: watch::Sender<HealthStatus>,
    changes_tx: broadcast::Sender<HealthStateChanged>,
}

#[derive(Default)]
struct Control {
    /// Set from `start()` until the grace period ends or the spawn fails
    starting: bool,
    /// Bumped on every start/stop; monitors of older epochs are stale
    epoch: u64,
}

/// Why a poll phase ended
enum PollExit {
    Unreachable,
    Cancelled,
}

impl HealthSupervisor {
    pub fn new(
        process: Arc<dyn WorkerProcess>,
        checker: Arc<dyn HealthCheckExecutor>,
        policy: HealthPolicy,
    ) -> Self {
        let (status_tx, _) = watch::channel(HealthStatus::default());
        let (changes_tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                process,
                checker,
                policy,
                control: Mutex::new(Control::default()),
                monitor: StdMutex::new(None),
                status_tx,
                changes_tx,
            }),
        }
    }

    /// Spawn the worker and arm the grace period.
    ///
    /// Ignored while a previous start is still in its grace period. A spawn
    /// failure parks the supervisor in `Failed`; it is reported through the
    /// status surface only.
    pub async fn start(&self) {
        let mut control = self.shared.control.lock().await;
        if control.starting {
            debug!("Start already in progress, ignoring");
            return;
        }

        self.shared.halt(&mut control).await;
        control.starting = true;
        let epoch = control.epoch;

        self.shared.update(|status| {
            status.consecutive_failures = 0;
            status.state = HealthState::Starting;
        });

        if let Err(e) = self.shared.process.start().await {
            control.starting = false;
            error!(error = %e, "Failed to start worker");
            self.shared.update(|status| status.state = HealthState::Failed);
            return;
        }

        info!(
            port = self.shared.process.port(),
            grace_ms = self.shared.policy.grace_period.as_millis() as u64,
            "Worker spawned, waiting for grace period"
        );

        let shared = Arc::clone(&self.shared);
        let monitor = tokio::spawn(shared.run_monitor(epoch));
        *self.shared.lock_monitor() = Some(monitor);
    }

    /// Cancel all timers, terminate the worker and reset both counters
    pub async fn stop(&self) {
        let mut control = self.shared.control.lock().await;
        self.shared.halt(&mut control).await;
    }

    /// Clear the restart counter without a full stop/start cycle
    pub fn reset_restart_attempts(&self) {
        info!("Resetting restart attempts");
        self.shared
            .status_tx
            .send_modify(|status| status.restart_attempts = 0);
    }

    /// Current status snapshot
    pub fn get_status(&self) -> HealthStatus {
        self.shared.status()
    }

    /// Receive a notification for every state transition
    pub fn subscribe(&self) -> broadcast::Receiver<HealthStateChanged> {
        self.shared.changes_tx.subscribe()
    }

    /// Follow the latest status, including counter-only changes
    pub fn watch_status(&self) -> watch::Receiver<HealthStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Raw lifecycle events of the supervised worker
    pub fn subscribe_process_events(&self) -> broadcast::Receiver<ProcessEvent> {
        self.shared.process.subscribe()
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.shared.policy
    }
}

impl Drop for HealthSupervisor {
    fn drop(&mut self) {
        self.shared.abort_monitor();
    }
}

impl Shared {
    fn lock_monitor(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abort_monitor(&self) {
        if let Some(monitor) = self.lock_monitor().take() {
            monitor.abort();
        }
    }

    fn status(&self) -> HealthStatus {
        self.status_tx.borrow().clone()
    }

    /// Mutate the status; notify subscribers when the state changed
    fn update(&self, update: impl FnOnce(&mut HealthStatus)) {
        let mut previous = HealthState::default();
        let mut changed = false;
        self.status_tx.send_modify(|status| {
            previous = status.state;
            update(status);
            changed = status.state != previous;
        });

        if changed {
            let status = self.status();
            info!(
                previous = %previous,
                state = %status.state,
                consecutive_failures = status.consecutive_failures,
                restart_attempts = status.restart_attempts,
                "Health state transition"
            );
            // No subscribers is fine
            let _ = self.changes_tx.send(HealthStateChanged { previous, status });
        }
    }

    /// Bring everything to `Stopped`. Caller holds the control lock.
    async fn halt(&self, control: &mut Control) {
        control.starting = false;
        control.epoch += 1;

        self.abort_monitor();

        if self.process.is_running() {
            self.process.stop().await;
        }

        self.update(|status| {
            status.reset_counters();
            status.state = HealthState::Stopped;
        });
    }

    async fn run_monitor(self: Arc<Self>, epoch: u64) {
        sleep(self.policy.grace_period).await;

        {
            let mut control = self.control.lock().await;
            if control.epoch != epoch {
                return;
            }
            control.starting = false;
        }
        debug!("Grace period elapsed, polling worker health");

        loop {
            match self.poll(epoch).await {
                PollExit::Cancelled => break,
                PollExit::Unreachable => {}
            }

            if !self.recover(epoch).await {
                break;
            }
        }

        debug!(epoch = epoch, "Health monitor stopped");
    }

    /// Poll until the failure threshold is reached or the epoch goes stale.
    /// Checks are awaited inline, so a slow check delays (never overlaps) the next.
    async fn poll(&self, epoch: u64) -> PollExit {
        let mut ticker = interval(self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let port = self.process.port();
            let outcome = self.checker.check(port, self.policy.timeout).await;

            let control = self.control.lock().await;
            if control.epoch != epoch || self.status().state.ignores_probes() {
                debug!(outcome = %outcome, "Discarding stale health check result");
                return PollExit::Cancelled;
            }

            let mut next = HealthState::Stopped;
            self.update(|status| {
                next = status.record_probe(&outcome, &self.policy);
                status.state = next;
            });
            drop(control);

            match &outcome {
                ProbeOutcome::Failure { reason } => {
                    warn!(
                        port = port,
                        error = %reason,
                        consecutive_failures = self.status().consecutive_failures,
                        threshold = self.policy.failure_threshold,
                        "Health check failed"
                    );
                }
                ProbeOutcome::Success { latency } if next == HealthState::Degraded => {
                    warn!(
                        port = port,
                        latency_ms = latency.as_millis() as u64,
                        "Health check slow"
                    );
                }
                ProbeOutcome::Success { latency } => {
                    debug!(
                        port = port,
                        latency_ms = latency.as_millis() as u64,
                        "Health check passed"
                    );
                }
            }

            if next == HealthState::Unreachable {
                return PollExit::Unreachable;
            }
        }
    }

    /// Restart the worker until it is back in its grace period or the
    /// attempt budget is spent. Returns false when monitoring must end.
    async fn recover(&self, epoch: u64) -> bool {
        loop {
            {
                let control = self.control.lock().await;
                if control.epoch != epoch {
                    return false;
                }

                let attempts = self.status().restart_attempts;
                if attempts >= self.policy.max_restart_attempts {
                    self.update(|status| status.state = HealthState::Failed);
                    error!(
                        restart_attempts = attempts,
                        "Max restart attempts reached, worker failed"
                    );
                    return false;
                }

                self.update(|status| {
                    status.restart_attempts += 1;
                    status.consecutive_failures = 0;
                    status.state = HealthState::Starting;
                });
                info!(
                    attempt = attempts + 1,
                    max_attempts = self.policy.max_restart_attempts,
                    "Attempting worker restart"
                );
            }

            match self.process.restart().await {
                Ok(()) => break,
                Err(e) => error!(error = %e, "Worker restart failed"),
            }
        }

        sleep(self.policy.grace_period).await;

        let control = self.control.lock().await;
        control.epoch == epoch
    }
}
