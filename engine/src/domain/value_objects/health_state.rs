//! Health state value objects
//! Supervisor state enum and the status snapshot exposed to callers

use crate::domain::{HealthPolicy, ProbeOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// State of the supervised worker as seen by the health supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Not supervised. Initial state, and the state after `stop()`
    #[default]
    Stopped,
    /// Spawned (or restarting), grace period running
    Starting,
    /// Last poll succeeded within the latency threshold
    Healthy,
    /// Last poll was slow, or failed below the failure threshold
    Degraded,
    /// Failure threshold reached, restart pending
    Unreachable,
    /// Spawn failed or restarts exhausted; waits for an explicit start/stop
    Failed,
}

impl HealthState {
    /// Poll results arriving in these states are discarded
    pub fn ignores_probes(self) -> bool {
        matches!(self, HealthState::Stopped | HealthState::Failed)
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Stopped => write!(f, "stopped"),
            HealthState::Starting => write!(f, "starting"),
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Unreachable => write!(f, "unreachable"),
            HealthState::Failed => write!(f, "failed"),
        }
    }
}

/// Snapshot of the supervisor's health bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub state: HealthState,
    /// Wall-clock time of the last completed poll
    pub last_check: Option<SystemTime>,
    /// Failed polls since the last healthy one
    pub consecutive_failures: u32,
    /// Automatic restart cycles since the last healthy poll or explicit start/stop
    pub restart_attempts: u32,
}

impl HealthStatus {
    /// Fold a probe outcome into the counters and return the state it leads to.
    ///
    /// The state field itself is left untouched; the supervisor applies it so
    /// that transitions are notified in one place.
    pub fn record_probe(&mut self, outcome: &ProbeOutcome, policy: &HealthPolicy) -> HealthState {
        self.last_check = Some(SystemTime::now());

        match outcome {
            ProbeOutcome::Success { latency } if *latency <= policy.latency_threshold => {
                self.consecutive_failures = 0;
                self.restart_attempts = 0;
                HealthState::Healthy
            }
            ProbeOutcome::Success { .. } => HealthState::Degraded,
            ProbeOutcome::Failure { .. } => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures < policy.failure_threshold {
                    HealthState::Degraded
                } else {
                    HealthState::Unreachable
                }
            }
        }
    }

    pub fn reset_counters(&mut self) {
        self.consecutive_failures = 0;
        self.restart_attempts = 0;
    }
}
