//! Notifications emitted by the worker process and the health supervisor
//!
//! Process events (`Started`, `Stopped`, `Error`, `Log`) describe the OS-level
//! lifecycle and are independent of health state. `HealthStateChanged` is
//! fired by the supervisor on every state transition.

use crate::domain::{HealthState, HealthStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a captured output line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Raw lifecycle event of the worker process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProcessEvent {
    /// The worker was spawned
    Started { pid: u32 },
    /// The worker exited; `None` when terminated by a signal
    Stopped { exit_code: Option<i32> },
    /// Spawn-level failure (missing binary, permission denied, ...)
    Error { message: String },
    /// One non-empty line of worker output
    Log { stream: OutputStream, line: String },
}

/// Fired by the supervisor whenever its state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStateChanged {
    pub previous: HealthState,
    pub status: HealthStatus,
}
