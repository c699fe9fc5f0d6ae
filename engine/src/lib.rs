//! Sidecar supervisor engine
//!
//! Owns one local worker process (`cliproxy`) and keeps it healthy:
//!
//! - `infrastructure::ProcessHandle` spawns, stops and restarts the worker and
//!   relays its output and exit as `ProcessEvent`s
//! - `domain::HealthSupervisor` polls the worker's HTTP health endpoint, tracks
//!   `HealthState`, and restarts the worker a bounded number of times
//!
//! ```rust,no_run
//! use sidecar_engine::domain::{HealthPolicy, HealthSupervisor};
//! use sidecar_engine::infrastructure::{ProcessHandle, StandardHealthCheckExecutor, WorkerSpec};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let process = Arc::new(ProcessHandle::new(WorkerSpec::new(
//!     "/opt/kp/binaries/cliproxy",
//!     "/home/user/.kp/config.yaml",
//! )));
//! let checker = Arc::new(StandardHealthCheckExecutor::new());
//! let supervisor = HealthSupervisor::new(process, checker, HealthPolicy::default());
//!
//! supervisor.start().await;
//! # }
//! ```

pub mod constants;
pub mod domain;
pub mod infrastructure;
