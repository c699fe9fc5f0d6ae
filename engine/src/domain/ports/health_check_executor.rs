//! Port for health check execution
//! Defines the interface for probing the worker's health endpoint

use crate::domain::ProbeOutcome;
use async_trait::async_trait;
use std::time::Duration;

/// Port for executing health checks
#[async_trait]
pub trait HealthCheckExecutor: Send + Sync {
    /// Probe the worker listening on `port`, giving up after `timeout`.
    /// Every failure mode is reported as `ProbeOutcome::Failure`.
    async fn check(&self, port: u16, timeout: Duration) -> ProbeOutcome;
}
