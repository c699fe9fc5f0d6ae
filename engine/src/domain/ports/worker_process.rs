//! WorkerProcess port
//! Interface the supervisor uses to drive the worker's OS lifecycle

use crate::domain::{DomainError, ProcessEvent};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Port for owning exactly one worker process
#[async_trait]
pub trait WorkerProcess: Send + Sync {
    /// Spawn the worker. No-op when already running.
    /// Fails with `BinaryNotFound` or `SpawnFailed`; both are fatal.
    async fn start(&self) -> Result<(), DomainError>;

    /// Terminate the worker (graceful, then forced) and return once its exit
    /// has been observed, so a following `start()` spawns a fresh worker.
    /// No-op when not running.
    async fn stop(&self);

    /// `stop()`, then `start()` again
    async fn restart(&self) -> Result<(), DomainError>;

    /// True while a spawned worker has not been observed to exit
    fn is_running(&self) -> bool;

    /// Port the worker listens on (and the health endpoint is served from)
    fn port(&self) -> u16;

    /// Receive lifecycle events of subsequent runs
    fn subscribe(&self) -> broadcast::Receiver<ProcessEvent>;
}
