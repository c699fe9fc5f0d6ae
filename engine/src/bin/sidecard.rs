//! Sidecar supervisor daemon
//!
//! Runs one worker under the health supervisor until Ctrl-C or SIGTERM.

#[path = "sidecard/config.rs"]
mod config;

use config::DaemonConfig;
use sidecar_engine::domain::ports::WorkerProcess;
use sidecar_engine::domain::{HealthStateChanged, HealthSupervisor, OutputStream, ProcessEvent};
use sidecar_engine::infrastructure::{ProcessHandle, StandardHealthCheckExecutor, SupervisorConfig};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let daemon_config = DaemonConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&daemon_config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    daemon_config.validate()?;
    let config_file = daemon_config.config_file.as_deref().unwrap_or_default();
    let mut config = SupervisorConfig::load(Path::new(config_file))?;
    if let Some(port) = daemon_config.port {
        config.port = port;
    }
    if let Some(auto_restart) = daemon_config.auto_restart {
        config.auto_restart_on_exit = auto_restart;
    }
    config.validate()?;

    let spec = config.worker_spec()?;
    info!(
        config = %config_file,
        binary = %spec.binary_path.display(),
        worker_config = %spec.config_path.display(),
        port = spec.port,
        "Starting sidecar supervisor"
    );

    let process = Arc::new(ProcessHandle::new(spec));
    let checker = Arc::new(StandardHealthCheckExecutor::new());
    let supervisor = HealthSupervisor::new(process.clone(), checker, config.health_policy());

    tokio::spawn(forward_process_events(process.subscribe()));
    tokio::spawn(log_state_changes(supervisor.subscribe()));

    let policy = supervisor.policy();
    info!(
        grace_ms = policy.grace_period.as_millis() as u64,
        interval_ms = policy.interval.as_millis() as u64,
        failure_threshold = policy.failure_threshold,
        max_restart_attempts = policy.max_restart_attempts,
        "Health policy"
    );

    supervisor.start().await;

    shutdown_signal().await;

    info!("Stopping sidecar supervisor");
    // Returns once the worker's exit has been observed
    supervisor.stop().await;

    Ok(())
}

/// Relay worker output to `tracing` under the `worker` target
async fn forward_process_events(mut events: broadcast::Receiver<ProcessEvent>) {
    loop {
        match events.recv().await {
            Ok(ProcessEvent::Log { stream, line }) => match stream {
                OutputStream::Stdout => info!(target: "worker", "{}", line),
                OutputStream::Stderr => warn!(target: "worker", "{}", line),
            },
            Ok(ProcessEvent::Started { pid }) => info!(pid = pid, "Worker started"),
            Ok(ProcessEvent::Stopped { exit_code }) => {
                info!(exit_code = ?exit_code, "Worker stopped")
            }
            Ok(ProcessEvent::Error { message }) => error!(error = %message, "Worker error"),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "Dropped worker events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn log_state_changes(mut changes: broadcast::Receiver<HealthStateChanged>) {
    loop {
        match changes.recv().await {
            Ok(change) => info!(
                previous = %change.previous,
                state = %change.status.state,
                consecutive_failures = change.status.consecutive_failures,
                restart_attempts = change.status.restart_attempts,
                "Health state changed"
            ),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "Dropped health state changes");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl-C, initiating graceful shutdown");
}
