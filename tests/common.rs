//! Shared test utilities for E2E tests
//!
//! The worker under test is a shell script that just sleeps; its "health
//! endpoint" is served by an in-test HTTP responder whose answer can be
//! toggled between 200 and 503. The supervisor is pointed at the responder's
//! port, so health and process lifetime can be driven independently.

use sidecar_engine::domain::{HealthPolicy, HealthState, HealthStatus};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Short timings so a full outage/recovery cycle fits in a few seconds
pub fn fast_policy() -> HealthPolicy {
    HealthPolicy::default()
        .with_grace_period(Duration::from_millis(300))
        .with_interval(Duration::from_millis(200))
        .with_timeout(Duration::from_millis(500))
        .with_latency_threshold(Duration::from_millis(400))
        .with_failure_threshold(2)
        .with_max_restart_attempts(2)
}

pub fn setup_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Write an executable worker script into `dir`
#[cfg(unix)]
pub fn write_worker_script(dir: &TempDir, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join("cliproxy");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write worker");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod worker");
    path
}

/// HTTP responder standing in for the worker's health endpoint
pub struct HealthResponder {
    pub port: u16,
    healthy: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl HealthResponder {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind responder");
        let port = listener.local_addr().expect("No local addr").port();
        let healthy = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(AtomicUsize::new(0));

        let task = {
            let healthy = healthy.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let healthy = healthy.load(Ordering::SeqCst);
                    requests.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = stream.read(&mut buf).await;
                        let response = if healthy {
                            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok"
                        } else {
                            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        };
                        let _ = stream.write_all(response.as_bytes()).await;
                        let _ = stream.shutdown().await;
                    });
                }
            })
        };

        Self {
            port,
            healthy,
            requests,
            task,
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for HealthResponder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Wait until the supervisor reports `state`, panicking after `limit`
pub async fn wait_for_state(
    status: &mut watch::Receiver<HealthStatus>,
    state: HealthState,
    limit: Duration,
) -> HealthStatus {
    let reached = tokio::time::timeout(limit, status.wait_for(|s| s.state == state))
        .await
        .map(|result| result.map(|snapshot| snapshot.clone()));

    match reached {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(_)) => panic!("status channel closed while waiting for {state}"),
        Err(_) => panic!(
            "timed out waiting for {state}, last status: {:?}",
            *status.borrow()
        ),
    }
}
