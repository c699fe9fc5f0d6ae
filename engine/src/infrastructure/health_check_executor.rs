//! Health check executor implementation
//! Probes the worker's HTTP health endpoint on the loopback interface

use crate::constants::health::{HEALTH_HOST, HEALTH_PATH};
use crate::domain::ports::HealthCheckExecutor;
use crate::domain::ProbeOutcome;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Standard health check executor
///
/// Issues `GET http://127.0.0.1:<port>/v1/diagnostics/health`. Any 2xx
/// response is a success carrying the measured latency; everything else
/// (other status codes, connection errors, timeouts) is a failure.
pub struct StandardHealthCheckExecutor {
    host: String,
}

impl StandardHealthCheckExecutor {
    pub fn new() -> Self {
        Self {
            host: HEALTH_HOST.to_string(),
        }
    }

    pub fn endpoint(&self, port: u16) -> String {
        format!("http://{}:{}{}", self.host, port, HEALTH_PATH)
    }
}

impl Default for StandardHealthCheckExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthCheckExecutor for StandardHealthCheckExecutor {
    async fn check(&self, port: u16, timeout: Duration) -> ProbeOutcome {
        let endpoint = self.endpoint(port);
        debug!(endpoint = %endpoint, "Performing HTTP health check");

        // ureq is blocking; keep it off the async workers
        let request = tokio::task::spawn_blocking(move || perform_http_check(&endpoint, timeout));

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(error = %e, "HTTP health check task failed");
                ProbeOutcome::failure(e.to_string())
            }
            Err(_) => ProbeOutcome::failure("Timeout"),
        }
    }
}

fn perform_http_check(endpoint: &str, timeout: Duration) -> ProbeOutcome {
    let agent = ureq::AgentBuilder::new()
        .timeout(timeout)
        .redirects(0)
        .build();

    let started = Instant::now();
    match agent.get(endpoint).call() {
        Ok(resp) => {
            let status = resp.status();
            // Drain the body so the latency covers the full response
            let _ = resp.into_string();
            let latency = started.elapsed();

            if (200..300).contains(&status) {
                debug!(
                    status = status,
                    latency_ms = latency.as_millis() as u64,
                    "HTTP health check succeeded"
                );
                ProbeOutcome::success(latency)
            } else {
                ProbeOutcome::failure(format!("HTTP {}", status))
            }
        }
        Err(ureq::Error::Status(code, _)) => ProbeOutcome::failure(format!("HTTP {}", code)),
        Err(e) => {
            let message = e.to_string();
            if message.contains("timed out") || message.contains("WouldBlock") {
                ProbeOutcome::failure("Timeout")
            } else {
                ProbeOutcome::failure(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Answer a single request with a canned HTTP response
    fn serve_once(response: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        port
    }

    #[test]
    fn test_endpoint_format() {
        let executor = StandardHealthCheckExecutor::new();
        assert_eq!(
            executor.endpoint(1337),
            "http://127.0.0.1:1337/v1/diagnostics/health"
        );
    }

    #[tokio::test]
    async fn test_http_check_success() {
        let port = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 15\r\nConnection: close\r\n\r\n{\"status\":\"ok\"}",
        );
        let executor = StandardHealthCheckExecutor::new();

        let outcome = executor.check(port, Duration::from_secs(2)).await;
        assert!(outcome.is_success(), "unexpected outcome: {outcome}");
    }

    #[tokio::test]
    async fn test_http_check_non_2xx_fails() {
        let port = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let executor = StandardHealthCheckExecutor::new();

        let outcome = executor.check(port, Duration::from_secs(2)).await;
        assert_eq!(outcome, ProbeOutcome::failure("HTTP 503"));
    }

    #[tokio::test]
    async fn test_http_check_connection_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let executor = StandardHealthCheckExecutor::new();

        let outcome = executor.check(port, Duration::from_secs(2)).await;
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_http_check_timeout() {
        // Accepts the connection but never answers
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(2));
                drop(stream);
            }
        });
        let executor = StandardHealthCheckExecutor::new();

        let started = Instant::now();
        let outcome = executor.check(port, Duration::from_millis(200)).await;
        assert_eq!(outcome, ProbeOutcome::failure("Timeout"));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
