//! Application-wide constants and default values
//!
//! Centralizes the fixed timings and thresholds of the sidecar supervisor.
//! `HealthPolicy::default()` and `ProcessHandle::new()` are built from these.

use std::time::Duration;

/// Health polling defaults
pub mod health {
    use super::Duration;

    /// Delay between spawn and the first health poll
    pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

    /// Interval between health polls
    pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

    /// Per-request timeout for the health endpoint
    pub const CHECK_TIMEOUT: Duration = Duration::from_millis(2000);

    /// Slowest response still classified as healthy (inclusive)
    pub const LATENCY_THRESHOLD: Duration = Duration::from_millis(500);

    /// Consecutive failures before the worker is considered unreachable
    pub const FAILURE_THRESHOLD: u32 = 3;

    /// Automatic restart cycles before the supervisor gives up
    pub const MAX_RESTART_ATTEMPTS: u32 = 3;

    /// Path of the worker's health endpoint
    pub const HEALTH_PATH: &str = "/v1/diagnostics/health";

    /// Loopback host the worker listens on
    pub const HEALTH_HOST: &str = "127.0.0.1";
}

/// Worker process defaults
pub mod process {
    use super::Duration;

    /// Listening port handed to a fresh process handle
    pub const DEFAULT_PORT: u16 = 1337;

    /// Window between SIGTERM and SIGKILL
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Extra time `stop()` waits for the exit after the SIGKILL deadline
    pub const EXIT_WAIT_MARGIN: Duration = Duration::from_secs(2);

    /// Flag preceding the config file path on the worker command line
    pub const CONFIG_FLAG: &str = "-config";

    /// First delay of the exit auto-restart backoff
    pub const EXIT_RESTART_BASE_DELAY: Duration = Duration::from_millis(1000);

    /// Ceiling of the exit auto-restart backoff
    pub const EXIT_RESTART_MAX_DELAY: Duration = Duration::from_millis(10_000);

    /// Respawns after unexpected exits before auto-restart gives up
    pub const MAX_EXIT_RESTARTS: u32 = 3;

    /// Capacity of the process event broadcast channel
    pub const EVENT_CHANNEL_CAPACITY: usize = 256;
}

/// Worker binary lookup
pub mod binary {
    /// Worker executable name (without platform suffix)
    pub const BINARY_NAME: &str = "cliproxy";

    /// Directory under the resources root holding worker binaries
    pub const BINARIES_DIR: &str = "binaries";

    /// Worker config file name inside the data directory
    pub const CONFIG_FILE_NAME: &str = "config.yaml";
}
