//! HealthPolicy value object
//! Timings and thresholds driving the supervisor's state machine

use crate::constants::health;
use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and threshold configuration for health supervision
///
/// The defaults are the fixed values from [`crate::constants::health`];
/// overriding them is mostly useful for tests and embedding hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Delay between spawn and the first poll
    pub grace_period: Duration,
    /// Delay between polls
    pub interval: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    /// Slowest response still classified as healthy (inclusive)
    pub latency_threshold: Duration,
    /// Consecutive failures before unreachable
    pub failure_threshold: u32,
    /// Restart cycles before failed
    pub max_restart_attempts: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            grace_period: health::GRACE_PERIOD,
            interval: health::POLL_INTERVAL,
            timeout: health::CHECK_TIMEOUT,
            latency_threshold: health::LATENCY_THRESHOLD,
            failure_threshold: health::FAILURE_THRESHOLD,
            max_restart_attempts: health::MAX_RESTART_ATTEMPTS,
        }
    }
}

impl HealthPolicy {
    /// Builder method to set grace_period
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Builder method to set interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder method to set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to set latency_threshold
    pub fn with_latency_threshold(mut self, latency_threshold: Duration) -> Self {
        self.latency_threshold = latency_threshold;
        self
    }

    /// Builder method to set failure_threshold
    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// Builder method to set max_restart_attempts
    pub fn with_max_restart_attempts(mut self, max_restart_attempts: u32) -> Self {
        self.max_restart_attempts = max_restart_attempts;
        self
    }

    /// Validate policy values
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.interval.is_zero() {
            return Err(DomainError::InvalidConfiguration(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(DomainError::InvalidConfiguration(
                "health check timeout must be greater than zero".to_string(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(DomainError::InvalidConfiguration(
                "failure threshold must be at least 1".to_string(),
            ));
        }
        if self.latency_threshold >= self.timeout {
            return Err(DomainError::InvalidConfiguration(format!(
                "latency threshold ({}ms) must be below the check timeout ({}ms)",
                self.latency_threshold.as_millis(),
                self.timeout.as_millis()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_constants() {
        let policy = HealthPolicy::default();
        assert_eq!(policy.grace_period, Duration::from_secs(5));
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(policy.timeout, Duration::from_secs(2));
        assert_eq!(policy.latency_threshold, Duration::from_millis(500));
        assert_eq!(policy.failure_threshold, 3);
        assert_eq!(policy.max_restart_attempts, 3);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let policy = HealthPolicy::default()
            .with_grace_period(Duration::from_millis(10))
            .with_interval(Duration::from_millis(20))
            .with_failure_threshold(5)
            .with_max_restart_attempts(1);

        assert_eq!(policy.grace_period, Duration::from_millis(10));
        assert_eq!(policy.interval, Duration::from_millis(20));
        assert_eq!(policy.failure_threshold, 5);
        assert_eq!(policy.max_restart_attempts, 1);
    }

    #[test]
    fn test_zero_grace_period_is_valid() {
        let policy = HealthPolicy::default().with_grace_period(Duration::ZERO);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_invalid_policies() {
        assert!(HealthPolicy::default()
            .with_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(HealthPolicy::default()
            .with_failure_threshold(0)
            .validate()
            .is_err());
        assert!(HealthPolicy::default()
            .with_latency_threshold(Duration::from_secs(3))
            .validate()
            .is_err());
    }
}
