//! Result of a single health probe

use std::fmt;
use std::time::Duration;

/// Outcome of one request against the worker's health endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx within the timeout; latency measured from request start to body end
    Success { latency: Duration },
    /// Non-2xx, connection error or timeout
    Failure { reason: String },
}

impl ProbeOutcome {
    pub fn success(latency: Duration) -> Self {
        Self::Success { latency }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { latency } => write!(f, "ok ({}ms)", latency.as_millis()),
            Self::Failure { reason } => write!(f, "failed ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ProbeOutcome::success(Duration::from_millis(42)).to_string(),
            "ok (42ms)"
        );
        assert_eq!(ProbeOutcome::failure("HTTP 503").to_string(), "failed (HTTP 503)");
    }
}
