//! Configuration loading from YAML files
//!
//! One file describes one supervised worker:
//!
//! ```yaml
//! resources_dir: /opt/kp/resources
//! packaged: true
//! data_dir: /home/user/.kp
//! port: 8317
//! health:
//!   interval_ms: 5000
//! ```

use crate::constants::process;
use crate::domain::{DomainError, HealthPolicy};
use crate::infrastructure::binary_locator::{default_config_path, resolve_binary_path};
use crate::infrastructure::process_handle::WorkerSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supervisor configuration from YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Explicit worker binary; bypasses the platform lookup
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    #[serde(default)]
    pub resources_dir: Option<PathBuf>,

    #[serde(default)]
    pub packaged: bool,

    /// Explicit worker config file; wins over `data_dir`
    #[serde(default)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub auto_restart_on_exit: bool,

    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    #[serde(default)]
    pub health: HealthCheckConfig,
}

/// Health policy overrides; absent fields keep the built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default)]
    pub grace_period_ms: Option<u64>,

    #[serde(default)]
    pub interval_ms: Option<u64>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub latency_threshold_ms: Option<u64>,

    #[serde(default)]
    pub failure_threshold: Option<u32>,

    #[serde(default)]
    pub max_restart_attempts: Option<u32>,
}

fn default_port() -> u16 {
    process::DEFAULT_PORT
}

fn default_stop_timeout_ms() -> u64 {
    process::STOP_TIMEOUT.as_millis() as u64
}

impl SupervisorConfig {
    /// Load and validate configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Io(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, DomainError> {
        let config: Self = serde_yaml::from_str(contents).map_err(|e| {
            DomainError::InvalidConfiguration(format!("Failed to parse YAML: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.binary_path.is_none() && self.resources_dir.is_none() {
            return Err(DomainError::InvalidConfiguration(
                "either binary_path or resources_dir must be set".to_string(),
            ));
        }
        if self.config_path.is_none() && self.data_dir.is_none() {
            return Err(DomainError::InvalidConfiguration(
                "either config_path or data_dir must be set".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(DomainError::InvalidConfiguration(
                "port must be greater than zero".to_string(),
            ));
        }
        self.health_policy().validate()
    }

    pub fn resolve_binary_path(&self) -> Result<PathBuf, DomainError> {
        match (&self.binary_path, &self.resources_dir) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(resources)) => Ok(resolve_binary_path(resources, self.packaged)),
            (None, None) => Err(DomainError::InvalidConfiguration(
                "either binary_path or resources_dir must be set".to_string(),
            )),
        }
    }

    pub fn resolve_config_path(&self) -> Result<PathBuf, DomainError> {
        match (&self.config_path, &self.data_dir) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(data_dir)) => Ok(default_config_path(data_dir)),
            (None, None) => Err(DomainError::InvalidConfiguration(
                "either config_path or data_dir must be set".to_string(),
            )),
        }
    }

    pub fn health_policy(&self) -> HealthPolicy {
        let health = &self.health;
        let mut policy = HealthPolicy::default();

        if let Some(ms) = health.grace_period_ms {
            policy = policy.with_grace_period(Duration::from_millis(ms));
        }
        if let Some(ms) = health.interval_ms {
            policy = policy.with_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = health.timeout_ms {
            policy = policy.with_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = health.latency_threshold_ms {
            policy = policy.with_latency_threshold(Duration::from_millis(ms));
        }
        if let Some(threshold) = health.failure_threshold {
            policy = policy.with_failure_threshold(threshold);
        }
        if let Some(max) = health.max_restart_attempts {
            policy = policy.with_max_restart_attempts(max);
        }
        policy
    }

    pub fn worker_spec(&self) -> Result<WorkerSpec, DomainError> {
        Ok(
            WorkerSpec::new(self.resolve_binary_path()?, self.resolve_config_path()?)
                .with_port(self.port)
                .with_stop_timeout(Duration::from_millis(self.stop_timeout_ms))
                .with_auto_restart(self.auto_restart_on_exit),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = SupervisorConfig::from_yaml(
            r#"
binary_path: /opt/kp/cliproxy
data_dir: /home/user/.kp
"#,
        )
        .unwrap();

        assert_eq!(config.port, 1337);
        assert!(!config.auto_restart_on_exit);
        assert_eq!(config.stop_timeout_ms, 5000);
        assert_eq!(config.health_policy(), HealthPolicy::default());
        assert_eq!(
            config.resolve_config_path().unwrap(),
            PathBuf::from("/home/user/.kp/config.yaml")
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let config = SupervisorConfig::from_yaml(
            r#"
binary_path: /opt/kp/cliproxy
config_path: /etc/kp/proxy.yaml
data_dir: /home/user/.kp
"#,
        )
        .unwrap();
        assert_eq!(
            config.resolve_config_path().unwrap(),
            PathBuf::from("/etc/kp/proxy.yaml")
        );
    }

    #[test]
    fn test_resources_dir_lookup() {
        let config = SupervisorConfig::from_yaml(
            r#"
resources_dir: /opt/kp/resources
packaged: true
data_dir: /home/user/.kp
"#,
        )
        .unwrap();
        let binary = config.resolve_binary_path().unwrap();
        assert!(binary.starts_with("/opt/kp/resources/binaries"));
        assert_eq!(binary.parent(), Some(Path::new("/opt/kp/resources/binaries")));
    }

    #[test]
    fn test_health_overrides() {
        let config = SupervisorConfig::from_yaml(
            r#"
binary_path: /opt/kp/cliproxy
data_dir: /tmp
health:
  grace_period_ms: 100
  interval_ms: 250
  failure_threshold: 5
"#,
        )
        .unwrap();

        let policy = config.health_policy();
        assert_eq!(policy.grace_period, Duration::from_millis(100));
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.failure_threshold, 5);
        assert_eq!(policy.timeout, Duration::from_secs(2));
        assert_eq!(policy.max_restart_attempts, 3);
    }

    #[test]
    fn test_missing_paths_rejected() {
        let err = SupervisorConfig::from_yaml("data_dir: /tmp\n").unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfiguration(_)));

        let err = SupervisorConfig::from_yaml("binary_path: /opt/kp/cliproxy\n").unwrap_err();
        assert!(err.to_string().contains("config_path or data_dir"));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let err = SupervisorConfig::from_yaml(
            r#"
binary_path: /opt/kp/cliproxy
data_dir: /tmp
health:
  timeout_ms: 400
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("latency threshold"));
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = SupervisorConfig::from_yaml(
            "binary_path: /opt/kp/cliproxy\ndata_dir: /tmp\nport: 0\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_worker_spec_from_config() {
        let config = SupervisorConfig::from_yaml(
            r#"
binary_path: /opt/kp/cliproxy
data_dir: /home/user/.kp
port: 8317
auto_restart_on_exit: true
stop_timeout_ms: 1500
"#,
        )
        .unwrap();

        let spec = config.worker_spec().unwrap();
        assert_eq!(spec.binary_path, PathBuf::from("/opt/kp/cliproxy"));
        assert_eq!(spec.config_path, PathBuf::from("/home/user/.kp/config.yaml"));
        assert_eq!(spec.port, 8317);
        assert!(spec.auto_restart);
        assert_eq!(spec.stop_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "binary_path: /opt/kp/cliproxy").unwrap();
        writeln!(file, "config_path: /etc/kp/proxy.yaml").unwrap();

        let config = SupervisorConfig::load(file.path()).unwrap();
        assert_eq!(config.binary_path, Some(PathBuf::from("/opt/kp/cliproxy")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SupervisorConfig::load(Path::new("/nonexistent/sidecar.yaml")).unwrap_err();
        assert!(matches!(err, DomainError::Io(_)));
    }
}
