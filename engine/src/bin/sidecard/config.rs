//! Daemon configuration from environment variables
//!
//! The supervisor itself is described by a YAML file; the environment only
//! points at it and carries a few operator overrides.

use std::env;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Supervisor YAML file
    pub config_file: Option<String>,

    /// Overrides the worker port from the YAML file
    pub port: Option<u16>,

    /// Overrides `auto_restart_on_exit` from the YAML file
    pub auto_restart: Option<bool>,

    /// Log level / EnvFilter directive
    pub log_level: String,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            config_file: env::var("KP_SIDECAR_CONFIG").ok(),
            port: Self::parse_u16("KP_SIDECAR_PORT"),
            auto_restart: Self::parse_bool("KP_SIDECAR_AUTO_RESTART"),
            log_level: Self::parse_log_level(),
        }
    }

    fn parse_u16(var_name: &str) -> Option<u16> {
        env::var(var_name).ok().and_then(|s| s.parse().ok())
    }

    fn parse_bool(var_name: &str) -> Option<bool> {
        env::var(var_name)
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            })
    }

    fn parse_log_level() -> String {
        // Priority: KP_SIDECAR_LOG_LEVEL > RUST_LOG > default
        env::var("KP_SIDECAR_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.config_file.is_none() {
            return Err("KP_SIDECAR_CONFIG must point at the supervisor YAML file".to_string());
        }
        if self.port == Some(0) {
            return Err("KP_SIDECAR_PORT must be greater than zero".to_string());
        }
        Ok(())
    }
}
