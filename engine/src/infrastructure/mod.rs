//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the domain layer.
//!
//! ## Adapters
//!
//! - `ProcessHandle`: real worker process driven through tokio
//! - `StandardHealthCheckExecutor`: HTTP probe of the worker's health endpoint
//!
//! Plus YAML configuration loading and platform-aware binary lookup.

pub mod binary_locator;
pub mod config;
pub mod health_check_executor;
pub mod process_handle;

pub use binary_locator::{default_config_path, resolve_binary_path};
pub use config::{HealthCheckConfig, SupervisorConfig};
pub use health_check_executor::StandardHealthCheckExecutor;
pub use process_handle::{ProcessHandle, WorkerSpec};
