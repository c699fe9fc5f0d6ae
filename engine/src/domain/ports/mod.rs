pub mod health_check_executor;
pub mod worker_process;

pub use health_check_executor::HealthCheckExecutor;
pub use worker_process::WorkerProcess;
