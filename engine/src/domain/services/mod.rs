pub mod health_supervisor;

pub use health_supervisor::HealthSupervisor;
