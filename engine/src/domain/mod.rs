pub mod error;
pub mod events;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use error::{DomainError, Result};
pub use events::{HealthStateChanged, OutputStream, ProcessEvent};
pub use services::HealthSupervisor;
pub use value_objects::{HealthPolicy, HealthState, HealthStatus, ProbeOutcome};
