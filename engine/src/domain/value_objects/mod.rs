pub mod health_policy;
pub mod health_state;
pub mod probe_outcome;

pub use health_policy::HealthPolicy;
pub use health_state::{HealthState, HealthStatus};
pub use probe_outcome::ProbeOutcome;
