//! Recovery supervisor (C10) and the health check surface (C12).

pub mod health;
pub mod recoverable;
pub mod supervisor;

pub use health::HealthAggregator;
pub use recoverable::{RecoverableError, Recoverable};
pub use supervisor::{RecoverySupervisor, RecoverySupervisorConfig};
