//! Shared types for the FlowCatalyst mediator core: message identity, the
//! closed error/result model, the health vocabulary, and the default
//! serializer. Every other crate in the workspace depends on this one.

pub mod error;
pub mod health;
pub mod logging;
pub mod message;
pub mod result;
pub mod serializer;

pub use error::MediatorError;
pub use health::{HealthCheck, HealthReport, HealthState};
pub use message::{Event, MessageId, Request};
pub use result::MediatorResult;
pub use serializer::SerializerRegistry;
