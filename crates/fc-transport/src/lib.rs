//! Transport interface (C5): publish/send/subscribe plus a lifecycle the
//! host drives. Concrete wire transports are out of scope here;
//! this crate ships only the trait and an in-process reference impl.

pub mod error;
pub mod in_memory;
pub mod transport;

pub use error::TransportError;
pub use in_memory::InMemoryTransport;
pub use transport::{MessageHandler, Transport};
