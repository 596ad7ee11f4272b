//! Lock-free, bit-configurable Snowflake-style distributed id generator (C1).

pub mod error;
pub mod generator;
pub mod layout;

pub use error::IdGenError;
pub use generator::{auto_detect_worker_id, IdGenerator, ParsedId};
pub use layout::SnowflakeLayout;
