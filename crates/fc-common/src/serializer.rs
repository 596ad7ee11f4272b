//! Bytes ↔ typed message conversion for the one selected codec (C2).
//!
//! Concrete wire codecs are out of scope for this crate, which ships the
//! JSON reference codec the rest of the workspace (and `bin/fc-dev`) runs on.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::MediatorError;

/// A deterministic, named bytes ↔ value codec.
pub struct SerializerRegistry {
    name: &'static str,
}

impl SerializerRegistry {
    pub fn json() -> Self {
        Self { name: "json" }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, MediatorError> {
        serde_json::to_vec(value).map_err(MediatorError::from)
    }

    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, MediatorError> {
        serde_json::from_slice(bytes).map_err(MediatorError::from)
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        a: i32,
        b: String,
    }

    #[test]
    fn round_trips_through_json() {
        let registry = SerializerRegistry::json();
        let original = Sample { a: 7, b: "seven".to_string() };
        let bytes = registry.serialize(&original).unwrap();
        let decoded: Sample = registry.deserialize(&bytes).unwrap();
        assert_eq!(original, decoded);
    }
}
