//! Test-vector harness
//!
//! Loads the JSON test-vector format used to check this engine's
//! primitives bit-for-bit against other implementations: an array of
//! `{name, vector_type, data}` entries, with big integers carried as
//! decimal strings rather than JSON numbers to survive the round trip
//! through languages whose native integers are narrower than a field
//! element.
//!
//! The vectors this crate's own tests check against are inlined as
//! constants next to the tests that use them; this loader exists for an
//! embedder that wants to run the same file against a from-scratch
//! reimplementation.

use crate::error::{AmaciError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One entry in a test-vector file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVector {
    pub name: String,
    pub vector_type: String,
    /// Arbitrary named fields, each a decimal-string-encoded bigint or a
    /// nested value; left as raw JSON since the field shape differs per
    /// `vector_type`.
    pub data: HashMap<String, serde_json::Value>,
}

/// Reads a JSON array of [`TestVector`] entries from `path`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<TestVector>> {
    let contents = std::fs::read_to_string(path.as_ref())
        .map_err(|e| AmaciError::SerializationError(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| AmaciError::SerializationError(e.to_string()))
}

/// Parses a test-vector's decimal-string field into the `BigUint` callers
/// convert into whatever field element it belongs to.
pub fn decimal_field(vector: &TestVector, key: &str) -> Result<num_bigint::BigUint> {
    let raw = vector
        .data
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AmaciError::SerializationError(format!("missing field `{key}`")))?;
    raw.parse::<num_bigint::BigUint>()
        .map_err(|e| AmaciError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_vector_array() {
        let json = r#"[
            {"name": "case1", "vector_type": "eddsa_sign", "data": {"priv": "secret", "x": "123456789012345678901234567890"}}
        ]"#;
        let vectors: Vec<TestVector> = serde_json::from_str(json).unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].vector_type, "eddsa_sign");
        let x = decimal_field(&vectors[0], "x").unwrap();
        assert_eq!(x.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn missing_field_is_a_serialization_error() {
        let json = r#"[{"name": "case1", "vector_type": "x", "data": {}}]"#;
        let vectors: Vec<TestVector> = serde_json::from_str(json).unwrap();
        assert!(decimal_field(&vectors[0], "missing").is_err());
    }
}
