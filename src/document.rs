//! Documents, retrieval hits and extracted answers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::InputError;

/// Metadata key holding the row ordinal of a document
pub const INDEX_KEY: &str = "index";

/// Attributes a document id may be derived from
pub const HASH_KEYS: [&str; 2] = ["content", "meta"];

/// A unit of indexed text plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Document {
    /// Create a document whose id is derived from `id_hash_keys`
    pub fn new(
        content: String,
        meta: Map<String, Value>,
        id_hash_keys: &[String],
    ) -> Result<Self, InputError> {
        let id = derive_id(&content, &meta, id_hash_keys)?;
        Ok(Self { id, content, meta })
    }

    /// Row ordinal assigned at conversion time
    pub fn index(&self) -> Option<u64> {
        self.meta.get(INDEX_KEY).and_then(Value::as_u64)
    }
}

/// Hash the selected attributes into a stable 32-hex-digit id.
///
/// An empty key list falls back to hashing the content alone.
pub fn derive_id(
    content: &str,
    meta: &Map<String, Value>,
    id_hash_keys: &[String],
) -> Result<String, InputError> {
    let mut material = String::new();
    if id_hash_keys.is_empty() {
        material.push_str(content);
    }
    for key in id_hash_keys {
        match key.as_str() {
            "content" => material.push_str(content),
            // Map serialization cannot fail: keys are strings
            "meta" => material.push_str(&Value::Object(meta.clone()).to_string()),
            other => return Err(InputError::InvalidHashKey(other.to_string())),
        }
        material.push('\u{1f}');
    }

    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, material.as_bytes())
        .simple()
        .to_string())
}

/// Validate a list of id hash keys
pub fn validate_hash_keys(keys: &[String]) -> Result<(), InputError> {
    match keys.iter().find(|k| !HASH_KEYS.contains(&k.as_str())) {
        Some(bad) => Err(InputError::InvalidHashKey(bad.clone())),
        None => Ok(()),
    }
}

/// A document returned by a retriever with its similarity score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

/// An extracted answer span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub score: f64,
    pub context: String,
    pub document_id: String,
    /// Byte offsets of the answer inside the document content
    pub offsets: (usize, usize),
}
