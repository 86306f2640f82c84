//! Flag definitions and the records decoded from stream payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The full mapping from flag key to flag definition.
pub type FlagSet = BTreeMap<String, FlagDefinition>;

/// One flag definition.
///
/// Opaque apart from its `version`: every other member of the JSON
/// object (including `key`) is carried through untouched in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagDefinition {
    /// Monotonically increasing version assigned by the server.
    pub version: u64,
    /// Deleted marker; a tombstone keeps its version so stale writes lose.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    /// Everything else in the definition.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl FlagDefinition {
    /// Create a definition with the given version and no other fields.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            deleted: false,
            fields: Map::new(),
        }
    }

    /// Build the deleted marker stored in place of a removed flag.
    pub fn tombstone(key: &str, version: u64) -> Self {
        let mut fields = Map::new();
        fields.insert("key".into(), Value::String(key.to_string()));
        Self {
            version,
            deleted: true,
            fields,
        }
    }

    /// Set a field, builder style.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// The `key` member, if the definition carries one.
    pub fn key(&self) -> Option<&str> {
        self.fields.get("key").and_then(Value::as_str)
    }
}

/// A single flag upsert decoded from `patch` / `indirect/patch`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagPatch {
    /// Flag key.
    pub key: String,
    /// Full new definition.
    pub definition: FlagDefinition,
}

/// A delete decoded from a `delete` payload.
///
/// The store discards deletes older than its current version for the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteInstruction {
    /// Flag key with the leading separator stripped.
    pub key: String,
    /// Version of the delete.
    pub version: u64,
}

/// Normalize a path into a flag key by stripping exactly one leading `/`.
pub fn key_from_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}
