//! Payload decoding.
//!
//! Each function parses one payload shape. Failures are returned as the
//! underlying `serde_json::Error`; tagging with the event kind and raw
//! text happens in [`crate::dispatch`].

use flagstream_types::{key_from_path, DeleteInstruction, FlagDefinition, FlagPatch, FlagSet};
use serde::de::Error as _;
use serde::Deserialize;

#[derive(Deserialize)]
struct PatchPayload {
    data: FlagDefinition,
}

#[derive(Deserialize)]
struct DeletePayload {
    path: String,
    version: u64,
}

/// Decode a full flag set (`put`, or the body fetched for `indirect/put`).
pub fn decode_flag_set(raw: &str) -> Result<FlagSet, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Decode a `patch` payload: `{"data": {"key": ..., "version": ..., ...}}`.
pub fn decode_patch(raw: &str) -> Result<FlagPatch, serde_json::Error> {
    let payload: PatchPayload = serde_json::from_str(raw)?;
    let key = payload
        .data
        .key()
        .map(str::to_owned)
        .ok_or_else(|| serde_json::Error::missing_field("key"))?;
    Ok(FlagPatch {
        key,
        definition: payload.data,
    })
}

/// Decode a `delete` payload: `{"path": "/key", "version": n}`.
pub fn decode_delete(raw: &str) -> Result<DeleteInstruction, serde_json::Error> {
    let payload: DeletePayload = serde_json::from_str(raw)?;
    Ok(DeleteInstruction {
        key: key_from_path(&payload.path).to_string(),
        version: payload.version,
    })
}

/// Decode a single flag body fetched for `indirect/patch`.
pub fn decode_flag(raw: &str) -> Result<FlagDefinition, serde_json::Error> {
    serde_json::from_str(raw)
}
