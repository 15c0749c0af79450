//! JSON wire format for a persisted task collection.
//!
//! The collection is stored as a JSON array of [`Task`] objects with
//! camelCase keys. Instants are RFC 3339 strings on the wire and are parsed
//! back into `DateTime<Utc>` values, so a decoded collection compares equal
//! to the one that was encoded.

use crate::task::Task;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The collection could not be serialized.
    #[error("task encode error: {0}")]
    Encode(String),
    /// The input is not a valid task collection.
    #[error("task decode error: {0}")]
    Decode(String),
}

/// Encodes a task collection into its JSON text form.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_tasks(tasks: &[Task]) -> Result<String, CodecError> {
    serde_json::to_string(tasks).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a task collection from its JSON text form.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the text is not a JSON array of
/// well-formed tasks (including unparseable timestamps).
pub fn decode_tasks(text: &str) -> Result<Vec<Task>, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Decode(e.to_string()))
}
