//! Feed record parser.
//!
//! Every record of the subscribe feed is a JSON array of widget updates.
//! This module deserializes one record into a `Vec<WidgetUpdate>`,
//! preserving the order in which the server listed them.

use annot_core::types::WidgetUpdate;

/// Parse one raw feed record.
///
/// Returns `Err` for malformed JSON or a payload that is not an array of
/// objects. Callers should log and continue with the next record.
pub fn parse_record(raw: &[u8]) -> Result<Vec<WidgetUpdate>, serde_json::Error> {
    serde_json::from_slice(raw)
}
