//! Decoding of server push messages.
//!
//! Every MESSAGE body on an item topic is an envelope
//! `{"type": "put" | "delete", "payload": …}`. A `put` carries the full item;
//! a `delete` only needs `payload.id` and becomes a tombstone for the session
//! team.

use serde::Deserialize;

use crate::errors::SyncError;
use crate::items::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Put,
    Delete,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: MessageType,
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DeletedId {
    id: i64,
}

/// Decode an envelope into an item of type `I`; deletes yield a tombstone
/// owned by `team`.
pub fn decode_incoming<I: Item>(body: &str, team: &str) -> Result<I, SyncError> {
    let decode_err = |source: serde_json::Error| SyncError::Decode {
        kind: I::KIND.as_str(),
        source,
    };

    let envelope: Envelope = serde_json::from_str(body).map_err(decode_err)?;
    match envelope.kind {
        MessageType::Put => serde_json::from_value(envelope.payload).map_err(decode_err),
        MessageType::Delete => {
            let deleted: DeletedId = serde_json::from_value(envelope.payload).map_err(decode_err)?;
            Ok(I::tombstone(deleted.id, team))
        }
    }
}
