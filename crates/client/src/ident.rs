//! Message identity recovery.
//!
//! The automation layer does not reliably return a message id, so senders
//! pre-generate a fallback before invoking a send and keep it only when
//! nothing extractable comes back. Identity extraction never fails a send.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, distr::Alphanumeric};

use crate::types::RawSendResult;

/// Extract a message id from a raw send result.
///
/// Precedence: structured id field, then plain string id, then bare
/// serialized field, then keyed id. `Opaque` yields `None`.
#[must_use]
pub fn extract_message_id(result: &RawSendResult) -> Option<String> {
    match result {
        RawSendResult::Structured { id } => Some(id.serialized.clone()),
        RawSendResult::Plain { id } => Some(id.clone()),
        RawSendResult::Serialized { serialized } => Some(serialized.clone()),
        RawSendResult::Keyed { key } => Some(key.id.clone()),
        RawSendResult::Opaque => None,
    }
}

/// Generate a locally unique fallback id: `{prefix}_{unix_ms}_{9 alnum}`.
#[must_use]
pub fn fallback_message_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("{prefix}_{millis}_{suffix}")
}
