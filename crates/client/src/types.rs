use {bytes::Bytes, serde::Serialize};

/// Lifecycle events emitted by the external client for one session.
///
/// A session's events arrive in handshake order
/// (`qr → authenticated → ready → disconnected`); streams of different
/// sessions interleave freely.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A new login challenge. Each one replaces any prior challenge.
    Qr { data: String },
    /// The account owner scanned the challenge.
    Authenticated,
    /// The handshake failed after authentication was attempted.
    AuthFailure { reason: String },
    /// The session is connected and eligible to send.
    Ready,
    /// The session lost its connection.
    Disconnected { reason: String },
}

/// Media to hand to the external client for an outbound send.
///
/// The bytes are refcounted; the client may hold a cheap clone slightly past
/// the send call, and the allocation is released once the last clone drops.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: Option<String>,
}

/// Structured message identity (`id._serialized` in the wire shape).
#[derive(Debug, Clone)]
pub struct MessageId {
    pub serialized: String,
}

/// Key-shaped message identity (`key.id` in the wire shape).
#[derive(Debug, Clone)]
pub struct MessageKey {
    pub id: String,
}

/// What the automation layer returns from a send.
///
/// The layer is not consistent about message identity; these are the shapes
/// it is known to produce. [`crate::extract_message_id`] resolves them in
/// precedence order.
#[derive(Debug, Clone)]
pub enum RawSendResult {
    /// Full message object carrying a structured id field.
    Structured { id: MessageId },
    /// Message object whose id is a plain string.
    Plain { id: String },
    /// Bare serialized id at the top level of the response.
    Serialized { serialized: String },
    /// Key-shaped response.
    Keyed { key: MessageKey },
    /// Response with no extractable identity (or no response at all).
    Opaque,
}
