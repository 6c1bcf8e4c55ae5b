//! Dispatch facade: one send request in, one external-client invocation and
//! one audit record out.

use std::sync::Arc;

use {serde::Serialize, tracing::info};

use wamux_client::{MediaPayload, extract_message_id, fallback_message_id};

use crate::{
    controller::SessionController,
    error::{Error, Result},
    media,
    message_log::{MessageLog, MessageRecord},
    normalize::{chat_address, normalize_number},
    record::{SessionRecord, unix_now},
    selector::SessionSelector,
};

/// Outbound text request.
#[derive(Debug, Clone)]
pub struct SendTextRequest {
    pub to: String,
    pub message: String,
    pub session_id: Option<String>,
}

/// Where a media payload was sourced from. Only remote-originated sends
/// carry one; direct uploads leave it unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    Base64,
    Url,
}

/// Outbound media request. The payload bytes are scoped to this request and
/// released on drop on every path — success, validation failure, or client
/// failure.
#[derive(Debug, Clone)]
pub struct SendMediaRequest {
    pub to: String,
    pub media: MediaPayload,
    pub caption: Option<String>,
    pub session_id: Option<String>,
    pub source: Option<MediaSource>,
}

/// What a successful send returns to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub message_id: String,
    pub to: String,
    pub session_id: String,
    pub session_name: String,
    pub from_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_source: Option<MediaSource>,
    pub sent_at: i64,
}

/// Validates, resolves, sends, records. No retries: transient conditions are
/// the caller's to handle.
pub struct Dispatcher {
    controller: Arc<SessionController>,
    selector: Arc<SessionSelector>,
    message_log: Arc<dyn MessageLog>,
    country_code: String,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        controller: Arc<SessionController>,
        selector: Arc<SessionSelector>,
        message_log: Arc<dyn MessageLog>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            selector,
            message_log,
            country_code: country_code.into(),
        }
    }

    pub async fn send_text(&self, req: SendTextRequest) -> Result<SendReceipt> {
        if req.to.trim().is_empty() || req.message.trim().is_empty() {
            return Err(Error::invalid_argument("to and message are required"));
        }
        let number = normalize_number(&req.to, &self.country_code)?;

        let session = self.selector.select(req.session_id.as_deref()).await?;
        let chat_id = chat_address(&number);
        let client = self.resolve_client(&session.id).await?;

        let registered = client
            .is_registered(&chat_id)
            .await
            .map_err(|e| Error::external("registration check", e))?;
        if !registered {
            return Err(Error::UnregisteredRecipient { number });
        }

        // Pre-generate the fallback before invoking the send; the client's
        // notion of message identity is unreliable.
        let fallback = fallback_message_id("msg");
        let outcome = client.send_text(&chat_id, &req.message).await;

        self.finish(
            &session,
            number,
            Some(req.message),
            None,
            None,
            None,
            None,
            fallback,
            outcome,
        )
        .await
    }

    pub async fn send_media(&self, req: SendMediaRequest) -> Result<SendReceipt> {
        if req.to.trim().is_empty() || req.media.bytes.is_empty() {
            return Err(Error::invalid_argument("to and a media file are required"));
        }
        // Media rules come before any session is consulted.
        media::validate(&req.media.mime_type, req.media.bytes.len())?;
        let number = normalize_number(&req.to, &self.country_code)?;

        let session = self.selector.select(req.session_id.as_deref()).await?;
        let chat_id = chat_address(&number);
        let client = self.resolve_client(&session.id).await?;

        let registered = client
            .is_registered(&chat_id)
            .await
            .map_err(|e| Error::external("registration check", e))?;
        if !registered {
            return Err(Error::UnregisteredRecipient { number });
        }

        // Remote-sourced media keeps its own identity prefix in the audit
        // trail.
        let prefix = if req.source.is_some() { "media_url" } else { "media" };
        let fallback = fallback_message_id(prefix);
        let outcome = client
            .send_media(&chat_id, &req.media, req.caption.as_deref())
            .await;

        self.finish(
            &session,
            number,
            None,
            Some(req.media.mime_type.clone()),
            req.media.file_name.clone(),
            req.caption,
            req.source,
            fallback,
            outcome,
        )
        .await
    }

    async fn resolve_client(
        &self,
        session_id: &str,
    ) -> Result<Arc<dyn wamux_client::WhatsAppClient>> {
        // The handle can vanish between selection and use when a removal
        // races the send; surface it as a client failure for this request.
        self.controller.client(session_id).await.ok_or_else(|| {
            Error::external(
                "resolve session handle",
                wamux_client::ClientError::new(format!(
                    "session {session_id} was torn down mid-request"
                )),
            )
        })
    }

    /// Append the audit record and shape the receipt. Failed sends that
    /// reached the client are recorded too, then the failure propagates.
    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        session: &SessionRecord,
        number: String,
        content: Option<String>,
        media_type: Option<String>,
        file_name: Option<String>,
        caption: Option<String>,
        media_source: Option<MediaSource>,
        fallback: String,
        outcome: wamux_client::Result<wamux_client::RawSendResult>,
    ) -> Result<SendReceipt> {
        let sent_at = unix_now();
        let (message_id, status, failure) = match outcome {
            Ok(raw) => (
                extract_message_id(&raw).unwrap_or(fallback),
                "sent",
                None,
            ),
            Err(e) => (fallback, "failed", Some(e)),
        };

        self.message_log
            .append(MessageRecord {
                id: 0,
                session_id: session.id.clone(),
                message_id: message_id.clone(),
                to_number: number.clone(),
                content,
                media_type: media_type.clone(),
                file_name: file_name.clone(),
                caption: caption.clone(),
                status: status.into(),
                sent_at,
            })
            .await?;

        if let Some(e) = failure {
            return Err(Error::external("send message", e));
        }

        info!(
            session_id = %session.id,
            message_id,
            to = %number,
            "message dispatched"
        );
        Ok(SendReceipt {
            message_id,
            to: number,
            session_id: session.id.clone(),
            session_name: session.name.clone(),
            from_phone: session.phone.clone(),
            media_type,
            file_name,
            caption,
            media_source,
            sent_at,
        })
    }
}
