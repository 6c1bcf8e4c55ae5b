//! Stub client used when no automation bridge is wired in.
//!
//! The gateway binary runs against this by default: sessions can be created
//! and listed, but they never authenticate and every send fails with a clear
//! message. Deployments replace it with a [`ClientFactory`] backed by a real
//! WhatsApp Web bridge.

use std::sync::Arc;

use {async_trait::async_trait, tokio::sync::mpsc, tracing::warn};

use crate::{
    ClientFactory, WhatsAppClient,
    error::{ClientError, Result},
    types::{ClientEvent, MediaPayload, RawSendResult},
};

fn no_bridge() -> ClientError {
    ClientError::new("no WhatsApp bridge configured")
}

/// Client handle that is never connected.
pub struct StubClient;

#[async_trait]
impl WhatsAppClient for StubClient {
    async fn is_connected(&self) -> bool {
        false
    }

    async fn phone_number(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn is_registered(&self, _chat_id: &str) -> Result<bool> {
        Err(no_bridge())
    }

    async fn send_text(&self, _chat_id: &str, _body: &str) -> Result<RawSendResult> {
        Err(no_bridge())
    }

    async fn send_media(
        &self,
        _chat_id: &str,
        _media: &MediaPayload,
        _caption: Option<&str>,
    ) -> Result<RawSendResult> {
        Err(no_bridge())
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

/// Factory handing out [`StubClient`] handles.
#[derive(Default)]
pub struct StubFactory;

#[async_trait]
impl ClientFactory for StubFactory {
    async fn connect(
        &self,
        session_id: &str,
        _events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Result<Arc<dyn WhatsAppClient>> {
        warn!(
            session_id,
            "stub client factory in use; session will never become ready"
        );
        Ok(Arc::new(StubClient))
    }
}
