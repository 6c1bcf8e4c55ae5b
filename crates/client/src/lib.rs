//! External WhatsApp Web client boundary.
//!
//! The actual browser-automation layer lives outside this workspace. This
//! crate defines the capability it must provide: a [`WhatsAppClient`] handle
//! per session, a [`ClientFactory`] that allocates handles keyed by session
//! id, and the typed lifecycle events the client emits while a session moves
//! through its login handshake.

pub mod error;
pub mod ident;
pub mod stub;
pub mod testing;
pub mod types;

use std::sync::Arc;

use {async_trait::async_trait, tokio::sync::mpsc};

pub use {
    error::{ClientError, Result},
    ident::{extract_message_id, fallback_message_id},
    types::{ClientEvent, MediaPayload, RawSendResult},
};

/// Handle to one logged-in (or logging-in) WhatsApp Web session.
///
/// All calls go to the external automation layer and may suspend for as long
/// as that layer takes; no timeout is imposed here.
#[async_trait]
pub trait WhatsAppClient: Send + Sync {
    /// Whether the underlying connection is currently established.
    async fn is_connected(&self) -> bool;

    /// Phone identity of the logged-in account. Best effort; the automation
    /// layer may not expose it until shortly after the ready signal.
    async fn phone_number(&self) -> Result<Option<String>>;

    /// Whether the chat address belongs to a registered WhatsApp user.
    async fn is_registered(&self, chat_id: &str) -> Result<bool>;

    /// Send a plain text message to a chat address.
    async fn send_text(&self, chat_id: &str, body: &str) -> Result<RawSendResult>;

    /// Send a media payload with an optional caption.
    async fn send_media(
        &self,
        chat_id: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<RawSendResult>;

    /// Log the session out of WhatsApp Web.
    async fn logout(&self) -> Result<()>;

    /// Tear down the underlying browser/connection resources.
    async fn destroy(&self) -> Result<()>;
}

/// Allocates client handles, one per session id.
///
/// The session id doubles as the durable credential-storage key inside the
/// automation layer. Reusing the id of a removed session may therefore resume
/// previously stored credentials unless the operator also clears that
/// storage; this crate does not purge it.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Allocate a handle for `session_id` and begin connecting.
    ///
    /// Returns as soon as the handle exists; the login handshake continues in
    /// the background and is reported through `events`. Events for one
    /// session are emitted in handshake order.
    async fn connect(
        &self,
        session_id: &str,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Result<Arc<dyn WhatsAppClient>>;
}
