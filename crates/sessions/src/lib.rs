//! Multi-session lifecycle and dispatch core.
//!
//! Tracks N independent WhatsApp session state machines, persists their
//! records and send audit trail, caches login challenges, and picks a ready
//! session for each outbound send.

pub mod controller;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod message_log;
pub mod normalize;
pub mod qr;
pub mod record;
pub mod selector;
pub mod store;

pub use {
    controller::{NewSession, QrLookup, Reinit, SessionController},
    dispatch::{Dispatcher, MediaSource, SendMediaRequest, SendReceipt, SendTextRequest},
    error::{Error, Result},
    message_log::{MessageLog, MessageRecord, SqliteMessageLog},
    qr::{QrArtifact, QrCache},
    record::{SessionRecord, SessionStatus, StatusChange, unix_now},
    selector::SessionSelector,
    store::{SessionStore, SqliteSessionStore, memory_pool},
};
