//! Scriptable fakes for exercising session lifecycle and dispatch logic
//! without a real automation layer.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, tokio::sync::mpsc};

use crate::{
    ClientFactory, WhatsAppClient,
    error::{ClientError, Result},
    types::{ClientEvent, MediaPayload, RawSendResult},
};

/// One recorded outbound call on a [`FakeClient`].
#[derive(Debug, Clone)]
pub struct SentCall {
    pub chat_id: String,
    pub body: Option<String>,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
}

/// Scriptable in-memory client.
///
/// By default every chat address counts as registered and sends return
/// [`RawSendResult::Opaque`]. Tests push scripted results and toggle failure
/// modes as needed.
pub struct FakeClient {
    connected: AtomicBool,
    phone: RwLock<Option<String>>,
    registered: RwLock<HashSet<String>>,
    restrict_registration: AtomicBool,
    send_results: Mutex<VecDeque<RawSendResult>>,
    fail_sends: AtomicBool,
    fail_logout: AtomicBool,
    pub sent: Mutex<Vec<SentCall>>,
    pub registration_checks: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub destroy_calls: AtomicUsize,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            phone: RwLock::new(None),
            registered: RwLock::new(HashSet::new()),
            restrict_registration: AtomicBool::new(false),
            send_results: Mutex::new(VecDeque::new()),
            fail_sends: AtomicBool::new(false),
            fail_logout: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            registration_checks: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_phone(&self, phone: Option<&str>) {
        *self.phone.write().unwrap_or_else(|e| e.into_inner()) = phone.map(str::to_string);
    }

    /// Restrict registration checks to an explicit set of chat addresses.
    pub fn allow_only(&self, chat_ids: &[&str]) {
        self.restrict_registration.store(true, Ordering::SeqCst);
        let mut registered = self.registered.write().unwrap_or_else(|e| e.into_inner());
        registered.clear();
        registered.extend(chat_ids.iter().map(|s| (*s).to_string()));
    }

    /// Queue a raw result for the next send call.
    pub fn push_send_result(&self, result: RawSendResult) {
        self.send_results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent_calls(&self) -> Vec<SentCall> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record_send(&self, call: SentCall) -> Result<RawSendResult> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ClientError::new("scripted send failure"));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        let scripted = self
            .send_results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(scripted.unwrap_or(RawSendResult::Opaque))
    }
}

#[async_trait]
impl WhatsAppClient for FakeClient {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn phone_number(&self) -> Result<Option<String>> {
        Ok(self
            .phone
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn is_registered(&self, chat_id: &str) -> Result<bool> {
        self.registration_checks.fetch_add(1, Ordering::SeqCst);
        if !self.restrict_registration.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(self
            .registered
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(chat_id))
    }

    async fn send_text(&self, chat_id: &str, body: &str) -> Result<RawSendResult> {
        self.record_send(SentCall {
            chat_id: chat_id.to_string(),
            body: Some(body.to_string()),
            mime_type: None,
            caption: None,
        })
    }

    async fn send_media(
        &self,
        chat_id: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<RawSendResult> {
        self.record_send(SentCall {
            chat_id: chat_id.to_string(),
            body: None,
            mime_type: Some(media.mime_type.clone()),
            caption: caption.map(str::to_string),
        })
    }

    async fn logout(&self) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(ClientError::new("scripted logout failure"));
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out [`FakeClient`]s and retaining each session's event
/// sender so tests can drive the lifecycle.
#[derive(Default)]
pub struct FakeFactory {
    clients: Mutex<HashMap<String, Arc<FakeClient>>>,
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<ClientEvent>>>,
    fail_connect: AtomicBool,
    pub connect_calls: AtomicUsize,
}

impl FakeFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// The fake client allocated for a session, if any.
    #[must_use]
    pub fn client(&self, session_id: &str) -> Option<Arc<FakeClient>> {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
    }

    /// Emit a lifecycle event into a session's stream.
    ///
    /// Returns false when the session has no live event channel (never
    /// connected, or its subscriber is gone).
    pub fn emit(&self, session_id: &str, event: ClientEvent) -> bool {
        let senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        match senders.get(session_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn connect(
        &self,
        session_id: &str,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Result<Arc<dyn WhatsAppClient>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ClientError::new("scripted connect failure"));
        }
        let client = Arc::new(FakeClient::new());
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), Arc::clone(&client));
        self.senders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), events);
        Ok(client)
    }
}
