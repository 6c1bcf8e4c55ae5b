//! Session lifecycle controller.
//!
//! Owns the registry of live client handles (one per session id) and
//! translates the external client's asynchronous events into record
//! transitions. Events for one session are applied strictly in arrival order
//! by a per-session pump task; different sessions' streams interleave freely.

use std::{collections::HashMap, sync::Arc};

use {
    serde::Serialize,
    tokio::{
        sync::{RwLock, mpsc},
        task::JoinHandle,
    },
    tracing::{debug, info, warn},
};

use wamux_client::{ClientEvent, ClientFactory, WhatsAppClient};

use crate::{
    error::{Error, Result},
    qr::{QrArtifact, QrCache},
    record::{SessionRecord, StatusChange},
    store::SessionStore,
};

/// Payload for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Outcome of a reinitialize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reinit {
    AlreadyActive,
    Started,
}

/// Outcome of a QR lookup. The non-image cases are signals, not errors.
#[derive(Debug, Clone)]
pub enum QrLookup {
    Available(QrArtifact),
    AlreadyAuthenticated,
    NotAvailable,
}

struct SessionHandle {
    client: Arc<dyn WhatsAppClient>,
    pump: JoinHandle<()>,
}

/// Explicitly owned registry of session id → client handle, created at
/// process start and torn down via [`SessionController::shutdown`].
pub struct SessionController {
    store: Arc<dyn SessionStore>,
    qr: Arc<QrCache>,
    factory: Arc<dyn ClientFactory>,
    handles: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        qr: Arc<QrCache>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            store,
            qr,
            factory,
            handles: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// Create a session and begin connecting it.
    ///
    /// Fails with `DuplicateSession` when a live record exists under the id.
    /// A connect failure is recorded on the session (`auth_failed`) rather
    /// than returned: creation itself succeeds and readiness is observed
    /// later via status polling.
    pub async fn create(&self, new: NewSession) -> Result<SessionRecord> {
        if new.id.trim().is_empty() || new.name.trim().is_empty() {
            return Err(Error::invalid_argument("session id and name are required"));
        }
        if self.store.get(&new.id).await?.is_some() {
            return Err(Error::duplicate_session(new.id));
        }

        info!(session_id = %new.id, name = %new.name, "creating session");
        self.store
            .insert(SessionRecord::new(&new.id, &new.name, new.description))
            .await?;
        self.connect(&new.id).await?;

        self.store
            .get(&new.id)
            .await?
            .ok_or_else(|| Error::not_found(&new.id))
    }

    /// Connect phase: allocate a client handle and start its event pump.
    async fn connect(&self, session_id: &str) -> Result<()> {
        self.store
            .apply(session_id, StatusChange::Initializing)
            .await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        match self.factory.connect(session_id, events_tx).await {
            Ok(client) => {
                let pump = spawn_event_pump(
                    session_id.to_string(),
                    events_rx,
                    Arc::clone(&self.store),
                    Arc::clone(&self.qr),
                    Arc::clone(&client),
                );
                let old = {
                    let mut handles = self.handles.write().await;
                    handles.insert(session_id.to_string(), SessionHandle { client, pump })
                };
                // A replaced handle (reinitialize after a disconnect) still
                // owns external resources; release them before dropping it.
                if let Some(old) = old {
                    old.pump.abort();
                    if let Err(e) = old.client.destroy().await {
                        warn!(session_id, error = %e, "stale client teardown failed");
                    }
                }
                Ok(())
            },
            Err(e) => {
                warn!(session_id, error = %e, "client connect failed");
                self.store
                    .apply(session_id, StatusChange::AuthFailed)
                    .await?;
                Ok(())
            },
        }
    }

    /// Remove a session: best-effort client teardown, then drop the record
    /// and its QR artifact. Teardown failures are logged, never returned —
    /// once the session is found, removal always succeeds.
    pub async fn remove(&self, session_id: &str) -> Result<()> {
        if self.store.get(session_id).await?.is_none() {
            return Err(Error::not_found(session_id));
        }

        let handle = self.handles.write().await.remove(session_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.client.logout().await {
                warn!(session_id, error = %e, "logout during removal failed");
            }
            if let Err(e) = handle.client.destroy().await {
                warn!(session_id, error = %e, "destroy during removal failed");
            }
            handle.pump.abort();
        }

        self.store.delete(session_id).await?;
        self.qr.purge(session_id);
        info!(session_id, "session removed");
        Ok(())
    }

    /// Log a session out. The record is forced to `logged_out` (phone and
    /// connection time cleared, QR purged) even when the client call fails;
    /// that failure is still surfaced to the caller.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        let client = self
            .client(session_id)
            .await
            .ok_or_else(|| Error::not_found(session_id))?;

        let outcome = client.logout().await;
        self.store.apply(session_id, StatusChange::LoggedOut).await?;
        self.qr.purge(session_id);

        match outcome {
            Ok(()) => {
                info!(session_id, "session logged out");
                Ok(())
            },
            Err(e) => Err(Error::external("logout", e)),
        }
    }

    /// Re-run the connect phase for an existing session. No-op when a
    /// connected handle is already live.
    pub async fn reinitialize(&self, session_id: &str) -> Result<Reinit> {
        if self.store.get(session_id).await?.is_none() {
            return Err(Error::not_found(session_id));
        }

        let existing = self.client(session_id).await;
        if let Some(client) = existing {
            if client.is_connected().await {
                debug!(session_id, "reinitialize skipped; client already connected");
                return Ok(Reinit::AlreadyActive);
            }
        }

        self.connect(session_id).await?;
        Ok(Reinit::Started)
    }

    /// The live client handle for a session, if one exists.
    ///
    /// A handle returned here may be torn down by a concurrent remove while
    /// the caller still holds it; sends racing a removal surface the
    /// client's failure rather than being prevented.
    pub async fn client(&self, session_id: &str) -> Option<Arc<dyn WhatsAppClient>> {
        let handles = self.handles.read().await;
        handles.get(session_id).map(|h| Arc::clone(&h.client))
    }

    /// Whether a session currently has a stored QR artifact.
    #[must_use]
    pub fn has_qr(&self, session_id: &str) -> bool {
        self.qr.get(session_id).is_some()
    }

    /// Current login challenge for a session.
    pub async fn qr_lookup(&self, session_id: &str) -> Result<QrLookup> {
        let record = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| Error::not_found(session_id))?;

        if record.authenticated {
            return Ok(QrLookup::AlreadyAuthenticated);
        }
        match self.qr.get(session_id) {
            Some(artifact) => Ok(QrLookup::Available(artifact)),
            None => Ok(QrLookup::NotAvailable),
        }
    }

    /// Destroy every live handle. Called once at process shutdown.
    pub async fn shutdown(&self) {
        let mut handles = self.handles.write().await;
        for (session_id, handle) in handles.drain() {
            if let Err(e) = handle.client.destroy().await {
                warn!(session_id, error = %e, "destroy during shutdown failed");
            }
            handle.pump.abort();
        }
        info!("session controller shut down");
    }
}

/// Per-session actor: applies lifecycle events in arrival order.
fn spawn_event_pump(
    session_id: String,
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
    store: Arc<dyn SessionStore>,
    qr: Arc<QrCache>,
    client: Arc<dyn WhatsAppClient>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(e) = apply_event(&session_id, event, &*store, &qr, &*client).await {
                // A removal racing the event stream lands here; the record
                // is already gone and the pump is about to be aborted.
                warn!(session_id, error = %e, "failed to apply client event");
            }
        }
    })
}

async fn apply_event(
    session_id: &str,
    event: ClientEvent,
    store: &dyn SessionStore,
    qr: &QrCache,
    client: &dyn WhatsAppClient,
) -> Result<()> {
    match event {
        ClientEvent::Qr { data } => {
            debug!(session_id, "received login challenge");
            qr.put(session_id, &data);
            store.apply(session_id, StatusChange::WaitingQr).await
        },
        ClientEvent::Authenticated => {
            info!(session_id, "session authenticated");
            qr.purge(session_id);
            store.apply(session_id, StatusChange::Authenticated).await
        },
        ClientEvent::AuthFailure { reason } => {
            warn!(session_id, reason, "authentication failed");
            store.apply(session_id, StatusChange::AuthFailed).await
        },
        ClientEvent::Ready => {
            let phone = match client.phone_number().await {
                Ok(phone) => phone,
                Err(e) => {
                    warn!(session_id, error = %e, "could not read phone identity");
                    None
                },
            };
            info!(session_id, ?phone, "session ready");
            store.apply(session_id, StatusChange::Ready { phone }).await
        },
        ClientEvent::Disconnected { reason } => {
            warn!(session_id, reason, "session disconnected");
            store.apply(session_id, StatusChange::Disconnected).await
        },
    }
}
