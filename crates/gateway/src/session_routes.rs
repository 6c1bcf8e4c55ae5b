//! Session lifecycle endpoints.

use {
    axum::{
        Json,
        extract::{Path, State},
    },
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::warn,
    wamux_sessions::{Error, NewSession, QrLookup},
};

use crate::{error::ApiError, server::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CreateSessionBody {
    /// Missing fields become `InvalidArgument` so the response is a clean
    /// 400 rather than a deserialization error.
    fn into_new_session(self) -> Result<NewSession, Error> {
        let id = self.id.unwrap_or_default();
        let name = self.name.unwrap_or_default();
        if id.trim().is_empty() || name.trim().is_empty() {
            return Err(Error::invalid_argument("id and name are required"));
        }
        Ok(NewSession {
            id,
            name,
            description: self.description,
        })
    }
}

/// `GET /api/sessions`
pub async fn list_sessions(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let sessions = state.store.list().await?;
    let ready: Vec<&str> = sessions
        .iter()
        .filter(|s| s.ready)
        .map(|s| s.id.as_str())
        .collect();
    Ok(Json(json!({
        "ok": true,
        "sessions": sessions,
        "readySessions": ready,
    })))
}

/// `POST /api/sessions`
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<Value>, ApiError> {
    let record = state.controller.create(body.into_new_session()?).await?;
    Ok(Json(json!({ "ok": true, "session": record })))
}

/// `POST /api/sessions/bulk`
///
/// One bad entry never fails the batch; each item carries its own outcome.
pub async fn create_sessions_bulk(
    State(state): State<AppState>,
    Json(bodies): Json<Vec<CreateSessionBody>>,
) -> Result<Json<Value>, ApiError> {
    if bodies.is_empty() {
        return Err(Error::invalid_argument("session list is empty").into());
    }

    let mut results = Vec::with_capacity(bodies.len());
    for body in bodies {
        let id = body.id.clone().unwrap_or_default();
        let outcome = match body.into_new_session() {
            Ok(new) => state.controller.create(new).await,
            Err(err) => Err(err),
        };
        results.push(match outcome {
            Ok(record) => json!({ "id": record.id, "ok": true, "session": record }),
            Err(err) => json!({ "id": id, "ok": false, "error": err.to_string() }),
        });
    }
    Ok(Json(json!({ "ok": true, "results": results })))
}

const MAX_AUTO_GENERATE: u32 = 100;

fn default_auto_prefix() -> String {
    "auto".into()
}

fn default_auto_name_prefix() -> String {
    "Auto Session".into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoGenerateBody {
    pub count: u32,
    #[serde(default = "default_auto_prefix")]
    pub prefix: String,
    #[serde(default = "default_auto_name_prefix")]
    pub name_prefix: String,
}

/// `POST /api/sessions/auto-generate`
///
/// Mints `{prefix}1..{prefix}N`, skipping ids that already exist. Per-id
/// failures are logged and skipped like seed sessions at startup.
pub async fn auto_generate_sessions(
    State(state): State<AppState>,
    Json(body): Json<AutoGenerateBody>,
) -> Result<Json<Value>, ApiError> {
    if body.count == 0 || body.count > MAX_AUTO_GENERATE {
        return Err(Error::invalid_argument(format!(
            "count must be between 1 and {MAX_AUTO_GENERATE}"
        ))
        .into());
    }

    let mut created = Vec::new();
    for i in 1..=body.count {
        let id = format!("{}{i}", body.prefix);
        if state.store.get(&id).await?.is_some() {
            continue;
        }
        let new = NewSession {
            id: id.clone(),
            name: format!("{} {i}", body.name_prefix),
            description: Some(format!("Auto-generated session {i}")),
        };
        match state.controller.create(new).await {
            Ok(record) => created.push(record.id),
            Err(err) => warn!(session_id = %id, error = %err, "auto-generate skipped session"),
        }
    }

    let total = state.store.list().await?.len();
    Ok(Json(json!({
        "ok": true,
        "sessions": created,
        "totalSessions": total,
    })))
}

/// `GET /api/sessions/{id}`
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| Error::not_found(&id))?;
    let has_qr = state.controller.has_qr(&id);
    Ok(Json(json!({ "ok": true, "session": record, "hasQr": has_qr })))
}

/// `DELETE /api/sessions/{id}`
pub async fn remove_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.controller.remove(&id).await?;
    Ok(Json(json!({ "ok": true, "removed": id })))
}

/// `GET /api/sessions/{id}/qr`
///
/// The non-image outcomes are 200s with a `status` discriminator; only an
/// unknown session is an error.
pub async fn session_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let body = match state.controller.qr_lookup(&id).await? {
        QrLookup::Available(artifact) => json!({
            "ok": true,
            "status": "available",
            "qrImage": artifact.image_data,
            "expiresAt": artifact.expires_at,
        }),
        QrLookup::AlreadyAuthenticated => json!({
            "ok": true,
            "status": "already_authenticated",
        }),
        QrLookup::NotAvailable => json!({
            "ok": true,
            "status": "not_available",
        }),
    };
    Ok(Json(body))
}

/// `POST /api/sessions/{id}/logout`
pub async fn logout_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.controller.logout(&id).await?;
    Ok(Json(json!({ "ok": true, "loggedOut": id })))
}

/// `POST /api/sessions/{id}/reconnect`
pub async fn reconnect_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.controller.reinitialize(&id).await?;
    Ok(Json(json!({ "ok": true, "result": outcome })))
}
