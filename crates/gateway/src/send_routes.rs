//! Outbound send endpoints and the audit log view.

use {
    axum::{
        Json,
        extract::{Multipart, Query, State, multipart::MultipartError},
        http::StatusCode,
    },
    base64::{Engine as _, engine::general_purpose::STANDARD},
    bytes::Bytes,
    serde::Deserialize,
    serde_json::{Value, json},
    wamux_client::MediaPayload,
    wamux_sessions::{Error, MediaSource, SendMediaRequest, SendReceipt, SendTextRequest, media},
};

use crate::{
    error::ApiError,
    server::{AppState, BODY_LIMIT},
};

const DEFAULT_MESSAGE_LIMIT: u32 = 50;
const MAX_MESSAGE_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    pub to: Option<String>,
    pub message: Option<String>,
    pub session_id: Option<String>,
}

fn receipt_body(receipt: &SendReceipt) -> Result<Value, Error> {
    let mut body = serde_json::to_value(receipt)?;
    if let Some(map) = body.as_object_mut() {
        map.insert("ok".into(), Value::Bool(true));
    }
    Ok(body)
}

/// `POST /api/send`
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendBody>,
) -> Result<Json<Value>, ApiError> {
    let req = SendTextRequest {
        to: body.to.unwrap_or_default(),
        message: body.message.unwrap_or_default(),
        session_id: body.session_id,
    };
    let receipt = state.dispatcher.send_text(req).await?;
    Ok(Json(receipt_body(&receipt)?))
}

/// `POST /api/send-media` — multipart: a `media` file part plus `to`,
/// optional `caption` and `sessionId` text parts.
pub async fn send_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut media_part: Option<MediaPayload> = None;
    let mut to = None;
    let mut caption = None;
    let mut session_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "media" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let file_name = field.file_name().map(String::from);
                let bytes: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, "unreadable media part"))?;
                media_part = Some(MediaPayload {
                    bytes,
                    mime_type,
                    file_name,
                });
            },
            "to" => to = Some(read_text(field).await?),
            "caption" => caption = Some(read_text(field).await?),
            "sessionId" => session_id = Some(read_text(field).await?),
            _ => {},
        }
    }

    let media = media_part.ok_or_else(|| Error::invalid_argument("media file is required"))?;
    let to = to.ok_or_else(|| Error::invalid_argument("to is required"))?;

    let req = SendMediaRequest {
        to,
        media,
        caption: caption.filter(|c| !c.trim().is_empty()),
        session_id: session_id.filter(|s| !s.trim().is_empty()),
        source: None,
    };
    let receipt = state.dispatcher.send_media(req).await?;
    Ok(Json(receipt_body(&receipt)?))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, Error> {
    field.text().await.map_err(|e| multipart_error(e, "unreadable text part"))
}

/// A body that trips the service-wide limit is a size problem, not a framing
/// problem; keep the 413 taxonomy for it.
fn multipart_error(e: MultipartError, context: &str) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::PayloadTooLarge {
            size: BODY_LIMIT,
            limit: media::MAX_MEDIA_BYTES,
        };
    }
    Error::invalid_argument(format!("{context}: {e}"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMediaUrlBody {
    pub to: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
    pub session_id: Option<String>,
}

/// `POST /api/send-media-url` — media referenced by a `data:` URI or a
/// fetchable URL instead of an uploaded part.
pub async fn send_media_url(
    State(state): State<AppState>,
    Json(body): Json<SendMediaUrlBody>,
) -> Result<Json<Value>, ApiError> {
    let to = body.to.unwrap_or_default();
    let media_url = body.media_url.unwrap_or_default();
    let media_type = body.media_type.unwrap_or_default();
    if to.trim().is_empty() || media_url.trim().is_empty() || media_type.trim().is_empty() {
        return Err(Error::invalid_argument("to, mediaUrl and mediaType are required").into());
    }

    let (bytes, source, file_name) = if let Some(uri) = media_url.strip_prefix("data:") {
        let payload = uri
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| Error::invalid_argument("data URI carries no payload"))?;
        let decoded = STANDARD
            .decode(payload)
            .map_err(|e| Error::invalid_argument(format!("undecodable data URI: {e}")))?;
        (Bytes::from(decoded), MediaSource::Base64, body.filename)
    } else {
        let bytes = fetch_media(&media_url).await?;
        // A caller-supplied name only makes sense for document-like types;
        // images and the rest go out under the payload's own identity.
        let file_name = body
            .filename
            .filter(|_| media_type.contains("application/") || media_type.contains("text/"));
        (bytes, MediaSource::Url, file_name)
    };

    let req = SendMediaRequest {
        to,
        media: MediaPayload {
            bytes,
            mime_type: media_type,
            file_name,
        },
        caption: body.caption.filter(|c| !c.trim().is_empty()),
        session_id: body.session_id.filter(|s| !s.trim().is_empty()),
        source: Some(source),
    };
    let receipt = state.dispatcher.send_media(req).await?;
    Ok(Json(receipt_body(&receipt)?))
}

/// The remote end is the caller's choice, so its failures are the caller's
/// problem, not an internal one.
async fn fetch_media(url: &str) -> Result<Bytes, Error> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::invalid_argument(format!("media url is unreachable: {e}")))?;
    if !response.status().is_success() {
        return Err(Error::invalid_argument(format!(
            "media url answered {}",
            response.status()
        )));
    }
    response
        .bytes()
        .await
        .map_err(|e| Error::invalid_argument(format!("media url body is unreadable: {e}")))
}

/// `GET /api/media-types`
pub async fn media_types() -> Json<Value> {
    Json(json!({ "ok": true, "capabilities": media::capabilities() }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub session_id: Option<String>,
    pub limit: Option<u32>,
}

/// `GET /api/messages` — most recent sends first. Records outlive their
/// sessions, so this also serves removed-session history.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MESSAGE_LIMIT)
        .min(MAX_MESSAGE_LIMIT);
    let messages = match query.session_id.as_deref() {
        Some(session_id) => state.message_log.list_by_session(session_id, limit).await?,
        None => state.message_log.list(limit).await?,
    };
    Ok(Json(json!({ "ok": true, "messages": messages })))
}
