//! Maps the session error taxonomy onto HTTP responses.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::json,
    wamux_sessions::Error,
};

/// Response-side wrapper so handlers can return `Result<_, ApiError>` and
/// use `?` on anything producing [`wamux_sessions::Error`].
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidArgument { .. } | Error::UnregisteredRecipient { .. } => {
                StatusCode::BAD_REQUEST
            },
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::DuplicateSession { .. } => StatusCode::CONFLICT,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::ExternalClient { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NoReadySessions => StatusCode::SERVICE_UNAVAILABLE,
            Error::Sqlx(_) | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = json!({ "ok": false, "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (Error::invalid_argument("x"), StatusCode::BAD_REQUEST),
            (Error::duplicate_session("a"), StatusCode::CONFLICT),
            (Error::not_found("a"), StatusCode::NOT_FOUND),
            (Error::NoReadySessions, StatusCode::SERVICE_UNAVAILABLE),
            (
                Error::UnregisteredRecipient {
                    number: "911234567890".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::UnsupportedMediaType {
                    mime_type: "application/x-msdownload".into(),
                },
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                Error::PayloadTooLarge { size: 1, limit: 0 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                Error::external("send", wamux_client::ClientError::new("down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
