use {thiserror::Error, wamux_client::ClientError};

/// Typed errors for the session core.
///
/// Validation errors fail before any session or external resource is
/// touched. `NoReadySessions` is transient and retryable for the caller;
/// `UnregisteredRecipient` is terminal. Nothing here is auto-retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("session already exists: {session_id}")]
    DuplicateSession { session_id: String },

    #[error("session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("no sessions are ready; authenticate at least one session")]
    NoReadySessions,

    #[error("number is not registered on WhatsApp: {number}")]
    UnregisteredRecipient { number: String },

    #[error("unsupported media type: {mime_type}")]
    UnsupportedMediaType { mime_type: String },

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("external client failed: {context}: {source}")]
    ExternalClient {
        context: String,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn duplicate_session(session_id: impl Into<String>) -> Self {
        Self::DuplicateSession {
            session_id: session_id.into(),
        }
    }

    #[must_use]
    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::NotFound {
            session_id: session_id.into(),
        }
    }

    #[must_use]
    pub fn external(context: impl Into<String>, source: ClientError) -> Self {
        Self::ExternalClient {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
