use thiserror::Error;

/// Error reported by the external automation layer.
///
/// The layer is opaque to us, so this carries a message rather than a typed
/// cause. Callers wrap it with their own context.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
}

impl ClientError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
