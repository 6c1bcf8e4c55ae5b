use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Where a session sits in its lifecycle.
///
/// Removal is not a stored status: a removed session's row is deleted and
/// lookups report it as not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Initializing,
    WaitingQr,
    Authenticated,
    Ready,
    AuthFailed,
    Disconnected,
    LoggedOut,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Initializing => "initializing",
            Self::WaitingQr => "waiting_qr",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::AuthFailed => "auth_failed",
            Self::Disconnected => "disconnected",
            Self::LoggedOut => "logged_out",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "initializing" => Ok(Self::Initializing),
            "waiting_qr" => Ok(Self::WaitingQr),
            "authenticated" => Ok(Self::Authenticated),
            "ready" => Ok(Self::Ready),
            "auth_failed" => Ok(Self::AuthFailed),
            "disconnected" => Ok(Self::Disconnected),
            "logged_out" => Ok(Self::LoggedOut),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// Durable state of one session.
///
/// `authenticated` and `ready` are derivable from `status` but kept as
/// columns for fast filtering. Invariant: `ready` implies `authenticated`,
/// and `phone` is non-null only while ready or immediately after, pending
/// explicit clear.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub status: SessionStatus,
    pub authenticated: bool,
    pub ready: bool,
    pub connected_at: Option<i64>,
    pub last_activity_at: i64,
    pub created_at: i64,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: Option<String>) -> Self {
        let now = unix_now();
        Self {
            id: id.into(),
            name: name.into(),
            description,
            phone: None,
            status: SessionStatus::Created,
            authenticated: false,
            ready: false,
            connected_at: None,
            last_activity_at: now,
            created_at: now,
        }
    }
}

/// One atomic state transition.
///
/// Every variant fully replaces the fields it owns in a single update, so
/// concurrent event handling never degenerates into read-modify-write races.
#[derive(Debug, Clone)]
pub enum StatusChange {
    Initializing,
    WaitingQr,
    Authenticated,
    AuthFailed,
    Ready { phone: Option<String> },
    Disconnected,
    LoggedOut,
}

impl StatusChange {
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Initializing => SessionStatus::Initializing,
            Self::WaitingQr => SessionStatus::WaitingQr,
            Self::Authenticated => SessionStatus::Authenticated,
            Self::AuthFailed => SessionStatus::AuthFailed,
            Self::Ready { .. } => SessionStatus::Ready,
            Self::Disconnected => SessionStatus::Disconnected,
            Self::LoggedOut => SessionStatus::LoggedOut,
        }
    }
}
