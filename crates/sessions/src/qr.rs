use std::{collections::HashMap, sync::RwLock, time::Duration};

use {
    base64::{Engine as _, engine::general_purpose::STANDARD},
    serde::Serialize,
};

use crate::record::unix_now;

/// How long a login challenge stays servable once stored.
pub const QR_TTL: Duration = Duration::from_secs(5 * 60);

/// A stored login challenge for one session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrArtifact {
    /// Opaque encoded payload (base64 of the raw challenge). Rendering it to
    /// a scannable image is the caller's concern.
    pub image_data: String,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Short-lived per-session QR store. Memory-only: challenges are worthless
/// across a restart anyway.
#[derive(Default)]
pub struct QrCache {
    entries: RwLock<HashMap<String, QrArtifact>>,
}

impl QrCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a challenge, replacing any prior one — last challenge wins.
    pub fn put(&self, session_id: &str, raw: &str) {
        let now = unix_now();
        let artifact = QrArtifact {
            image_data: STANDARD.encode(raw),
            created_at: now,
            expires_at: now + QR_TTL.as_secs() as i64,
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), artifact);
    }

    /// Current artifact, or `None` when absent or past its expiry (expired
    /// entries count as absent even if never purged).
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<QrArtifact> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(session_id)
            .filter(|artifact| artifact.expires_at > unix_now())
            .cloned()
    }

    /// Drop a session's artifact. Idempotent.
    pub fn purge(&self, session_id: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_purge() {
        let cache = QrCache::new();
        assert!(cache.get("s1").is_none());

        cache.put("s1", "challenge-1");
        let artifact = cache.get("s1").unwrap();
        assert_eq!(artifact.image_data, STANDARD.encode("challenge-1"));
        assert_eq!(artifact.expires_at - artifact.created_at, 300);

        cache.purge("s1");
        assert!(cache.get("s1").is_none());
        // Idempotent.
        cache.purge("s1");
    }

    #[test]
    fn new_challenge_replaces_previous() {
        let cache = QrCache::new();
        cache.put("s1", "first");
        cache.put("s1", "second");
        assert_eq!(cache.get("s1").unwrap().image_data, STANDARD.encode("second"));
    }

    #[test]
    fn expired_artifact_reads_as_absent() {
        let cache = QrCache::new();
        cache.put("s1", "challenge");
        {
            let mut entries = cache.entries.write().unwrap();
            entries.get_mut("s1").unwrap().expires_at = unix_now() - 1;
        }
        assert!(cache.get("s1").is_none());
    }
}
