//! Ready-session selection for outbound sends.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::{Error, Result},
    record::SessionRecord,
    store::SessionStore,
};

/// Picks which ready session services a send.
///
/// The ready set is recomputed from the store on every call so concurrent
/// disconnects are reflected immediately. The round-robin cursor is owned
/// exclusively by this type; because it is reinterpreted against the live
/// set each call, fairness is approximate under churn — an accepted
/// trade-off, not a defect.
pub struct SessionSelector {
    store: Arc<dyn SessionStore>,
    cursor: Mutex<usize>,
}

impl SessionSelector {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            cursor: Mutex::new(0),
        }
    }

    /// Select a ready session.
    ///
    /// A preferred id that is currently ready is returned directly and never
    /// advances the cursor. Fails with `NoReadySessions` when nothing is
    /// ready.
    pub async fn select(&self, preferred: Option<&str>) -> Result<SessionRecord> {
        let ready = self.store.list_ready().await?;
        if ready.is_empty() {
            return Err(Error::NoReadySessions);
        }

        if let Some(preferred) = preferred {
            if let Some(record) = ready.iter().find(|r| r.id == preferred) {
                return Ok(record.clone());
            }
        }

        let mut cursor = self.cursor.lock().await;
        let index = *cursor % ready.len();
        *cursor = (index + 1) % ready.len();
        Ok(ready[index].clone())
    }
}
