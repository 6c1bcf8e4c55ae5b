use {async_trait::async_trait, serde::Serialize, sqlx::SqlitePool};

use crate::error::Result;

/// One row in the append-only send audit trail.
///
/// `session_id` is a soft reference: the owning session may be removed later
/// and the record survives.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: i64,
    pub session_id: String,
    pub message_id: String,
    pub to_number: String,
    pub content: Option<String>,
    pub media_type: Option<String>,
    pub file_name: Option<String>,
    pub caption: Option<String>,
    pub status: String,
    pub sent_at: i64,
}

/// Persistent audit log of outbound sends. Records are never mutated.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn append(&self, record: MessageRecord) -> Result<()>;
    async fn list(&self, limit: u32) -> Result<Vec<MessageRecord>>;
    async fn list_by_session(&self, session_id: &str, limit: u32) -> Result<Vec<MessageRecord>>;
}

/// SQLite-backed message log.
pub struct SqliteMessageLog {
    pool: SqlitePool,
}

impl SqliteMessageLog {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the messages table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT    NOT NULL,
                message_id TEXT    NOT NULL,
                to_number  TEXT    NOT NULL,
                content    TEXT,
                media_type TEXT,
                file_name  TEXT,
                caption    TEXT,
                status     TEXT    NOT NULL,
                sent_at    INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session_sent
             ON messages (session_id, sent_at DESC)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MessageLog for SqliteMessageLog {
    async fn append(&self, record: MessageRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO messages
             (session_id, message_id, to_number, content, media_type,
              file_name, caption, status, sent_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.session_id)
        .bind(&record.message_id)
        .bind(&record.to_number)
        .bind(&record.content)
        .bind(&record.media_type)
        .bind(&record.file_name)
        .bind(&record.caption)
        .bind(&record.status)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM messages ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_by_session(&self, session_id: &str, limit: u32) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM messages WHERE session_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
