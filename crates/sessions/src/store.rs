use {
    async_trait::async_trait,
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
};

use crate::{
    error::{Error, Result},
    record::{SessionRecord, SessionStatus, StatusChange, unix_now},
};

/// Durable, queryable state for each session.
///
/// All mutations after insert go through [`SessionStore::apply`], one atomic
/// transition per call.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, record: SessionRecord) -> Result<()>;
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>>;
    /// All records in creation order.
    async fn list(&self) -> Result<Vec<SessionRecord>>;
    /// Ready records in creation order — the selector's input, recomputed
    /// fresh on every call.
    async fn list_ready(&self) -> Result<Vec<SessionRecord>>;
    async fn apply(&self, session_id: &str, change: StatusChange) -> Result<()>;
    /// Delete a record. Returns whether a row existed.
    async fn delete(&self, session_id: &str) -> Result<bool>;
}

/// Single-connection in-memory pool for tests and ephemeral deployments.
///
/// SQLite gives every connection its own `:memory:` database, so the pool
/// must never grow past (or drop) its one connection.
pub async fn memory_pool() -> Result<SqlitePool> {
    Ok(SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?)
}

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    name: String,
    description: Option<String>,
    phone: Option<String>,
    status: String,
    authenticated: bool,
    ready: bool,
    connected_at: Option<i64>,
    last_activity_at: i64,
    created_at: i64,
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = Error;

    fn try_from(r: SessionRow) -> Result<Self> {
        let status = r
            .status
            .parse::<SessionStatus>()
            .map_err(Error::invalid_argument)?;
        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            phone: r.phone,
            status,
            authenticated: r.authenticated,
            ready: r.ready,
            connected_at: r.connected_at,
            last_activity_at: r.last_activity_at,
            created_at: r.created_at,
        })
    }
}

/// SQLite-backed session store.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the sessions table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS sessions (
                id               TEXT    PRIMARY KEY,
                name             TEXT    NOT NULL,
                description      TEXT,
                phone            TEXT,
                status           TEXT    NOT NULL,
                authenticated    INTEGER NOT NULL DEFAULT 0,
                ready            INTEGER NOT NULL DEFAULT 0,
                connected_at     INTEGER,
                last_activity_at INTEGER NOT NULL,
                created_at       INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn insert(&self, record: SessionRecord) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO sessions
             (id, name, description, phone, status, authenticated, ready,
              connected_at, last_activity_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.phone)
        .bind(record.status.as_str())
        .bind(record.authenticated)
        .bind(record.ready)
        .bind(record.connected_at)
        .bind(record.last_activity_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::duplicate_session(record.id))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<SessionRecord>> {
        let rows =
            sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_ready(&self) -> Result<Vec<SessionRecord>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE ready = 1 ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn apply(&self, session_id: &str, change: StatusChange) -> Result<()> {
        let now = unix_now();
        let status = change.status().as_str();

        // One UPDATE per transition: each arm owns and fully replaces its
        // fields, so interleaved events never observe partial state.
        let result = match change {
            StatusChange::Initializing => {
                sqlx::query("UPDATE sessions SET status = ?, last_activity_at = ? WHERE id = ?")
                    .bind(status)
                    .bind(now)
                    .bind(session_id)
                    .execute(&self.pool)
                    .await?
            },
            StatusChange::WaitingQr => {
                sqlx::query(
                    "UPDATE sessions SET status = ?, authenticated = 0, ready = 0,
                     connected_at = NULL, last_activity_at = ? WHERE id = ?",
                )
                .bind(status)
                .bind(now)
                .bind(session_id)
                .execute(&self.pool)
                .await?
            },
            StatusChange::Authenticated => {
                sqlx::query(
                    "UPDATE sessions SET status = ?, authenticated = 1, ready = 0,
                     last_activity_at = ? WHERE id = ?",
                )
                .bind(status)
                .bind(now)
                .bind(session_id)
                .execute(&self.pool)
                .await?
            },
            StatusChange::AuthFailed => {
                sqlx::query(
                    "UPDATE sessions SET status = ?, authenticated = 0, ready = 0,
                     connected_at = NULL, last_activity_at = ? WHERE id = ?",
                )
                .bind(status)
                .bind(now)
                .bind(session_id)
                .execute(&self.pool)
                .await?
            },
            StatusChange::Ready { phone } => {
                sqlx::query(
                    "UPDATE sessions SET status = ?, authenticated = 1, ready = 1,
                     phone = ?, connected_at = ?, last_activity_at = ? WHERE id = ?",
                )
                .bind(status)
                .bind(&phone)
                .bind(now)
                .bind(now)
                .bind(session_id)
                .execute(&self.pool)
                .await?
            },
            StatusChange::Disconnected => {
                sqlx::query(
                    "UPDATE sessions SET status = ?, authenticated = 0, ready = 0,
                     phone = NULL, connected_at = NULL, last_activity_at = ? WHERE id = ?",
                )
                .bind(status)
                .bind(now)
                .bind(session_id)
                .execute(&self.pool)
                .await?
            },
            StatusChange::LoggedOut => {
                sqlx::query(
                    "UPDATE sessions SET status = ?, authenticated = 0, ready = 0,
                     phone = NULL, connected_at = NULL, last_activity_at = ? WHERE id = ?",
                )
                .bind(status)
                .bind(now)
                .bind(session_id)
                .execute(&self.pool)
                .await?
            },
        };

        if result.rows_affected() == 0 {
            return Err(Error::not_found(session_id));
        }
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
