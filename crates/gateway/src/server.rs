//! Router wiring and server lifecycle.

use std::sync::Arc;

use {
    axum::{
        Json, Router,
        extract::{DefaultBodyLimit, State},
        routing::{get, post},
    },
    serde_json::json,
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    },
    tower_http::{cors::CorsLayer, trace::TraceLayer},
    tracing::{info, warn},
    wamux_client::ClientFactory,
    wamux_sessions::{
        Dispatcher, MessageLog, NewSession, QrCache, SessionController, SessionSelector,
        SessionStore, SqliteMessageLog, SqliteSessionStore, media, memory_pool,
    },
};

use crate::{
    config::GatewayConfig,
    error::ApiError,
    send_routes, session_routes,
};

/// Slack on top of the media cap so multipart framing never trips the body
/// limit before the size check can produce a 413.
pub(crate) const BODY_LIMIT: usize = media::MAX_MEDIA_BYTES + 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<dyn SessionStore>,
    pub message_log: Arc<dyn MessageLog>,
}

/// Initialize schemas on the pool and assemble the service graph.
pub async fn build_state(
    pool: SqlitePool,
    factory: Arc<dyn ClientFactory>,
    country_code: impl Into<String>,
) -> anyhow::Result<AppState> {
    SqliteSessionStore::init(&pool).await?;
    SqliteMessageLog::init(&pool).await?;

    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(pool.clone()));
    let message_log: Arc<dyn MessageLog> = Arc::new(SqliteMessageLog::new(pool));
    let qr = Arc::new(QrCache::new());
    let controller = Arc::new(SessionController::new(
        Arc::clone(&store),
        qr,
        factory,
    ));
    let selector = Arc::new(SessionSelector::new(Arc::clone(&store)));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&controller),
        selector,
        Arc::clone(&message_log),
        country_code,
    ));

    Ok(AppState {
        controller,
        dispatcher,
        store,
        message_log,
    })
}

/// All routes plus the CORS / trace / body-limit layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route(
            "/api/sessions",
            get(session_routes::list_sessions).post(session_routes::create_session),
        )
        .route("/api/sessions/bulk", post(session_routes::create_sessions_bulk))
        .route(
            "/api/sessions/auto-generate",
            post(session_routes::auto_generate_sessions),
        )
        .route(
            "/api/sessions/{id}",
            get(session_routes::get_session).delete(session_routes::remove_session),
        )
        .route("/api/sessions/{id}/qr", get(session_routes::session_qr))
        .route("/api/sessions/{id}/logout", post(session_routes::logout_session))
        .route(
            "/api/sessions/{id}/reconnect",
            post(session_routes::reconnect_session),
        )
        .route("/api/send", post(send_routes::send_message))
        .route("/api/send-media", post(send_routes::send_media))
        .route("/api/send-media-url", post(send_routes::send_media_url))
        .route("/api/media-types", get(send_routes::media_types))
        .route("/api/messages", get(send_routes::list_messages))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /` — service health plus a per-session status summary.
async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let sessions = state.store.list().await?;
    let ready = sessions.iter().filter(|s| s.ready).count();
    let summaries: Vec<_> = sessions
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "status": s.status,
                "ready": s.ready,
            })
        })
        .collect();

    Ok(Json(json!({
        "name": "wamux",
        "status": "running",
        "totalSessions": sessions.len(),
        "readySessions": ready,
        "sessions": summaries,
    })))
}

/// Open the SQLite pool described by the config.
async fn open_pool(config: &GatewayConfig) -> anyhow::Result<SqlitePool> {
    match &config.database_path {
        Some(path) => {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            Ok(SqlitePoolOptions::new().connect_with(options).await?)
        },
        None => {
            warn!("no database path configured, records will not survive restarts");
            Ok(memory_pool().await?)
        },
    }
}

/// Create the configured seed sessions. Each failure is logged and skipped so
/// one bad entry never blocks startup.
async fn seed_sessions(state: &AppState, config: &GatewayConfig) {
    for seed in &config.seed_sessions {
        let new = NewSession {
            id: seed.id.clone(),
            name: seed.name.clone(),
            description: seed.description.clone(),
        };
        match state.controller.create(new).await {
            Ok(record) => info!(session_id = %record.id, "seeded session"),
            Err(err) => warn!(session_id = %seed.id, error = %err, "seed session failed"),
        }
    }
}

/// Run the gateway until ctrl-c, then disconnect every live session.
pub async fn serve(config: GatewayConfig, factory: Arc<dyn ClientFactory>) -> anyhow::Result<()> {
    let pool = open_pool(&config).await?;
    let state = build_state(pool, factory, config.country_code.clone()).await?;
    seed_sessions(&state, &config).await;

    let controller = Arc::clone(&state.controller);
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "wamux gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "shutdown signal listener failed");
            }
        })
        .await?;

    info!("shutting down, disconnecting sessions");
    controller.shutdown().await;
    Ok(())
}
