use std::{path::PathBuf, sync::Arc};

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    wamux_client::stub::StubFactory,
    wamux_gateway::GatewayConfig,
};

#[derive(Parser)]
#[command(name = "wamux", about = "wamux — WhatsApp multi-session send gateway")]
struct Cli {
    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "WAMUX_BIND")]
    bind: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000, env = "WAMUX_PORT")]
    port: u16,

    /// SQLite database file. Omit to keep state in memory.
    #[arg(long, env = "WAMUX_DB")]
    db: Option<PathBuf>,

    /// Country code prefixed to bare 10-digit numbers.
    #[arg(long, default_value = "91", env = "WAMUX_COUNTRY_CODE")]
    country_code: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "wamux starting");

    let config = GatewayConfig {
        bind: cli.bind,
        port: cli.port,
        database_path: cli.db,
        country_code: cli.country_code,
        seed_sessions: GatewayConfig::seed_sessions_from_env(),
    };

    // The browser-automation layer plugs in through `ClientFactory`; until
    // one is wired up the stub keeps the API honest about its absence.
    wamux_gateway::serve(config, Arc::new(StubFactory::default())).await
}
