use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cattery_api::auth::FiefClient;
use cattery_api::config::Settings;
use cattery_api::database::MongoCatStore;
use cattery_api::services::CatService;
use cattery_api::AppState;

#[derive(Parser)]
#[command(name = "cattery-api")]
#[command(about = "Per-user cat records over HTTP")]
#[command(version)]
struct Args {
    #[arg(long, help = "Read settings from this file instead of ./.env")]
    env_file: Option<PathBuf>,

    #[arg(long, help = "Bind address (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Bind port (overrides PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load .env if present so cargo run picks up DATABASE_URI, FIEF_URL, etc.
    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let mut settings = Settings::from_env().context("invalid configuration")?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting {} {} in {} mode",
        settings.app_name,
        settings.app_version,
        settings.environment
    );
    tracing::debug!("Settings: {:?}", settings);

    let store = MongoCatStore::connect(&settings.database_uri)
        .await
        .context("failed to connect to MongoDB")?;
    let identity = FiefClient::new(&settings.identity).context("failed to build OIDC client")?;

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    let state = AppState {
        cats: CatService::new(Arc::new(store), settings.reference_offset),
        identity: Arc::new(identity),
        settings: Arc::new(settings),
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, cattery_api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
