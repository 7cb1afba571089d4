use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use job_portal_api::config::{self, AppConfig, Environment};
use job_portal_api::database::DatabaseManager;
use job_portal_api::{app, AppState};

#[derive(Parser, Debug)]
#[command(name = "job-portal-api", version, about = "Job portal HTTP backend")]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Deployment environment: development, staging or production (overrides APP_ENV)
    #[arg(long)]
    env: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, ACCESS_TOKEN_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match cli.env.as_deref() {
        Some(env) => AppConfig::for_environment(Environment::parse(env)).with_env_overrides(),
        None => config::config().clone(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::info!("Starting Job Portal API in {:?} mode", config.environment);

    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open document store")?;
    let state = AppState::new(config, store).context("invalid token configuration (is ACCESS_TOKEN_SECRET set?)")?;

    let bind_addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Job Portal API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
