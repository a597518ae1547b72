// Points Gateway Service - HTTP entry point for the points ledger

use points_gateway::{router, AppState};
use points_ledger::{Config, Ledger};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<Config> {
    let config = match std::env::var("POINTS_CONFIG") {
        Ok(path) => {
            info!("Loading configuration from {}", path);
            Config::from_file(&path)?
        }
        Err(_) => Config::default(),
    };

    Ok(config.with_env_overrides()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_line_number(true)
        .init();

    info!("Starting Points Gateway");

    let config = load_config()?;
    let ledger = Ledger::open(config.clone())?;
    info!(
        backend = ?config.storage.backend,
        policy = ?config.allocation.policy,
        "Ledger opened successfully"
    );

    let app = router(AppState::new(ledger.clone(), config.service_name.clone()));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on: {}", config.listen_addr);
    info!("   POST /add     - Credit points for a payer");
    info!("   POST /spend   - Spend points, oldest first");
    info!("   GET  /balance - Points per payer");
    info!("   GET  /health  - Health check");
    info!("   GET  /metrics - Prometheus metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutting down ledger");
    ledger.shutdown().await?;
    Ok(())
}
