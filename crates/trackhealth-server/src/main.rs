use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use trackhealth_server::state::AppState;

/// `trackhealth health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$TRACKHEALTH_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("TRACKHEALTH_PORT").unwrap_or_else(|_| "4000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — handled before tokio does any real work
    // so the probe stays fast.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trackhealth=info".parse()?),
        )
        .json()
        .init();

    let cfg = trackhealth_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/trackhealth.db", cfg.data_dir);

    let db = trackhealth_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    let port = cfg.port;
    let state = Arc::new(AppState::new(db, cfg)?);

    let addr = format!("0.0.0.0:{}", port);
    let app = trackhealth_server::app::build_app(Arc::clone(&state));

    info!(port, "trackhealth listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
