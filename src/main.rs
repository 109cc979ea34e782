use tenant_admin_api::{app, config, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up AZURE_STORAGE_*, GRAPH_*, etc.
    let _ = dotenvy::dotenv();

    let default_filter = if tenant_admin_api::is_production!() {
        "info"
    } else {
        "info,tenant_admin_api=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Tenant Admin API in {:?} mode", config.environment);

    let state = AppState::from_config(config)?;
    let app = app(state, config);

    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Tenant Admin API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
