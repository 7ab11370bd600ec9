use std::net::SocketAddr;

use backend::domain::a002_customer;
use backend::shared::config;
use backend::shared::data::db;
use backend::{routes, system};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let cfg = config::load_config()?;
    let db_path = config::get_database_path(&cfg);
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address in config: {e}"))?;
    config::install(cfg);

    db::initialize_database(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;
    let conn = db::get_connection();

    system::initialization::ensure_admin_user_exists(conn).await?;

    let refreshed = a002_customer::service::refresh_expired_passes(conn, config::today())
        .await
        .map_err(|e| anyhow::anyhow!("Uptime Pass refresh failed: {e}"))?;
    tracing::info!("Startup pass refresh: {} expired", refreshed.expired_count);

    let app = routes::configure_routes();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Port {} is already in use. Please ensure no other process is using this port.",
                    addr.port()
                );
            } else {
                tracing::error!("Failed to bind to {}. Error: {}", addr, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
