use canteen_admin::{config::Config, router, AppState};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let state = AppState::new(config.clone());

    if let Err(err) = state.offline.install().await {
        warn!("offline cache not primed, continuing without it: {err}");
    }
    state.offline.activate().await;

    let dashboard = state.dashboard.start(config.poll_interval);
    let orders = state.orders.start(config.poll_interval);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(upstream = %config.base_url, range = %config.range, "listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dashboard.shutdown().await;
    orders.shutdown().await;
    state.dashboard.teardown().await;
    info!("pollers stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
