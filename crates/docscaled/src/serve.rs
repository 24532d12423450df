//! Server mode: opens the state store and serves the scaling endpoint.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tracing::info;

use docscale_autoscale::ScalingAdapter;
use docscale_core::DaemonConfig;
use docscale_state::StateStore;

/// Run the HTTP server until Ctrl-C.
pub async fn run_server(config: DaemonConfig) -> anyhow::Result<()> {
    info!("docscale daemon starting");

    std::fs::create_dir_all(&config.store.data_dir)?;
    let db_path = config.store.data_dir.join("docscale.redb");

    let store = Arc::new(StateStore::open(&db_path)?);
    info!(path = ?db_path, "state store opened");

    let adapter = Arc::new(ScalingAdapter::new(store.clone(), store));
    let router = docscale_api::build_router(adapter, &config.server.base_path);

    let ip: IpAddr = config.server.bind.parse()?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!(%addr, base_path = %config.server.base_path, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("docscale daemon stopped");
    Ok(())
}
