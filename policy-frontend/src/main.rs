use dotenvy::dotenv;
use policy_frontend::config::get_configuration;
use policy_frontend::services::session::SessionContext;
use policy_frontend::startup::build_router;
use policy_frontend::AppState;
use std::sync::Arc;
use store_core::observability::logging::init_tracing;
use store_core::store::{HostedStoreClient, IdentityStore};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("policy-frontend", "info");

    let store: Arc<dyn IdentityStore> =
        Arc::new(HostedStoreClient::new(configuration.store.clone()));
    let session = Arc::new(SessionContext::new(
        Arc::clone(&store),
        configuration.resolver.timeouts(),
    ));

    // Resolve any existing session before serving; every branch finishes
    // with loading=false within the safety bound.
    session.init().await;

    let app = build_router(AppState::new(store, Arc::clone(&session)));

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting policy-frontend on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    session.teardown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
