//! API server setup

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes::create_router;
use super::state::AppState;
use crate::settings::Settings;

/// Serve the API until Ctrl-C
pub async fn run_server(settings: &Settings, state: AppState) -> anyhow::Result<()> {
    let mut router =
        create_router(state, settings.static_dir.as_deref()).layer(TraceLayer::new_for_http());

    if settings.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    tracing::info!("dashboard API listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("dashboard API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
