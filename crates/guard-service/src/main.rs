//! Guard Service
//!
//! Serves a protected API behind the Keycloak bearer-token guard.

use anyhow::Context;
use guard_service::config::ServiceConfig;
use guard_service::observability::init_metrics_recorder;
use guard_service::routes::{self, AppState};
use keycloak_guard::{InMemoryStore, KeycloakGuard, SubjectUserResolver};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guard_service=debug,keycloak_guard=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Guard Service");

    // Load configuration
    let config = ServiceConfig::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        well_known = %config.guard.well_known_url,
        client_resource = %config.guard.client_resource,
        introspect = config.guard.introspect,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder()
        .map_err(anyhow::Error::msg)
        .context("metrics recorder")?;

    let guard = KeycloakGuard::from_config(
        config.guard.clone(),
        Arc::new(InMemoryStore::new()),
        SubjectUserResolver,
    )
    .context("building Keycloak guard")?;

    // Warm the metadata cache; a failure here is logged and retried per request
    if let Err(e) = guard.discovery().ensure_metadata().await {
        error!("Initial provider discovery failed: {}", e);
    }

    let addr = config.bind_address;
    let state = Arc::new(AppState {
        config,
        guard: Arc::new(guard),
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("Guard Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Guard Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
