use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ispsync_core::crypto::CredentialCipher;
use ispsync_core::sync::{SyncDispatcher, SyncExecutor, SyncStores};
use ispsync_db::{PgAccessGate, PgSyncStore};
use ispsync_events::{EventBus, EventLogger};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ispsync_api::config::ServerConfig;
use ispsync_api::router::build_app_router;
use ispsync_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ispsync_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        provider_timeout_secs = config.sync.provider_timeout.as_secs(),
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set in the environment")?;
    let pool = ispsync_db::create_pool(&database_url).await?;
    ispsync_db::health_check(&pool).await?;
    ispsync_db::run_migrations(&pool).await?;
    tracing::info!("Database ready, migrations applied");

    // --- Sync engine ---
    let cipher = CredentialCipher::from_secret(&config.sync.credentials_secret)?;
    let registry = ispsync_network::provider_registry(cipher.clone(), config.sync.provider_timeout)?;
    let gate = Arc::new(PgAccessGate::new(pool.clone()));
    let dispatcher = Arc::new(SyncDispatcher::new(
        gate.clone(),
        SyncStores::shared(Arc::new(PgSyncStore::new(pool.clone()))),
        SyncExecutor::new(registry, config.sync.provider_timeout),
    ));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let events_cancel = CancellationToken::new();
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe(), events_cancel.clone()));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        gate,
        dispatcher,
        cipher,
        event_bus: Arc::clone(&event_bus),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining background tasks");
    let drain = Duration::from_secs(config.shutdown_timeout_secs);

    // Dropping the last sender closes the channel; the logger drains what is
    // buffered and exits.
    drop(event_bus);
    if tokio::time::timeout(drain, logger_handle).await.is_err() {
        tracing::warn!("Event logger did not stop within the shutdown timeout");
        events_cancel.cancel();
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
