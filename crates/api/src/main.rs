use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docflow_core::queue::JobQueue;
use docflow_db::PgJobQueue;
use docflow_sync::{FileSyncer, SyncConfig, WebDavStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docflow_api::background::job_retention;
use docflow_api::config::ServerConfig;
use docflow_api::dispatch::Dispatcher;
use docflow_api::router::build_app_router;
use docflow_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = docflow_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    docflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    docflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::with_lease(pool, config.job_lease));

    // --- Sync ---
    let syncer = match SyncConfig::from_env() {
        Ok(sync) => {
            tracing::info!(host = %sync.credentials.host, root = %sync.policy.remote_root, "Sync configured");
            let store = Arc::new(WebDavStore::new(&sync.credentials));
            Some(Arc::new(FileSyncer::new(store, sync.policy)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sync disabled");
            None
        }
    };

    // --- Dispatcher and fleet probe ---
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&queue),
        config.liveness_window,
        config.probe_timeout,
    ));
    let conversion_enabled = match dispatcher.fleet_status().await {
        Ok(fleet) if fleet.live => {
            tracing::info!(worker_count = fleet.worker_count, "Workers online, conversion routes enabled");
            true
        }
        Ok(_) => {
            tracing::warn!("No workers answered the startup probe, conversion routes disabled");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "Startup probe failed, conversion routes disabled");
            false
        }
    };

    // --- Job retention ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = tokio::spawn(job_retention::run(
        Arc::clone(&queue),
        config.job_retention,
        job_retention::EVICTION_INTERVAL,
        retention_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        dispatcher,
        config: Arc::new(config.clone()),
        syncer,
    };

    let app = build_app_router(state, &config, conversion_enabled);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Job retention stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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
