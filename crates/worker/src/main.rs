use std::sync::Arc;

use docflow_core::queue::JobQueue;
use docflow_db::PgJobQueue;
use docflow_worker::config::WorkerConfig;
use docflow_worker::http_converter::HttpModelLoader;
use docflow_worker::persist::OutputWriter;
use docflow_worker::pool::WorkerPool;
use docflow_worker::runner::WorkerRunner;
use docflow_worker::task::JobExecutor;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    let pool = docflow_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    docflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection established");

    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::with_lease(pool, config.job_lease));

    let loader = Arc::new(HttpModelLoader::new(
        config.converter_url.clone(),
        config.convert_timeout,
    ));
    let worker_pool = Arc::new(WorkerPool::new(loader, config.metadata_path.clone()));
    let output = config.output_dir.clone().map(OutputWriter::new);
    if let Some(output) = &output {
        tracing::info!(output_dir = %output.root().display(), "Persisting conversion output");
    }

    let executor = Arc::new(JobExecutor::new(
        Arc::clone(&queue),
        worker_pool,
        output,
        config.worker_name.clone(),
        config.convert_timeout,
    ));
    let runner = WorkerRunner::new(queue, executor).with_poll_interval(config.poll_interval);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    runner.run(cancel).await;
    tracing::info!("Worker stopped");
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => tracing::info!("Received SIGINT, finishing current job"),
        _ = terminate => tracing::info!("Received SIGTERM, finishing current job"),
    }
}
