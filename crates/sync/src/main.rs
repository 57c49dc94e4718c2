use std::process::ExitCode;
use std::sync::Arc;

use docflow_sync::{FileSyncer, SyncConfig, WebDavStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SyncConfig::from_env().expect("Invalid sync configuration");
    tracing::info!(
        host = %config.credentials.host,
        root = %config.policy.remote_root,
        dest = %config.policy.local_dest.display(),
        "Starting sync",
    );

    let store = Arc::new(WebDavStore::new(&config.credentials));
    let syncer = FileSyncer::new(store, config.policy);

    match syncer.run().await {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "Failed to render sync report"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync aborted");
            ExitCode::FAILURE
        }
    }
}
