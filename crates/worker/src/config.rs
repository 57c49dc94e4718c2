use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Name reported in heartbeats and probe answers.
    pub worker_name: String,
    pub poll_interval: Duration,
    pub job_lease: Duration,
    pub converter_url: String,
    pub convert_timeout: Duration,
    pub metadata_path: PathBuf,
    /// Persist converted output here when set.
    pub output_dir: Option<PathBuf>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                   |
    /// |------------------------|---------------------------|
    /// | `DATABASE_URL`         | required                  |
    /// | `WORKER_NAME`          | `<hostname>-<pid>`        |
    /// | `POLL_INTERVAL_MS`     | `1000`                    |
    /// | `JOB_LEASE_SECS`       | `600`                     |
    /// | `CONVERTER_URL`        | `http://127.0.0.1:8188`   |
    /// | `CONVERT_TIMEOUT_SECS` | `600`                     |
    /// | `METADATA_PATH`        | `metadata_template.json`  |
    /// | `OUTPUT_DIR`           | unset                     |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let worker_name = std::env::var("WORKER_NAME").unwrap_or_else(|_| default_worker_name());

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let job_lease_secs: u64 = std::env::var("JOB_LEASE_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("JOB_LEASE_SECS must be a valid u64");

        let converter_url =
            std::env::var("CONVERTER_URL").unwrap_or_else(|_| "http://127.0.0.1:8188".into());

        let convert_timeout_secs: u64 = std::env::var("CONVERT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("CONVERT_TIMEOUT_SECS must be a valid u64");

        let metadata_path = std::env::var("METADATA_PATH")
            .unwrap_or_else(|_| "metadata_template.json".into())
            .into();

        let output_dir = std::env::var("OUTPUT_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            database_url,
            worker_name,
            poll_interval: Duration::from_millis(poll_interval_ms),
            job_lease: Duration::from_secs(job_lease_secs),
            converter_url,
            convert_timeout: Duration::from_secs(convert_timeout_secs),
            metadata_path,
            output_dir,
        }
    }
}

fn default_worker_name() -> String {
    let host = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "worker".into());
    format!("{host}-{}", std::process::id())
}
