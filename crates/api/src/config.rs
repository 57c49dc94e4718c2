use std::time::Duration;

use docflow_core::fleet::{DEFAULT_LIVENESS_WINDOW, DEFAULT_PROBE_TIMEOUT};
use docflow_core::queue::DEFAULT_LEASE;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Must exceed `convert_wait`.
    pub request_timeout_secs: u64,
    /// Timeout for `POST /sync`, which runs a whole sync before answering.
    pub sync_timeout: Duration,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
    /// How long a liveness probe waits for a worker.
    pub probe_timeout: Duration,
    /// How long `POST /convert` waits for its job.
    pub convert_wait: Duration,
    /// Terminal jobs older than this are evicted.
    pub job_retention: Duration,
    pub job_lease: Duration,
    /// Heartbeat window used to count live workers.
    pub liveness_window: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `8080`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `300`                   |
    /// | `SYNC_TIMEOUT_SECS`           | `3600`                  |
    /// | `MAX_UPLOAD_MB`               | `100`                   |
    /// | `PROBE_TIMEOUT_SECS`          | `3`                     |
    /// | `CONVERT_WAIT_SECS`           | `240`                   |
    /// | `JOB_RETENTION_HOURS`         | `24`                    |
    /// | `JOB_LEASE_SECS`              | `600`                   |
    /// | `WORKER_LIVENESS_WINDOW_SECS` | `60`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_mb: usize = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("MAX_UPLOAD_MB must be a valid usize");

        let job_retention_hours: u64 = std::env::var("JOB_RETENTION_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("JOB_RETENTION_HOURS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            sync_timeout: secs_var("SYNC_TIMEOUT_SECS", Duration::from_secs(3600)),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            probe_timeout: secs_var("PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT),
            convert_wait: secs_var("CONVERT_WAIT_SECS", Duration::from_secs(240)),
            job_retention: Duration::from_secs(job_retention_hours * 3600),
            job_lease: secs_var("JOB_LEASE_SECS", DEFAULT_LEASE),
            liveness_window: secs_var("WORKER_LIVENESS_WINDOW_SECS", DEFAULT_LIVENESS_WINDOW),
        }
    }
}

fn secs_var(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(value) => Duration::from_secs(
            value
                .parse()
                .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        ),
        Err(_) => default,
    }
}
