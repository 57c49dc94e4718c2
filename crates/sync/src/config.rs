use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SyncError;
use crate::syncer::SyncPolicy;

/// Remote store credentials. Never logged.
#[derive(Clone)]
pub struct SyncCredentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SyncCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCredentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sync configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub credentials: SyncCredentials,
    pub policy: SyncPolicy,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default  |
    /// |-------------------------|----------|
    /// | `SYNC_HOST`             | required |
    /// | `SYNC_USERNAME`         | required |
    /// | `SYNC_PASSWORD`         | required |
    /// | `SYNC_REMOTE_ROOT`      | `/PDF`   |
    /// | `SYNC_LOCAL_DEST`       | `input`  |
    /// | `SYNC_EXTENSION`        | `pdf`    |
    /// | `SYNC_MAX_ATTEMPTS`     | `3`      |
    /// | `SYNC_RETRY_DELAY_SECS` | `5`      |
    pub fn from_env() -> Result<Self, SyncError> {
        let credentials = SyncCredentials {
            host: required("SYNC_HOST")?,
            username: required("SYNC_USERNAME")?,
            password: required("SYNC_PASSWORD")?,
        };

        let remote_root = std::env::var("SYNC_REMOTE_ROOT").unwrap_or_else(|_| "/PDF".into());
        let local_dest: PathBuf = std::env::var("SYNC_LOCAL_DEST")
            .unwrap_or_else(|_| "input".into())
            .into();
        let extension = std::env::var("SYNC_EXTENSION").unwrap_or_else(|_| "pdf".into());

        let max_attempts: u32 = std::env::var("SYNC_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .map_err(|_| SyncError::Config("SYNC_MAX_ATTEMPTS must be a valid u32".into()))?;

        let retry_delay_secs: u64 = std::env::var("SYNC_RETRY_DELAY_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .map_err(|_| SyncError::Config("SYNC_RETRY_DELAY_SECS must be a valid u64".into()))?;

        Ok(Self {
            credentials,
            policy: SyncPolicy {
                remote_root,
                local_dest,
                extension,
                max_attempts: max_attempts.max(1),
                retry_delay: Duration::from_secs(retry_delay_secs),
            },
        })
    }
}

fn required(name: &str) -> Result<String, SyncError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::Config(format!("{name} must be set")))
}
