/// Job identifier. Opaque to clients, rendered as a hyphenated UUID string.
pub type JobId = uuid::Uuid;

/// UTC timestamp used for every time column.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
