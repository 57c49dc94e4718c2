//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table.

use docflow_core::job::{JobKind, JobState};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Job lifecycle status (`job_statuses`).
    JobStatus {
        Pending = 1,
        Running = 2,
        Progress = 3,
        Success = 4,
        Failure = 5,
    }
}

define_status_enum! {
    /// Job kind (`job_kinds`).
    JobKindId {
        Single = 1,
        Batch = 2,
        Probe = 3,
    }
}

/// Non-terminal statuses: the job may still be claimed or advanced.
pub const LIVE_STATUSES: [StatusId; 3] = [
    JobStatus::Pending as StatusId,
    JobStatus::Running as StatusId,
    JobStatus::Progress as StatusId,
];

impl From<JobState> for JobStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Pending => JobStatus::Pending,
            JobState::Running => JobStatus::Running,
            JobState::Progress => JobStatus::Progress,
            JobState::Success => JobStatus::Success,
            JobState::Failure => JobStatus::Failure,
        }
    }
}

impl From<JobStatus> for JobState {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Running => JobState::Running,
            JobStatus::Progress => JobState::Progress,
            JobStatus::Success => JobState::Success,
            JobStatus::Failure => JobState::Failure,
        }
    }
}

impl From<JobKind> for JobKindId {
    fn from(kind: JobKind) -> Self {
        match kind {
            JobKind::Single => JobKindId::Single,
            JobKind::Batch => JobKindId::Batch,
            JobKind::Probe => JobKindId::Probe,
        }
    }
}

impl From<JobKindId> for JobKind {
    fn from(kind: JobKindId) -> Self {
        match kind {
            JobKindId::Single => JobKind::Single,
            JobKindId::Batch => JobKind::Batch,
            JobKindId::Probe => JobKind::Probe,
        }
    }
}
