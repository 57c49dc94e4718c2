//! Row structs for the job queue tables and lookup-table status enums.

pub mod job;
pub mod status;
