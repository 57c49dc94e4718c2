//! Domain types and pure logic for the document conversion service.
//!
//! This crate has no database or HTTP dependencies. It defines the job
//! model and its state machine, per-document conversion outcomes, the
//! [`queue::JobQueue`] contract that every backend implements, the
//! in-memory backend, fleet liveness probing built on that contract, and the
//! sync run report.

pub mod conversion;
pub mod error;
pub mod fleet;
pub mod hashing;
pub mod job;
pub mod layout;
pub mod queue;
pub mod sync_report;
pub mod types;
