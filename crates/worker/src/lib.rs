//! Conversion worker: one-time model loading, job execution, batch
//! coordination and the claim loop that feeds them from the job queue.

pub mod batch;
pub mod config;
pub mod converter;
pub mod error;
pub mod http_converter;
pub mod persist;
pub mod pipeline;
pub mod pool;
pub mod runner;
pub mod task;
