//! Docflow API server library.
//!
//! Exposes the dispatcher facade, configuration, state, error handling and
//! routes so integration tests and the binary entrypoint share them.

pub mod background;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
