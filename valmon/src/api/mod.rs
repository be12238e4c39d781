//! Status API server module.
//!
//! Read-only HTTP endpoints reporting the latest poll cycle and process
//! health.

pub mod error;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
