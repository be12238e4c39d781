//! valmon library crate.
//!
//! Polls Cosmos REST endpoints for events concerning a watched set of
//! validators and alerts on each new event once per retention window.

pub mod api;
pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod scheduler;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
