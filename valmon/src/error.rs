//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseSqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered but the response could not be used.
    #[error("Monitor error: {0}")]
    Monitor(String),

    /// A probe ran successfully but found nothing worth alerting on.
    #[error("{probe}: nothing to report")]
    NoObservation { probe: String },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn monitor(msg: impl Into<String>) -> Self {
        Self::Monitor(msg.into())
    }

    pub fn no_observation(probe: impl Into<String>) -> Self {
        Self::NoObservation {
            probe: probe.into(),
        }
    }

    /// Whether this is the benign "nothing to report" outcome of a probe.
    pub fn is_no_observation(&self) -> bool {
        matches!(self, Self::NoObservation { .. })
    }
}
