//! Configuration module.
//!
//! Configuration is a single TOML file, loaded once at startup and validated
//! before anything else is built from it.

mod app;
pub mod template;

pub use app::{
    AppConfig, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DatabaseConfig, FiltersConfig,
    IntegrationsConfig, MIN_POLL_INTERVAL_SECS, MonitorKind, NetworkConfig, TargetsConfig,
    ValidatorFilter, expand_home,
};
pub use template::{DEFAULT_CONFIG_TEMPLATE, write_default};
