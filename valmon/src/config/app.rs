//! Application configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::notification::channels::{SendGridConfig, WebhookConfig};
use crate::utils::url::is_http_url;
use crate::{Error, Result};

/// Default configuration directory name inside the user's home directory.
pub const CONFIG_DIR_NAME: &str = ".valmon";

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Minimum accepted poll interval in seconds (exclusive).
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

fn default_alert_ttl_days() -> u64 {
    30
}

fn default_listen_addr() -> String {
    "0.0.0.0:36655".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Monitor selection as written in the `monitors` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorKind {
    /// Every known monitor.
    #[serde(rename = "*")]
    All,
    #[serde(rename = "new_proposals")]
    NewProposals,
    #[serde(rename = "active_proposals")]
    ActiveProposals,
    #[serde(rename = "jailed_validators")]
    JailedValidators,
    #[serde(rename = "double_signing")]
    DoubleSigning,
    #[serde(rename = "missing_signatures")]
    MissingSignatures,
}

impl MonitorKind {
    /// Every concrete monitor, in the order they run when `*` is configured.
    pub const CONCRETE: [MonitorKind; 5] = [
        MonitorKind::NewProposals,
        MonitorKind::ActiveProposals,
        MonitorKind::JailedValidators,
        MonitorKind::DoubleSigning,
        MonitorKind::MissingSignatures,
    ];
}

/// Embedded database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the SQLite database file.
    pub data_dir: PathBuf,
}

/// Upstream endpoints and the status server address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Status server bind address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Trusted REST endpoints, used round-robin.
    #[serde(default)]
    pub clients: Vec<String>,
    /// Share one endpoint rotation across every monitor instead of one per monitor.
    #[serde(default)]
    pub shared_pool: bool,
    /// Deadline for each upstream request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Alert targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default)]
    pub webhooks: Vec<String>,
    #[serde(default)]
    pub sms_recipients: Vec<String>,
    #[serde(default)]
    pub email_recipients: Vec<String>,
}

/// A watched validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorFilter {
    /// Operator (owner) bech32 address, matched by staking monitors.
    pub operator: String,
    /// Consensus hex address, matched by slashing monitors.
    pub address: String,
}

/// Watch filters applied by the monitors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Accepts either a single `[filters.validator]` table or an array of tables.
    #[serde(
        rename = "validator",
        default,
        deserialize_with = "deserialize_one_or_many"
    )]
    pub validators: Vec<ValidatorFilter>,
}

/// Third-party delivery integrations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    #[serde(default)]
    pub sendgrid: SendGridConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Poll interval in seconds.
    pub poll_interval: u64,
    /// Enabled monitors.
    pub monitors: Vec<MonitorKind>,
    /// Days an alerted event stays suppressed.
    #[serde(default = "default_alert_ttl_days")]
    pub alert_ttl_days: u64,
    pub database: DatabaseConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

impl AppConfig {
    /// Default configuration file path (`~/.valmon/config.toml`).
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::config("unable to determine the home directory"))?;
        Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// The result is parsed but not validated; call [`AppConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        debug!(path = %path.display(), "Loading configuration");
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            Error::config(format!(
                "failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(raw)?;
        config.database.data_dir = expand_home(&config.database.data_dir);
        Ok(config)
    }

    /// Validate the parsed configuration. The first problem found is returned.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval <= MIN_POLL_INTERVAL_SECS {
            return Err(invalid(format!(
                "poll_interval must be greater than {} seconds",
                MIN_POLL_INTERVAL_SECS
            )));
        }

        if self.monitors.is_empty() {
            return Err(invalid("at least one monitor must be enabled"));
        }
        if self.monitors.contains(&MonitorKind::All) && self.monitors.len() > 1 {
            return Err(invalid(
                "'*' cannot be combined with specific monitor names",
            ));
        }

        if self.alert_ttl_days == 0 {
            return Err(invalid("alert_ttl_days must be at least 1"));
        }

        if self.database.data_dir.as_os_str().is_empty() {
            return Err(invalid("database.data_dir is required"));
        }

        if self.network.clients.is_empty() {
            return Err(invalid("network.clients must list at least one endpoint"));
        }
        if let Some(bad) = self.network.clients.iter().find(|c| !is_http_url(c)) {
            return Err(invalid(format!("invalid client endpoint: {}", bad)));
        }
        if self.network.request_timeout_secs == 0 {
            return Err(invalid("network.request_timeout_secs must be at least 1"));
        }

        let targets = &self.targets;
        if targets.email_recipients.is_empty()
            && targets.sms_recipients.is_empty()
            && targets.webhooks.is_empty()
        {
            return Err(invalid("no alert targets provided"));
        }
        if let Some(bad) = targets.webhooks.iter().find(|w| !is_http_url(w)) {
            return Err(invalid(format!("invalid webhook target: {}", bad)));
        }
        if let Some(bad) = targets
            .email_recipients
            .iter()
            .find(|e| !looks_like_email(e))
        {
            return Err(invalid(format!("invalid email recipient: {}", bad)));
        }
        let uses_sendgrid =
            !targets.email_recipients.is_empty() || !targets.sms_recipients.is_empty();
        if uses_sendgrid && self.integrations.sendgrid.api_key.trim().is_empty() {
            return Err(invalid(
                "integrations.sendgrid.api_key is required for email and SMS targets",
            ));
        }

        for filter in &self.filters.validators {
            if filter.operator.trim().is_empty() {
                return Err(invalid("validator filter operator is required"));
            }
            if filter.address.is_empty() || !filter.address.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(invalid(format!(
                    "validator filter address must be hexadecimal: {}",
                    filter.address
                )));
            }
        }

        Ok(())
    }

    /// Concrete monitors to run, in execution order, without duplicates.
    pub fn enabled_monitors(&self) -> Vec<MonitorKind> {
        if self.monitors.contains(&MonitorKind::All) {
            return MonitorKind::CONCRETE.to_vec();
        }

        let mut enabled = Vec::with_capacity(self.monitors.len());
        for kind in &self.monitors {
            if !enabled.contains(kind) {
                enabled.push(*kind);
            }
        }
        enabled
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Retention window of alert entries.
    pub fn alert_ttl(&self) -> Duration {
        Duration::from_secs(self.alert_ttl_days.saturating_mul(24 * 60 * 60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::config(format!("invalid configuration: {}", msg.into()))
}

fn looks_like_email(candidate: &str) -> bool {
    match candidate.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn deserialize_one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<ValidatorFilter>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(ValidatorFilter),
        Many(Vec<ValidatorFilter>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(filter) => vec![filter],
        OneOrMany::Many(filters) => filters,
    })
}
