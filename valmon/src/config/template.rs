//! Default configuration file written by `valmon init`.

use std::path::Path;

use tracing::info;

use crate::{Error, Result};

/// Commented default configuration.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# valmon configuration

# Seconds between poll cycles. Must be greater than 10.
poll_interval = 15

# Enabled monitors: "*" alone, or any of
# new_proposals, active_proposals, jailed_validators, double_signing, missing_signatures
monitors = ["*"]

# Days an alerted event stays suppressed before it may alert again.
alert_ttl_days = 30

[database]
data_dir = "~/.valmon/data"

[network]
# Status server address.
listen_addr = "0.0.0.0:36655"
# Trusted REST endpoints, used round-robin.
clients = ["http://localhost:1317"]
# One endpoint rotation shared by all monitors instead of one per monitor.
shared_pool = false
request_timeout_secs = 10

[targets]
webhooks = ["http://localhost:8080/valmon"]
sms_recipients = []
email_recipients = []

# Repeat this table for every watched validator.
# [[filters.validator]]
# operator = "cosmosvaloper1..."
# address = "DBA70FA7E9D55E035AD87B41C4DC0C38511FD09A"

[integrations.sendgrid]
# Required when e-mail or SMS recipients are configured.
api_key = ""
from_name = "valmon"
from_address = "valmon@sendgrid.net"

[integrations.webhook]
method = "POST"
"#;

/// Write the default template to `path`, creating parent directories.
///
/// An existing file is only replaced when `force` is set.
pub fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::config(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;

    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}
