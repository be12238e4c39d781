use std::{sync::OnceLock, time::Duration};

use tracing::debug;

use crate::Result;

/// User agent sent with every upstream and delivery request.
pub const USER_AGENT: &str = concat!("valmon/", env!("CARGO_PKG_VERSION"));

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the shared `reqwest::Client` used by probes and notifiers.
///
/// Every request carries `request_timeout` as its deadline so a single
/// unresponsive endpoint cannot stall a poll cycle.
pub fn build_client(request_timeout: Duration) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

    if request_timeout > Duration::ZERO {
        builder = builder
            .timeout(request_timeout)
            .connect_timeout(request_timeout);
    }

    Ok(builder.build()?)
}
