//! Builds the configured probes.

use std::collections::BTreeSet;
use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use super::gov::{
    ACTIVE_PROPOSALS_MEMO, ACTIVE_PROPOSALS_NAME, NEW_PROPOSALS_MEMO, NEW_PROPOSALS_NAME,
    ProposalProbe,
};
use super::slashing::{
    DOUBLE_SIGN_MEMO, DOUBLE_SIGN_NAME, DoubleSignProbe, MISSING_SIGNATURES_MEMO,
    MISSING_SIGNATURES_NAME, MissingSignaturesProbe, normalize_addresses,
};
use super::staking::{JAILED_VALIDATORS_MEMO, JAILED_VALIDATORS_NAME, JailedValidatorsProbe};
use super::{EndpointSelector, Probe, ProbeContext};
use crate::Result;
use crate::config::{AppConfig, MonitorKind};

/// Build one probe per enabled monitor, in configuration order.
///
/// Each probe gets its own endpoint rotation unless `network.shared_pool`
/// is set, in which case all of them advance a single cursor.
pub fn create_probes(config: &AppConfig, client: &Client) -> Result<Vec<Arc<dyn Probe>>> {
    let clients = &config.network.clients;
    let shared = if config.network.shared_pool {
        Some(Arc::new(EndpointSelector::new(clients.clone())?))
    } else {
        None
    };
    let selector = || -> Result<Arc<EndpointSelector>> {
        match &shared {
            Some(selector) => Ok(selector.clone()),
            None => Ok(Arc::new(EndpointSelector::new(clients.clone())?)),
        }
    };

    let validators = &config.filters.validators;
    let addresses = normalize_addresses(validators.iter().map(|v| v.address.as_str()));
    let operators: BTreeSet<String> = validators
        .iter()
        .map(|v| v.operator.trim().to_string())
        .collect();

    let mut probes: Vec<Arc<dyn Probe>> = Vec::new();
    for kind in config.enabled_monitors() {
        let probe: Arc<dyn Probe> = match kind {
            MonitorKind::NewProposals => Arc::new(ProposalProbe::new_proposals(ProbeContext::new(
                NEW_PROPOSALS_NAME,
                NEW_PROPOSALS_MEMO,
                selector()?,
                client.clone(),
            ))),
            MonitorKind::ActiveProposals => {
                Arc::new(ProposalProbe::active_proposals(ProbeContext::new(
                    ACTIVE_PROPOSALS_NAME,
                    ACTIVE_PROPOSALS_MEMO,
                    selector()?,
                    client.clone(),
                )))
            }
            MonitorKind::JailedValidators => Arc::new(JailedValidatorsProbe::new(
                ProbeContext::new(
                    JAILED_VALIDATORS_NAME,
                    JAILED_VALIDATORS_MEMO,
                    selector()?,
                    client.clone(),
                ),
                operators.clone(),
            )),
            MonitorKind::DoubleSigning => Arc::new(DoubleSignProbe::new(
                ProbeContext::new(
                    DOUBLE_SIGN_NAME,
                    DOUBLE_SIGN_MEMO,
                    selector()?,
                    client.clone(),
                ),
                addresses.clone(),
            )),
            MonitorKind::MissingSignatures => Arc::new(MissingSignaturesProbe::new(
                ProbeContext::new(
                    MISSING_SIGNATURES_NAME,
                    MISSING_SIGNATURES_MEMO,
                    selector()?,
                    client.clone(),
                ),
                addresses.clone(),
            )),
            // Expanded by enabled_monitors().
            MonitorKind::All => continue,
        };
        probes.push(probe);
    }

    info!(
        count = probes.len(),
        shared_pool = config.network.shared_pool,
        "Probes created"
    );
    Ok(probes)
}
