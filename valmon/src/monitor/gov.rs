//! Governance proposal probes.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::types::Listing;
use super::{Observation, Probe, ProbeContext};
use crate::Result;

pub const NEW_PROPOSALS_NAME: &str = "gov/newProposals";
pub const NEW_PROPOSALS_MEMO: &str = "New Governance Proposals";
pub const ACTIVE_PROPOSALS_NAME: &str = "gov/activeProposals";
pub const ACTIVE_PROPOSALS_MEMO: &str = "New Active Governance Proposals";

const STATUS_DEPOSIT: &str = "DepositPeriod";
const STATUS_VOTING: &str = "VotingPeriod";

/// Reports every proposal currently in a given status.
///
/// The proposal list is re-serialized from parsed JSON, so object keys come
/// out sorted and the identity only changes when the proposals do.
pub struct ProposalProbe {
    ctx: ProbeContext,
    status: &'static str,
}

impl ProposalProbe {
    /// Proposals still collecting deposits.
    pub fn new_proposals(ctx: ProbeContext) -> Self {
        Self {
            ctx,
            status: STATUS_DEPOSIT,
        }
    }

    /// Proposals open for voting.
    pub fn active_proposals(ctx: ProbeContext) -> Self {
        Self {
            ctx,
            status: STATUS_VOTING,
        }
    }

    fn path(&self) -> String {
        format!("/gov/proposals?status={}", self.status)
    }
}

#[async_trait]
impl Probe for ProposalProbe {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn memo(&self) -> &str {
        self.ctx.memo()
    }

    async fn exec(&self) -> Result<Observation> {
        let proposals = self
            .ctx
            .fetch_json::<Listing<Value>>(&self.path())
            .await?
            .into_vec();

        if proposals.is_empty() {
            return Err(self.ctx.nothing_to_report());
        }

        debug!(probe = self.ctx.name(), count = proposals.len(), "Found proposals");
        Observation::from_raw_json(Value::Array(proposals))
    }
}
