//! Slashing probes over the latest block.
//!
//! Both probes read `/blocks/latest`. The commit embedded in block `N`
//! carries the signatures for block `N - 1`, so reports use that height.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::types::BlockResponse;
use super::{Observation, Probe, ProbeContext};
use crate::{Error, Result};

pub const MISSING_SIGNATURES_NAME: &str = "slashing/missingSig";
pub const MISSING_SIGNATURES_MEMO: &str = "Missing Signatures From Validators";
pub const DOUBLE_SIGN_NAME: &str = "slashing/doubleSign";
pub const DOUBLE_SIGN_MEMO: &str = "Discovered Double Signing Validators";

const LATEST_BLOCK_PATH: &str = "/blocks/latest";

/// Watched validators that did not sign a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingSigners {
    pub height: i64,
    pub missing_signers: Vec<String>,
}

/// Watched validators evidenced as double signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoubleSigners {
    pub height: i64,
    pub double_signers: Vec<String>,
}

/// Normalize consensus addresses for comparison.
pub(crate) fn normalize_addresses<I, S>(addresses: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    addresses
        .into_iter()
        .map(|a| a.as_ref().trim().to_ascii_uppercase())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Height of the block the latest block's commit and evidence refer to.
fn committed_height(latest: i64) -> Result<i64> {
    match latest.checked_sub(1) {
        Some(height) if height >= 1 => Ok(height),
        _ => Err(Error::monitor(format!(
            "latest block height {} has no committed predecessor",
            latest
        ))),
    }
}

/// Reports watched validators missing from the latest commit.
pub struct MissingSignaturesProbe {
    ctx: ProbeContext,
    watched: BTreeSet<String>,
}

impl MissingSignaturesProbe {
    pub fn new(ctx: ProbeContext, watched: BTreeSet<String>) -> Self {
        Self { ctx, watched }
    }
}

#[async_trait]
impl Probe for MissingSignaturesProbe {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn memo(&self) -> &str {
        self.ctx.memo()
    }

    async fn exec(&self) -> Result<Observation> {
        let response: BlockResponse = self.ctx.fetch_json(LATEST_BLOCK_PATH).await?;
        let block = response.block;
        let height = committed_height(block.header.height)?;

        let signers: BTreeSet<String> = block.last_commit.signers().collect();
        let missing: Vec<String> = self.watched.difference(&signers).cloned().collect();

        if missing.is_empty() {
            return Err(self.ctx.nothing_to_report());
        }

        let report = MissingSigners {
            height,
            missing_signers: missing,
        };
        debug!(
            probe = self.ctx.name(),
            height = report.height,
            missing = report.missing_signers.len(),
            "Watched validators missed a signature"
        );
        Observation::from_json(&report)
    }
}

/// Reports watched validators named by duplicate-vote evidence.
pub struct DoubleSignProbe {
    ctx: ProbeContext,
    watched: BTreeSet<String>,
}

impl DoubleSignProbe {
    pub fn new(ctx: ProbeContext, watched: BTreeSet<String>) -> Self {
        Self { ctx, watched }
    }
}

#[async_trait]
impl Probe for DoubleSignProbe {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn memo(&self) -> &str {
        self.ctx.memo()
    }

    async fn exec(&self) -> Result<Observation> {
        let response: BlockResponse = self.ctx.fetch_json(LATEST_BLOCK_PATH).await?;
        let block = response.block;
        let height = committed_height(block.header.height)?;

        let byzantine: BTreeSet<String> = block
            .evidence
            .evidence
            .iter()
            .filter_map(|e| e.as_duplicate_vote())
            .filter_map(|dve| dve.signer_address())
            .collect();
        let offenders: Vec<String> = self.watched.intersection(&byzantine).cloned().collect();

        if offenders.is_empty() {
            return Err(self.ctx.nothing_to_report());
        }

        let report = DoubleSigners {
            height,
            double_signers: offenders,
        };
        debug!(
            probe = self.ctx.name(),
            height = report.height,
            offenders = report.double_signers.len(),
            "Watched validators double signed"
        );
        Observation::from_json(&report)
    }
}
