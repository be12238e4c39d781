//! Staking probes.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::types::{Listing, Validator};
use super::{Observation, Probe, ProbeContext};
use crate::Result;

pub const JAILED_VALIDATORS_NAME: &str = "staking/jailed";
pub const JAILED_VALIDATORS_MEMO: &str = "New Jailed Validators";

const VALIDATORS_PATH: &str = "/stake/validators";

/// Reports watched validators that are currently jailed.
pub struct JailedValidatorsProbe {
    ctx: ProbeContext,
    operators: BTreeSet<String>,
}

impl JailedValidatorsProbe {
    pub fn new(ctx: ProbeContext, operators: BTreeSet<String>) -> Self {
        Self { ctx, operators }
    }
}

#[async_trait]
impl Probe for JailedValidatorsProbe {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn memo(&self) -> &str {
        self.ctx.memo()
    }

    async fn exec(&self) -> Result<Observation> {
        let validators = self
            .ctx
            .fetch_json::<Listing<Validator>>(VALIDATORS_PATH)
            .await?
            .into_vec();

        let mut jailed: Vec<(String, Validator)> = validators
            .into_iter()
            .filter(|v| v.is_jailed())
            .filter_map(|v| {
                let operator = v.operator()?.to_string();
                self.operators.contains(&operator).then_some((operator, v))
            })
            .collect();

        if jailed.is_empty() {
            return Err(self.ctx.nothing_to_report());
        }

        // Upstream ordering is not guaranteed.
        jailed.sort_by(|a, b| a.0.cmp(&b.0));
        jailed.dedup_by(|a, b| a.0 == b.0);

        debug!(probe = self.ctx.name(), count = jailed.len(), "Watched validators jailed");
        let report: Vec<Value> = jailed.into_iter().map(|(_, v)| v.0).collect();
        Observation::from_raw_json(Value::Array(report))
    }
}
