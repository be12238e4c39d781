//! Validator monitoring probes.
//!
//! A probe polls one upstream REST endpoint per execution and either returns
//! an [`Observation`] (a deterministic payload and its SHA-256 identity) or an
//! error. The scheduler decides what to do with it.
//!
//! - Governance: proposals in deposit or voting period
//! - Slashing: missing signatures and double signing by watched validators
//! - Staking: watched validators that got jailed

mod endpoint;
mod factory;
pub mod gov;
mod probe;
pub mod slashing;
pub mod staking;
pub mod types;

pub use endpoint::EndpointSelector;
pub use factory::create_probes;
pub use gov::ProposalProbe;
pub use probe::{Observation, Probe, ProbeContext};
pub use slashing::{DoubleSignProbe, DoubleSigners, MissingSignaturesProbe, MissingSigners};
pub use staking::JailedValidatorsProbe;
