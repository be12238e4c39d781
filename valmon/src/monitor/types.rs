//! Decoding types for upstream REST responses.
//!
//! Responses use amino JSON: 64-bit integers are strings, absent votes are
//! `null`, and interface values are `{"type": ..., "value": ...}` envelopes.
//! Only the fields the probes read are modelled.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Amino type tag of duplicate-vote evidence.
pub const DUPLICATE_VOTE_EVIDENCE: &str = "tendermint/DuplicateVoteEvidence";

/// Amino type tag of an ed25519 public key.
pub const PUB_KEY_ED25519: &str = "tendermint/PubKeyEd25519";

/// List endpoints answer either with a bare array or wrapped in `result`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(deserialize_with = "null_as_default")]
        result: Vec<T>,
    },
    Null(()),
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Wrapped { result } => result,
            Listing::Null(()) => Vec::new(),
        }
    }
}

/// `GET /blocks/latest`.
#[derive(Debug, Deserialize)]
pub struct BlockResponse {
    pub block: Block,
}

#[derive(Debug, Deserialize)]
pub struct Block {
    pub header: Header,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence: EvidenceData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_commit: Commit,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    #[serde(deserialize_with = "string_or_number")]
    pub height: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct EvidenceData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence: Vec<Evidence>,
}

/// Amino interface envelope around one piece of evidence.
#[derive(Debug, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

impl Evidence {
    /// Decode as duplicate-vote evidence; `None` for any other evidence type.
    pub fn as_duplicate_vote(&self) -> Option<DuplicateVoteEvidence> {
        if self.kind != DUPLICATE_VOTE_EVIDENCE {
            return None;
        }
        serde_json::from_value(self.value.clone()).ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct DuplicateVoteEvidence {
    #[serde(rename = "PubKey", alias = "pub_key", default)]
    pub pub_key: Option<AminoPubKey>,
    #[serde(rename = "VoteA", alias = "vote_a", default)]
    pub vote_a: Option<Vote>,
}

impl DuplicateVoteEvidence {
    /// Upper-case hex address of the offending validator.
    ///
    /// Taken from the vote when present, otherwise derived from the public key.
    pub fn signer_address(&self) -> Option<String> {
        self.vote_a
            .as_ref()
            .filter(|vote| !vote.validator_address.is_empty())
            .map(|vote| vote.validator_address.to_ascii_uppercase())
            .or_else(|| self.pub_key.as_ref().and_then(AminoPubKey::address))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AminoPubKey {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl AminoPubKey {
    /// Consensus address: first 20 bytes of SHA-256 over the raw ed25519 key.
    pub fn address(&self) -> Option<String> {
        if self.kind != PUB_KEY_ED25519 {
            return None;
        }
        let raw = STANDARD.decode(&self.value).ok()?;
        let digest = Sha256::digest(&raw);
        Some(hex::encode_upper(&digest[..20]))
    }
}

/// Commit of the previous block. Newer nodes call the list `signatures`.
#[derive(Debug, Default, Deserialize)]
pub struct Commit {
    #[serde(default, alias = "signatures", deserialize_with = "null_as_default")]
    pub precommits: Vec<Option<Vote>>,
}

impl Commit {
    /// Upper-case hex addresses of validators that signed.
    pub fn signers(&self) -> impl Iterator<Item = String> + '_ {
        self.precommits
            .iter()
            .flatten()
            .filter(|vote| !vote.validator_address.is_empty())
            .map(|vote| vote.validator_address.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vote {
    #[serde(default)]
    pub validator_address: String,
}

/// One entry of `GET /stake/validators`, kept as the raw JSON object so it
/// can be forwarded to notifiers in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Validator(pub Value);

impl Validator {
    /// Operator address, whichever field name the node uses for it.
    pub fn operator(&self) -> Option<&str> {
        ["operator_address", "operator", "owner"]
            .iter()
            .find_map(|field| self.0.get(*field).and_then(Value::as_str))
    }

    /// Whether the validator is jailed (`revoked` on older nodes).
    pub fn is_jailed(&self) -> bool {
        ["jailed", "revoked"]
            .iter()
            .any(|field| self.0.get(*field).and_then(Value::as_bool).unwrap_or(false))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Height {
        Number(i64),
        Text(String),
    }

    match Height::deserialize(deserializer)? {
        Height::Number(n) => Ok(n),
        Height::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
