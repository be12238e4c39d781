//! Probe contract and the context shared by concrete probes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::EndpointSelector;
use crate::utils::url::join_endpoint;
use crate::{Error, Result};

/// A unit that polls one upstream source for actionable state.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable name, used in cycle summaries.
    fn name(&self) -> &str;

    /// Human-readable description sent along with alerts.
    fn memo(&self) -> &str;

    /// Poll once.
    ///
    /// Returns [`Error::NoObservation`] when the response holds nothing to
    /// report; any other error is a transport or decode failure.
    async fn exec(&self) -> Result<Observation>;
}

/// Result of one successful probe execution.
#[derive(Clone, PartialEq, Eq)]
pub struct Observation {
    /// Serialized observation, delivered verbatim to notifiers.
    pub payload: Vec<u8>,
    /// SHA-256 of `payload`; the dedup key.
    pub id: [u8; 32],
}

impl Observation {
    pub fn from_payload(payload: Vec<u8>) -> Self {
        let id = Sha256::digest(&payload).into();
        Self { payload, id }
    }

    /// Serialize `value` as JSON and derive the identity from those bytes.
    ///
    /// Callers must hand over values whose serialization is deterministic.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::from_payload(serde_json::to_vec(value)?))
    }

    /// Identity of an upstream JSON document, independent of its key order.
    pub fn from_raw_json(value: Value) -> Result<Self> {
        Self::from_json(&canonicalize(value))
    }

    /// Identity as lowercase hex.
    pub fn id_hex(&self) -> String {
        hex::encode(self.id)
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("id", &self.id_hex())
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// State shared by every concrete probe: identity, endpoint rotation and
/// HTTP client.
#[derive(Clone)]
pub struct ProbeContext {
    name: &'static str,
    memo: &'static str,
    selector: Arc<EndpointSelector>,
    client: Client,
}

impl ProbeContext {
    pub fn new(
        name: &'static str,
        memo: &'static str,
        selector: Arc<EndpointSelector>,
        client: Client,
    ) -> Self {
        Self {
            name,
            memo,
            selector,
            client,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn memo(&self) -> &'static str {
        self.memo
    }

    /// GET `path` from the next endpoint and decode the JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = join_endpoint(&self.selector.next(), path);
        debug!(probe = self.name, %url, "Polling upstream");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::monitor(format!("{} returned {}", url, status)));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::monitor(format!("failed to decode response from {}: {}", url, e)))
    }

    /// The "nothing to report" outcome for this probe.
    pub fn nothing_to_report(&self) -> Error {
        Error::no_observation(self.name)
    }
}

/// Rebuild every object with its keys in sorted order.
///
/// Needed when `serde_json` keeps insertion order (`preserve_order`).
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
