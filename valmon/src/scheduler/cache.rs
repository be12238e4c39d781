//! Alert deduplication cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::Result;
use crate::database::{KvStore, Namespace};
use crate::monitor::Observation;

/// Remembers which observations were already alerted on.
///
/// Entries live in the `alerts` namespace keyed by observation identity and
/// expire after the retention window, after which the same observation may
/// alert again.
#[derive(Clone)]
pub struct AlertCache {
    store: Arc<dyn KvStore>,
    retention: Duration,
}

impl AlertCache {
    pub fn new(store: Arc<dyn KvStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Whether `observation` was alerted within the retention window.
    ///
    /// A store failure counts as "not alerted": a duplicate alert is
    /// preferred over a dropped one.
    pub async fn is_alerted(&self, observation: &Observation) -> bool {
        match self.store.has(Namespace::Alerts, &observation.id).await {
            Ok(seen) => seen,
            Err(e) => {
                warn!(
                    id = %observation.id_hex(),
                    error = %e,
                    "Alert cache lookup failed, treating observation as new"
                );
                false
            }
        }
    }

    /// Record `observation` as alerted for the retention window.
    pub async fn record(&self, observation: &Observation) -> Result<()> {
        self.store
            .set_with_ttl(
                Namespace::Alerts,
                &observation.id,
                &observation.payload,
                self.retention,
            )
            .await
    }
}
