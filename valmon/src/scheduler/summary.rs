//! Poll cycle summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::database::{KvStore, Namespace};

/// Key of the latest summary in the `monitors` namespace.
pub const MONITOR_EXEC_KEY: &str = "latestMonitorExec";

/// Outcome of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub timestamp: DateTime<Utc>,
    pub failed_monitors: Vec<String>,
    pub successful_monitors: Vec<String>,
    pub failed_alerts: Vec<String>,
    pub successful_alerts: Vec<String>,
}

impl CycleSummary {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            failed_monitors: Vec::new(),
            successful_monitors: Vec::new(),
            failed_alerts: Vec::new(),
            successful_alerts: Vec::new(),
        }
    }

    pub fn record_monitor(&mut self, name: &str, succeeded: bool) {
        let list = if succeeded {
            &mut self.successful_monitors
        } else {
            &mut self.failed_monitors
        };
        push_unique(list, name);
    }

    /// Record a notifier outcome. Each name appears at most once per list.
    pub fn record_alert(&mut self, name: &str, succeeded: bool) {
        let list = if succeeded {
            &mut self.successful_alerts
        } else {
            &mut self.failed_alerts
        };
        push_unique(list, name);
    }

    /// Overwrite the stored latest summary.
    pub async fn save(&self, store: &dyn KvStore) -> Result<()> {
        let raw = serde_json::to_vec(self)?;
        store
            .set(Namespace::Monitors, MONITOR_EXEC_KEY.as_bytes(), &raw)
            .await
    }

    /// Load the latest stored summary, if a cycle ever completed.
    pub async fn load_latest(store: &dyn KvStore) -> Result<Option<Self>> {
        match store
            .get(Namespace::Monitors, MONITOR_EXEC_KEY.as_bytes())
            .await?
        {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::tests::setup_store;

    #[test]
    fn test_record_alert_deduplicates() {
        let mut summary = CycleSummary::new(Utc::now());
        summary.record_alert("SendGrid", true);
        summary.record_alert("SendGrid", true);
        summary.record_alert("SendGrid", false);

        assert_eq!(summary.successful_alerts, vec!["SendGrid"]);
        assert_eq!(summary.failed_alerts, vec!["SendGrid"]);
    }

    #[test]
    fn test_json_field_names() {
        let mut summary = CycleSummary::new(Utc::now());
        summary.record_monitor("staking/jailed", false);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["failed_monitors"][0], "staking/jailed");
        assert!(value["successful_monitors"].as_array().unwrap().is_empty());
        assert!(value["timestamp"].is_string());
        assert!(value.get("failed_alerts").is_some());
        assert!(value.get("successful_alerts").is_some());
    }

    #[tokio::test]
    async fn test_save_overwrites_latest() {
        let store = setup_store().await;
        assert!(CycleSummary::load_latest(&store).await.unwrap().is_none());

        let mut first = CycleSummary::new(Utc::now());
        first.record_monitor("gov/newProposals", true);
        first.save(&store).await.unwrap();

        let mut second = CycleSummary::new(Utc::now());
        second.record_monitor("gov/newProposals", false);
        second.save(&store).await.unwrap();

        let loaded = CycleSummary::load_latest(&store).await.unwrap().unwrap();
        assert_eq!(loaded, second);
    }
}
