//! Scheduler service implementation.
//!
//! One cycle runs every probe, alerts on observations the cache has not seen,
//! and stores a [`CycleSummary`]. Nothing that happens inside a cycle stops
//! the scheduler.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{AlertCache, CycleSummary};
use crate::database::KvStore;
use crate::monitor::{Observation, Probe};
use crate::notification::Notifier;

/// Default alert retention (30 days).
pub const DEFAULT_ALERT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between cycle starts.
    pub poll_interval: Duration,
    /// How long an alerted observation stays suppressed.
    pub alert_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            alert_ttl: DEFAULT_ALERT_TTL,
        }
    }
}

/// Drives poll cycles over a fixed set of probes and notifiers.
pub struct Scheduler {
    probes: Vec<Arc<dyn Probe>>,
    notifiers: Vec<Arc<dyn Notifier>>,
    store: Arc<dyn KvStore>,
    cache: AlertCache,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        probes: Vec<Arc<dyn Probe>>,
        notifiers: Vec<Arc<dyn Notifier>>,
        store: Arc<dyn KvStore>,
        config: SchedulerConfig,
    ) -> Self {
        let cache = AlertCache::new(store.clone(), config.alert_ttl);
        Self {
            probes,
            notifiers,
            store,
            cache,
            config,
        }
    }

    /// Spawn the polling loop. The first cycle starts immediately.
    ///
    /// Cancelling `cancel` prevents new cycles; a cycle already running is
    /// finished before the task exits.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            probes = self.probes.len(),
            notifiers = self.notifiers.len(),
            interval_secs = self.config.poll_interval.as_secs(),
            "Scheduler started"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.poll_once().await;
                }
            }
        }

        info!("Scheduler stopped");
    }

    /// Run a single poll cycle and persist its summary.
    pub async fn poll_once(&self) -> CycleSummary {
        debug!("Polling for new alerts");
        let mut summary = CycleSummary::new(Utc::now());

        // Probes fetch concurrently; outcomes are handled in configuration order.
        let results = join_all(self.probes.iter().map(|probe| probe.exec())).await;

        for (probe, result) in self.probes.iter().zip(results) {
            match result {
                Ok(observation) => {
                    summary.record_monitor(probe.name(), true);
                    self.dispatch(probe.as_ref(), &observation, &mut summary)
                        .await;
                }
                Err(e) if e.is_no_observation() => {
                    debug!(probe = probe.name(), "Nothing to report");
                    summary.record_monitor(probe.name(), false);
                }
                Err(e) => {
                    warn!(probe = probe.name(), error = %e, "Probe failed");
                    summary.record_monitor(probe.name(), false);
                }
            }
        }

        if let Err(e) = summary.save(self.store.as_ref()).await {
            error!(error = %e, "Failed to persist cycle summary");
        }

        info!(
            succeeded = summary.successful_monitors.len(),
            failed = summary.failed_monitors.len(),
            alerts_sent = summary.successful_alerts.len(),
            alerts_failed = summary.failed_alerts.len(),
            "Poll cycle finished"
        );
        summary
    }

    /// Alert on one observation unless it was already alerted.
    ///
    /// Every notifier is attempted; the cache entry is written once if at
    /// least one of them succeeded.
    async fn dispatch(&self, probe: &dyn Probe, observation: &Observation, summary: &mut CycleSummary) {
        if self.cache.is_alerted(observation).await {
            debug!(
                probe = probe.name(),
                id = %observation.id_hex(),
                "Observation already alerted"
            );
            return;
        }

        let mut delivered = false;
        for notifier in &self.notifiers {
            match notifier.alert(&observation.payload, probe.memo()).await {
                Ok(()) => {
                    info!(probe = probe.name(), notifier = notifier.name(), "Alert sent");
                    summary.record_alert(notifier.name(), true);
                    delivered = true;
                }
                Err(e) => {
                    warn!(
                        probe = probe.name(),
                        notifier = notifier.name(),
                        error = %e,
                        "Alert failed"
                    );
                    summary.record_alert(notifier.name(), false);
                }
            }
        }

        if !delivered {
            return;
        }

        if let Err(e) = self.cache.record(observation).await {
            error!(
                probe = probe.name(),
                id = %observation.id_hex(),
                error = %e,
                "Failed to record alert; it may be sent again"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::tests::setup_store;
    use crate::database::{Namespace, SqlxKvStore};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    enum Outcome {
        Report(&'static [u8]),
        SlowReport(Duration, &'static [u8]),
        Nothing,
        Fail,
    }

    struct TestProbe {
        name: &'static str,
        outcome: Outcome,
        calls: AtomicU32,
    }

    impl TestProbe {
        fn new(name: &'static str, outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Probe for TestProbe {
        fn name(&self) -> &str {
            self.name
        }

        fn memo(&self) -> &str {
            "test memo"
        }

        async fn exec(&self) -> Result<Observation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Report(payload) => Ok(Observation::from_payload(payload.to_vec())),
                Outcome::SlowReport(delay, payload) => {
                    tokio::time::sleep(delay).await;
                    Ok(Observation::from_payload(payload.to_vec()))
                }
                Outcome::Nothing => Err(Error::no_observation(self.name)),
                Outcome::Fail => Err(Error::monitor("connection refused")),
            }
        }
    }

    struct TestNotifier {
        name: &'static str,
        fail: bool,
        sent: Mutex<Vec<(Vec<u8>, String)>>,
    }

    impl TestNotifier {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }

        async fn attempts(&self) -> usize {
            self.sent.lock().await.len()
        }
    }

    #[async_trait]
    impl Notifier for TestNotifier {
        fn name(&self) -> &str {
            self.name
        }

        async fn alert(&self, payload: &[u8], memo: &str) -> Result<()> {
            self.sent.lock().await.push((payload.to_vec(), memo.to_string()));
            if self.fail {
                return Err(Error::Notification("delivery rejected".to_string()));
            }
            Ok(())
        }
    }

    fn scheduler(
        probes: Vec<Arc<dyn Probe>>,
        notifiers: Vec<Arc<dyn Notifier>>,
        store: SqlxKvStore,
        alert_ttl: Duration,
    ) -> Scheduler {
        Scheduler::new(
            probes,
            notifiers,
            Arc::new(store),
            SchedulerConfig {
                poll_interval: Duration::from_millis(20),
                alert_ttl,
            },
        )
    }

    async fn alert_count(store: &SqlxKvStore) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM kv_entries WHERE namespace = 'alerts'")
                .fetch_one(store.pool())
                .await
                .unwrap();
        count
    }

    #[tokio::test]
    async fn test_alert_sent_once_within_retention() {
        let store = setup_store().await;
        let notifier = TestNotifier::new("primary", false);
        let scheduler = scheduler(
            vec![TestProbe::new("gov/newProposals", Outcome::Report(b"proposal 1"))],
            vec![notifier.clone()],
            store.clone(),
            Duration::from_secs(3600),
        );

        let first = scheduler.poll_once().await;
        let second = scheduler.poll_once().await;

        assert_eq!(notifier.attempts().await, 1);
        assert_eq!(first.successful_alerts, vec!["primary"]);
        assert!(second.successful_alerts.is_empty());
        assert_eq!(second.successful_monitors, vec!["gov/newProposals"]);
        assert_eq!(notifier.sent.lock().await[0].1, "test memo");
    }

    #[tokio::test]
    async fn test_alert_repeats_after_retention() {
        let store = setup_store().await;
        let notifier = TestNotifier::new("primary", false);
        let scheduler = scheduler(
            vec![TestProbe::new("staking/jailed", Outcome::Report(b"still jailed"))],
            vec![notifier.clone()],
            store,
            Duration::from_millis(5),
        );

        scheduler.poll_once().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        scheduler.poll_once().await;

        assert_eq!(notifier.attempts().await, 2);
    }

    #[tokio::test]
    async fn test_nothing_to_report_is_not_notified_or_cached() {
        let store = setup_store().await;
        let notifier = TestNotifier::new("primary", false);
        let scheduler = scheduler(
            vec![TestProbe::new("slashing/missingSig", Outcome::Nothing)],
            vec![notifier.clone()],
            store.clone(),
            Duration::from_secs(3600),
        );

        let summary = scheduler.poll_once().await;

        assert_eq!(summary.failed_monitors, vec!["slashing/missingSig"]);
        assert_eq!(notifier.attempts().await, 0);
        assert_eq!(alert_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_isolated() {
        let store = setup_store().await;
        let notifier = TestNotifier::new("primary", false);
        let healthy = TestProbe::new("staking/jailed", Outcome::Report(b"jailed"));
        let scheduler = scheduler(
            vec![
                TestProbe::new("gov/newProposals", Outcome::Fail),
                healthy.clone(),
                TestProbe::new("slashing/doubleSign", Outcome::Nothing),
            ],
            vec![notifier.clone()],
            store.clone(),
            Duration::from_secs(3600),
        );

        let summary = scheduler.poll_once().await;

        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            summary.failed_monitors,
            vec!["gov/newProposals", "slashing/doubleSign"]
        );
        assert_eq!(summary.successful_monitors, vec!["staking/jailed"]);
        assert_eq!(notifier.attempts().await, 1);

        let stored = CycleSummary::load_latest(&store).await.unwrap().unwrap();
        assert_eq!(stored, summary);
    }

    #[tokio::test]
    async fn test_notifier_failure_is_isolated() {
        let store = setup_store().await;
        let failing = TestNotifier::new("broken", true);
        let working = TestNotifier::new("working", false);
        let scheduler = scheduler(
            vec![TestProbe::new("staking/jailed", Outcome::Report(b"jailed"))],
            vec![failing.clone(), working.clone()],
            store.clone(),
            Duration::from_secs(3600),
        );

        let summary = scheduler.poll_once().await;

        assert_eq!(failing.attempts().await, 1);
        assert_eq!(working.attempts().await, 1);
        assert_eq!(summary.failed_alerts, vec!["broken"]);
        assert_eq!(summary.successful_alerts, vec!["working"]);
        assert_eq!(alert_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_all_notifiers_failing_leaves_cache_empty() {
        let store = setup_store().await;
        let failing = TestNotifier::new("broken", true);
        let scheduler = scheduler(
            vec![TestProbe::new("staking/jailed", Outcome::Report(b"jailed"))],
            vec![failing.clone()],
            store.clone(),
            Duration::from_secs(3600),
        );

        scheduler.poll_once().await;
        scheduler.poll_once().await;

        assert_eq!(alert_count(&store).await, 0);
        assert_eq!(failing.attempts().await, 2);
    }

    #[tokio::test]
    async fn test_cached_entry_holds_payload() {
        let store = setup_store().await;
        let scheduler = scheduler(
            vec![TestProbe::new("staking/jailed", Outcome::Report(b"jailed"))],
            vec![TestNotifier::new("primary", false)],
            store.clone(),
            Duration::from_secs(3600),
        );

        scheduler.poll_once().await;

        let observation = Observation::from_payload(b"jailed".to_vec());
        let cached = store.get(Namespace::Alerts, &observation.id).await.unwrap();
        assert_eq!(cached.as_deref(), Some(&b"jailed"[..]));
    }

    #[tokio::test]
    async fn test_store_outage_still_alerts() {
        let store = setup_store().await;
        store.pool().close().await;
        let notifier = TestNotifier::new("primary", false);
        let scheduler = scheduler(
            vec![TestProbe::new("staking/jailed", Outcome::Report(b"jailed"))],
            vec![notifier.clone()],
            store,
            Duration::from_secs(3600),
        );

        let summary = scheduler.poll_once().await;

        assert_eq!(notifier.attempts().await, 1);
        assert_eq!(summary.successful_alerts, vec!["primary"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let store = setup_store().await;
        let probe = TestProbe::new("gov/newProposals", Outcome::Nothing);
        let cancel = CancellationToken::new();
        let handle = scheduler(
            vec![probe.clone()],
            Vec::new(),
            store.clone(),
            Duration::from_secs(3600),
        )
        .start(cancel.clone());

        tokio::time::sleep(Duration::from_millis(70)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        assert!(probe.calls.load(Ordering::SeqCst) >= 2);
        assert!(CycleSummary::load_latest(&store).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_lets_running_cycle_finish() {
        let store = setup_store().await;
        let probe = TestProbe::new(
            "slashing/doubleSign",
            Outcome::SlowReport(Duration::from_millis(300), b"double signed"),
        );
        let notifier = TestNotifier::new("primary", false);
        let cancel = CancellationToken::new();
        let handle = scheduler(
            vec![probe.clone()],
            vec![notifier.clone()],
            store.clone(),
            Duration::from_secs(3600),
        )
        .start(cancel.clone());

        // Cancel while the first cycle is still waiting on the probe.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert!(CycleSummary::load_latest(&store).await.unwrap().is_none());
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.attempts().await, 1);
        assert_eq!(alert_count(&store).await, 1);
        let summary = CycleSummary::load_latest(&store).await.unwrap().unwrap();
        assert_eq!(summary.successful_monitors, vec!["slashing/doubleSign"]);
        assert_eq!(summary.successful_alerts, vec!["primary"]);
    }
}
