//! End-to-end tests for valmon.
//!
//! A mock REST endpoint stands in for the chain and a local receiver
//! collects webhook deliveries.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use valmon::api::{ApiServer, ApiServerConfig, AppState};
use valmon::config::AppConfig;
use valmon::database::{self, KvStore, SqlxKvStore};
use valmon::monitor::create_probes;
use valmon::notification::create_notifiers;
use valmon::scheduler::{CycleSummary, Scheduler, SchedulerConfig};
use valmon::utils::http_client::build_client;

const OPERATOR: &str = "cosmosvaloper1aaa";
const ADDRESS: &str = "AAAA000000000000000000000000000000000001";
const OTHER: &str = "BBBB000000000000000000000000000000000002";

type Deliveries = Arc<Mutex<Vec<Value>>>;

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A chain where the watched validator is jailed, double signed and missed
/// the last commit, with one proposal in each governance period.
async fn spawn_chain() -> String {
    let router = Router::new()
        .route(
            "/gov/proposals",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                match params.get("status").map(String::as_str) {
                    Some("DepositPeriod") => Json(json!([
                        { "proposal_id": "7", "title": "Community pool spend" }
                    ])),
                    Some("VotingPeriod") => Json(json!({
                        "result": [{ "proposal_id": "6", "title": "Parameter change" }]
                    })),
                    _ => Json(Value::Null),
                }
            }),
        )
        .route(
            "/stake/validators",
            get(|| async {
                Json(json!([
                    { "operator_address": OPERATOR, "jailed": true },
                    { "operator_address": "cosmosvaloper1bbb", "jailed": true }
                ]))
            }),
        )
        .route(
            "/blocks/latest",
            get(|| async {
                Json(json!({
                    "block": {
                        "header": { "height": "1000" },
                        "evidence": { "evidence": [{
                            "type": "tendermint/DuplicateVoteEvidence",
                            "value": {
                                "VoteA": { "validator_address": ADDRESS },
                                "VoteB": { "validator_address": ADDRESS }
                            }
                        }] },
                        "last_commit": { "precommits": [
                            { "validator_address": OTHER, "height": "999" },
                            null
                        ] }
                    }
                }))
            }),
        );
    spawn(router).await
}

async fn spawn_receiver(deliveries: Deliveries) -> String {
    let router = Router::new()
        .route(
            "/hook",
            post(
                |State(deliveries): State<Deliveries>, Json(body): Json<Value>| async move {
                    deliveries.lock().push(body);
                    axum::http::StatusCode::OK
                },
            ),
        )
        .with_state(deliveries);
    spawn(router).await
}

fn config(chain: &str, hook: &str, data_dir: &std::path::Path) -> AppConfig {
    let raw = format!(
        r#"
poll_interval = 11
monitors = ["*"]

[database]
data_dir = "{data_dir}"

[network]
listen_addr = "127.0.0.1:0"
clients = ["{chain}"]
request_timeout_secs = 5

[targets]
webhooks = ["{hook}/hook"]

[[filters.validator]]
operator = "{OPERATOR}"
address = "{ADDRESS}"
"#,
        data_dir = data_dir.display(),
    );
    let config = AppConfig::from_toml(&raw).expect("config should parse");
    config.validate().expect("config should be valid");
    config
}

#[tokio::test]
async fn test_poll_cycle_alerts_once_and_reports_status() {
    let deliveries: Deliveries = Arc::default();
    let chain = spawn_chain().await;
    let hook = spawn_receiver(deliveries.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(&chain, &hook, dir.path());

    let client = build_client(config.request_timeout()).unwrap();
    let pool = database::open(&config.database.data_dir).await.unwrap();
    let store: Arc<dyn KvStore> = Arc::new(SqlxKvStore::new(pool.clone()));

    let scheduler = Scheduler::new(
        create_probes(&config, &client).unwrap(),
        create_notifiers(&config, &client),
        store.clone(),
        SchedulerConfig {
            poll_interval: config.poll_interval(),
            alert_ttl: config.alert_ttl(),
        },
    );

    let first = scheduler.poll_once().await;
    assert_eq!(first.successful_monitors.len(), 5);
    assert!(first.failed_monitors.is_empty());
    assert_eq!(first.successful_alerts, vec!["Webhook".to_string()]);
    assert!(first.failed_alerts.is_empty());

    {
        let received = deliveries.lock();
        assert_eq!(received.len(), 5);
        let memos: Vec<&str> = received.iter().filter_map(|d| d["memo"].as_str()).collect();
        assert!(memos.contains(&"New Governance Proposals"));
        assert!(memos.contains(&"New Active Governance Proposals"));
        assert!(memos.contains(&"New Jailed Validators"));
        assert!(memos.contains(&"Discovered Double Signing Validators"));
        assert!(memos.contains(&"Missing Signatures From Validators"));

        let missing = received
            .iter()
            .find(|d| d["memo"] == "Missing Signatures From Validators")
            .unwrap();
        assert_eq!(missing["payload"]["height"], json!(999));
        assert_eq!(missing["payload"]["missing_signers"], json!([ADDRESS]));
    }

    // Same chain state: everything was already alerted.
    let second = scheduler.poll_once().await;
    assert_eq!(second.successful_monitors.len(), 5);
    assert!(second.successful_alerts.is_empty());
    assert!(second.failed_alerts.is_empty());
    assert_eq!(deliveries.lock().len(), 5);

    let cancel = CancellationToken::new();
    let server = ApiServer::new(
        ApiServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
        },
        AppState::new(store),
        cancel.clone(),
    );
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = tokio::spawn(async move { server.serve(listener).await });

    let latest: Value = client
        .get(format!("http://{}/executions/latest", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest["successful_monitors"].as_array().unwrap().len(), 5);
    assert_eq!(latest["successful_alerts"], json!([]));

    cancel.cancel();
    serving.await.unwrap().unwrap();
    pool.close().await;
}

#[tokio::test]
async fn test_app_runs_until_cancelled() {
    let deliveries: Deliveries = Arc::default();
    let chain = spawn_chain().await;
    let hook = spawn_receiver(deliveries.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(&chain, &hook, &dir.path().join("data"));
    let data_dir = config.database.data_dir.clone();

    let cancel = CancellationToken::new();
    let app = tokio::spawn(valmon::app::run(config, cancel.clone()));

    // The first cycle starts immediately; wait for its deliveries.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while deliveries.lock().len() < 5 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "no alerts delivered in time"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // An in-flight cycle is completed before shutdown.
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(10), app)
        .await
        .expect("app did not stop")
        .unwrap()
        .unwrap();

    let pool = database::open(&data_dir).await.unwrap();
    let store = SqlxKvStore::new(pool.clone());
    let summary = CycleSummary::load_latest(&store).await.unwrap().unwrap();
    assert_eq!(summary.successful_alerts, vec!["Webhook".to_string()]);
    assert_eq!(summary.successful_monitors.len(), 5);
    pool.close().await;
}
