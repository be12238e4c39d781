//! Service wiring.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;
use crate::api::{ApiServer, ApiServerConfig, AppState};
use crate::config::AppConfig;
use crate::database::{self, KvStore, MaintenanceConfig, SqlxKvStore, StoreMaintenance};
use crate::monitor::create_probes;
use crate::notification::create_notifiers;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::utils::http_client::build_client;

/// Run every service until `cancel` fires.
///
/// Builds the store, probes, notifiers, scheduler and status server from a
/// validated `config`. On cancellation the in-flight poll cycle is allowed
/// to finish before this returns.
pub async fn run(config: AppConfig, cancel: CancellationToken) -> Result<()> {
    let client = build_client(config.request_timeout())?;

    let pool = database::open(&config.database.data_dir).await?;
    let store: Arc<dyn KvStore> = Arc::new(SqlxKvStore::new(pool.clone()));

    let probes = create_probes(&config, &client)?;
    let notifiers = create_notifiers(&config, &client);

    let server = ApiServer::new(
        ApiServerConfig {
            listen_addr: config.network.listen_addr.clone(),
        },
        AppState::new(store.clone()),
        cancel.clone(),
    );
    // Bind before spawning anything so an occupied port fails startup.
    let listener = server.bind().await?;

    let maintenance = StoreMaintenance::new(pool.clone(), store.clone(), MaintenanceConfig::default())
        .start(cancel.clone());
    let scheduler = Scheduler::new(
        probes,
        notifiers,
        store,
        SchedulerConfig {
            poll_interval: config.poll_interval(),
            alert_ttl: config.alert_ttl(),
        },
    )
    .start(cancel.clone());

    info!("valmon started");
    let served = server.serve(listener).await;
    if served.is_err() {
        // Without the status server nothing else should keep running.
        cancel.cancel();
    }

    join("scheduler", scheduler).await;
    join("store maintenance", maintenance).await;
    pool.close().await;

    info!("valmon stopped");
    served
}

async fn join(task: &str, handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        warn!(task, error = %e, "Task ended abnormally");
    }
}
