//! spike-alert Service

use std::sync::Arc;
use std::time::Duration;

use spike_alert::api;
use spike_alert::application::DetectorScheduler;
use spike_alert::domain::{AlertRecordRepository, SampleSource};
use spike_alert::infrastructure::persistence::{
    InMemoryAlertStore, InMemorySampleSource, PostgresAlertRecordRepository, PostgresSampleSource,
    migrations,
};
use spike_alert::wiring::build_handler;
use tellspike_adapter_postgres::MigrationRunner;
use tellspike_bootstrap::ServiceContext;
use tellspike_errors::AppError;
use tellspike_ports::NotificationSink;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tellspike_bootstrap::run("config", |ctx: ServiceContext| async move {
        info!("Initializing spike-alert service...");
        let config = ctx.infra.config().clone();

        let (repo, source): (Arc<dyn AlertRecordRepository>, Arc<dyn SampleSource>) =
            match ctx.infra.postgres_pool() {
                Some(pool) => {
                    if config.database.as_ref().is_some_and(|db| db.run_migrations) {
                        let report = MigrationRunner::new(pool.clone()).run(&migrations()).await?;
                        info!(
                            applied = ?report.applied,
                            skipped = report.skipped.len(),
                            "Migrations complete"
                        );
                    }
                    (
                        Arc::new(PostgresAlertRecordRepository::new(pool.clone())),
                        Arc::new(PostgresSampleSource::new(pool.clone())),
                    )
                }
                None => {
                    warn!("Using in-memory alert store and sample source");
                    (
                        Arc::new(InMemoryAlertStore::new()),
                        Arc::new(InMemorySampleSource::new()),
                    )
                }
            };
        info!("Repositories initialized");

        let sink: Arc<dyn NotificationSink> = ctx.infra.telegram();
        let handler = Arc::new(build_handler(
            &config,
            repo,
            source,
            sink,
            ctx.shutdown.child_token(),
        )?);

        DetectorScheduler::new(
            handler.clone(),
            Duration::from_secs(config.detector.interval_secs),
        )
        .start(ctx.shutdown.tracker());

        Ok::<_, AppError>(api::router(handler))
    })
    .await
}
