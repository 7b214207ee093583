use crate::{
    error::SyncError,
    report::{RunSummary, TableOutcome},
    sync::table::TableSyncer,
};
use connectors::sql::{
    base::adapter::{DestinationAdapter, SourceAdapter},
    postgres::{destination::PgDestination, source::PgSource},
};
use engine_config::settings::sync::SyncSettings;
use engine_core::{
    context::DatabaseContext,
    ledger::{SyncLedger, postgres::PgSyncLedger},
};
use futures::{StreamExt, stream};
use model::sync::{catalog::Catalog, table::TableSpec};
use std::time::Instant;
use tracing::{error, info, warn};

/// Connects both databases through `ctx` and syncs every catalog table.
///
/// Connection failures abort before any table runs. Table failures do not:
/// they end up in the returned summary.
pub async fn run(
    ctx: &DatabaseContext,
    catalog: &Catalog,
    settings: &SyncSettings,
) -> Result<RunSummary, SyncError> {
    info!("Connecting to databases...");
    let source = PgSource::new(ctx.source_pool().await?.clone());
    let destination_pool = ctx.destination_pool().await?;
    let destination = PgDestination::new(destination_pool.clone());
    let ledger = PgSyncLedger::new(destination_pool.clone());

    Ok(SyncRunner::new(&source, &destination, &ledger, catalog)
        .with_settings(settings)
        .run()
        .await)
}

/// Drives the table syncer over the catalog, strictly in order.
pub struct SyncRunner<'a> {
    source: &'a dyn SourceAdapter,
    destination: &'a dyn DestinationAdapter,
    ledger: &'a dyn SyncLedger,
    catalog: &'a Catalog,
    batch_size: usize,
}

impl<'a> SyncRunner<'a> {
    pub fn new(
        source: &'a dyn SourceAdapter,
        destination: &'a dyn DestinationAdapter,
        ledger: &'a dyn SyncLedger,
        catalog: &'a Catalog,
    ) -> Self {
        Self {
            source,
            destination,
            ledger,
            catalog,
            batch_size: SyncSettings::default().batch_size,
        }
    }

    pub fn with_settings(mut self, settings: &SyncSettings) -> Self {
        self.batch_size = settings.batch_size;
        self
    }

    /// Attempts every table, even after failures.
    pub async fn run(&self) -> RunSummary {
        let started = Instant::now();
        let total = self.catalog.tables().len();
        info!("Sync starting: {total} tables");

        let syncer = TableSyncer::new(self.source, self.destination, self.ledger, self.catalog)
            .with_batch_size(self.batch_size);

        let syncer = &syncer;

        let outcomes: Vec<TableOutcome> = stream::iter(self.catalog.tables().iter().enumerate())
            .then(move |(idx, spec)| async move {
                info!("Processing table {}/{}: {}", idx + 1, total, spec.name);
                sync_one(syncer, spec).await
            })
            .collect()
            .await;

        let summary = RunSummary::new(outcomes, started.elapsed());
        log_summary(&summary);
        summary
    }
}

async fn sync_one(syncer: &TableSyncer<'_>, spec: &TableSpec) -> TableOutcome {
    let started = Instant::now();
    match syncer.sync(spec).await {
        Ok(report) => TableOutcome::succeeded(report, started.elapsed()),
        Err(err) => {
            warn!("Continuing after error in {}", spec.name);
            TableOutcome::failed(&spec.name, err.to_string(), started.elapsed())
        }
    }
}

fn log_summary(summary: &RunSummary) {
    info!("=== Sync Summary ===");
    for outcome in &summary.tables {
        if outcome.success {
            info!("  {}: {}", outcome.table, outcome.summary_line());
        } else {
            error!("  {}: {}", outcome.table, outcome.summary_line());
        }
    }
    info!("Total time: {:.2}s", summary.elapsed_secs);

    match summary.failure_count() {
        0 => info!("All tables synced successfully"),
        failed => warn!("{failed} table(s) failed to sync"),
    }
}
