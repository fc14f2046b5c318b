//! The run pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::Instrument;

use regsync_chain::{ChainProvider, GuardedChain};
use regsync_sink::NotificationSink;
use regsync_store::{BulkWriteSummary, RecordFilter, RecordStore, WriteOp};
use regsync_types::{RecordField, RecordId, RefDraw, UserRecord};

use crate::aggregate::{aggregate_balances, aggregate_stakes, total_population};
use crate::allocator::{AllocationPlan, RefAllocator, UniformDraw};
use crate::duplicates::DuplicateReport;
use crate::report::{ReportEmitter, SummaryReport};
use crate::resolver::NftResolver;
use crate::tracing_spans::{run_span, stage_span};
use crate::updater::plan_updates;
use crate::{ReconcileConfig, ReconcileError};

/// Drives one reconciliation run at a time against a store, a chain
/// provider, and a notification sink.
pub struct Reconciler {
    config: ReconcileConfig,
    store: Arc<dyn RecordStore>,
    chain: Arc<GuardedChain>,
    emitter: ReportEmitter,
    draw: Mutex<Box<dyn RefDraw>>,
}

impl Reconciler {
    pub fn new(
        config: ReconcileConfig,
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn ChainProvider>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let chain = GuardedChain::new(provider, config.retry_policy(), config.max_concurrent);
        let emitter = ReportEmitter::new(config.report_dir.clone(), sink);
        Self {
            config,
            store,
            chain: Arc::new(chain),
            emitter,
            draw: Mutex::new(Box::new(UniformDraw::from_entropy())),
        }
    }

    /// Replace the reference number draw source.
    pub fn with_draw(mut self, draw: Box<dyn RefDraw>) -> Self {
        self.draw = Mutex::new(draw);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run the full pipeline once.
    ///
    /// Store failures abort the run with [`ReconcileError::StoreUnavailable`].
    /// Per-record chain failures are logged and counted in the report.
    pub async fn run_reconciliation(&self) -> Result<SummaryReport, ReconcileError> {
        self.run().instrument(run_span(self.config.dry_run)).await
    }

    async fn run(&self) -> Result<SummaryReport, ReconcileError> {
        let started = Instant::now();
        let dry_run = self.config.dry_run;
        let mut report = SummaryReport {
            dry_run,
            ..Default::default()
        };

        if !dry_run {
            report.backup = Some(self.store.snapshot_collection().await.map_err(fatal)?);
        }

        let mut records = self
            .store
            .find_all(RecordFilter::All, &RecordField::ALL)
            .await
            .map_err(fatal)?;
        report.records_loaded = records.len();
        tracing::info!(records = records.len(), "records loaded");

        let allocation = stage_span("allocate").in_scope(|| self.allocate(&records));
        report.refs_generated = allocation.assigned.len() as u64;
        report.wasted_draws = allocation.wasted;
        let ops = allocation.ops();
        report.writes.merge(self.apply(&mut records, ops).await?);

        let resolver = NftResolver::new(
            self.chain.clone(),
            self.config.nft_type.clone(),
            self.config.page_limit,
        );
        let plan = plan_updates(&records, &resolver)
            .instrument(stage_span("update"))
            .await;
        report.updates = plan.tally;
        report.writes.merge(self.apply(&mut records, plan.ops).await?);

        if !dry_run {
            records = self
                .store
                .find_all(RecordFilter::All, &RecordField::ALL)
                .await
                .map_err(fatal)?;
        }

        report.duplicates = DuplicateReport::scan(&records);
        if !report.duplicates.is_clean() {
            tracing::warn!(
                wallets = report.duplicates.wallet_addresses.len(),
                telegram_ids = report.duplicates.telegram_ids.len(),
                ref_numbers = report.duplicates.ref_numbers.len(),
                "duplicate identities found"
            );
        }

        report.balances = aggregate_balances(&records, &self.chain, self.config.balance_divisor)
            .instrument(stage_span("aggregate"))
            .await;
        report.stakes = aggregate_stakes(&records);
        report.population = total_population(&records);
        report.queries = self.chain.stats();
        report.duration = started.elapsed();

        self.emitter
            .emit(&report)
            .instrument(stage_span("report"))
            .await?;

        tracing::info!(
            refs = report.refs_generated,
            wallet_updates = report.updates.wallet_updates,
            nft_updates = report.updates.nft_updates,
            deleted = report.updates.deleted,
            lookup_failures = report.updates.lookup_failures,
            "reconciliation finished"
        );
        Ok(report)
    }

    fn allocate(&self, records: &[UserRecord]) -> AllocationPlan {
        let mut draw = self.draw.lock().unwrap_or_else(PoisonError::into_inner);
        let used = records.iter().filter_map(|r| r.ref_number);
        let mut allocator = RefAllocator::new(used, self.config.ref_bounds(), draw.as_mut());
        allocator.allocate_missing(records)
    }

    /// Write `ops` in chunks, one store round-trip each, and mirror them on
    /// the in-memory records. Dry runs only do the latter.
    async fn apply(
        &self,
        records: &mut Vec<UserRecord>,
        ops: Vec<WriteOp>,
    ) -> Result<BulkWriteSummary, ReconcileError> {
        let mut summary = BulkWriteSummary::default();
        if ops.is_empty() {
            return Ok(summary);
        }

        apply_in_memory(records, &ops);
        if self.config.dry_run {
            tracing::info!(ops = ops.len(), "dry run, skipping writes");
            return Ok(summary);
        }

        for chunk in ops.chunks(self.config.bulk_write_chunk.max(1)) {
            let written = self.store.bulk_write(chunk.to_vec()).await.map_err(fatal)?;
            summary.merge(written);
        }
        Ok(summary)
    }
}

/// Mirror `ops` on the loaded records with store semantics: an update
/// matches the first record with its id, a delete removes every one.
fn apply_in_memory(records: &mut Vec<UserRecord>, ops: &[WriteOp]) {
    let mut index: HashMap<RecordId, usize> = HashMap::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate() {
        index.entry(record.id.clone()).or_insert(pos);
    }

    let mut deleted: HashSet<&RecordId> = HashSet::new();
    for op in ops {
        match op {
            WriteOp::Update { id, set } => {
                if deleted.contains(id) {
                    continue;
                }
                if let Some(&pos) = index.get(id) {
                    set.apply(&mut records[pos]);
                }
            }
            WriteOp::Delete { id } => {
                deleted.insert(id);
            }
        }
    }

    if !deleted.is_empty() {
        records.retain(|r| !deleted.contains(&r.id));
    }
}

fn fatal(e: regsync_store::StoreError) -> ReconcileError {
    tracing::error!(error = %e, "store failure, aborting run");
    ReconcileError::StoreUnavailable(e)
}
