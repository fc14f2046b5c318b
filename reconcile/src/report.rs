//! The run summary, its file artifacts, and delivery to the sink.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regsync_chain::QueryStats;
use regsync_sink::{Attachment, NotificationSink};
use regsync_store::{BackupId, BulkWriteSummary};
use regsync_utils::{format_duration, format_magnitude};

use crate::aggregate::{BalanceReport, StakeTotals};
use crate::duplicates::DuplicateReport;
use crate::updater::UpdateTally;
use crate::ReconcileError;

pub const BALANCES_FILE: &str = "balances.json";
pub const BALANCES_SORTED_FILE: &str = "balances_sorted.json";
pub const NON_QUALIFYING_FILE: &str = "non_qualifying_stakers.json";
pub const SUMMARY_FILE: &str = "summary.txt";

/// Everything one run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryReport {
    /// `None` for a dry run.
    pub backup: Option<BackupId>,
    pub dry_run: bool,
    pub records_loaded: usize,
    pub refs_generated: u64,
    pub wasted_draws: u64,
    pub updates: UpdateTally,
    pub writes: BulkWriteSummary,
    pub duplicates: DuplicateReport,
    pub population: u64,
    pub balances: BalanceReport,
    pub stakes: StakeTotals,
    pub queries: QueryStats,
    pub duration: Duration,
}

fn list_or_none<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl SummaryReport {
    /// Plain-text summary for humans.
    pub fn render(&self) -> String {
        let u = &self.updates;
        let mut lines = vec!["Registry reconciliation summary".to_string()];
        if self.dry_run {
            lines.push("Mode: dry run (no backup, no writes)".to_string());
        } else if let Some(backup) = &self.backup {
            lines.push(format!("Backup: {backup}"));
        }
        lines.push(format!(
            "Records: {} loaded, {} removed, {} unchanged, {} without wallet",
            self.records_loaded, u.deleted, u.unchanged, u.without_wallet
        ));
        lines.push(format!(
            "Reference numbers generated: {} ({} wasted draws)",
            self.refs_generated, self.wasted_draws
        ));
        lines.push(format!("Wallet id updates: {}", u.wallet_updates));
        lines.push(format!("NFT field updates: {}", u.nft_updates));
        lines.push(format!("Lookup failures: {}", u.lookup_failures));
        lines.push(format!(
            "Duplicate wallet addresses: {}",
            list_or_none(&self.duplicates.wallet_addresses)
        ));
        lines.push(format!(
            "Duplicate telegram ids: {}",
            list_or_none(&self.duplicates.telegram_ids)
        ));
        lines.push(format!(
            "Duplicate reference numbers: {}",
            list_or_none(&self.duplicates.ref_numbers)
        ));
        lines.push(format!(
            "Total population: {}",
            format_magnitude(self.population as f64)
        ));
        lines.push(format!(
            "Total balance: {} across {} wallets ({} fetch failures)",
            self.balances.total_formatted(),
            self.balances.entries.len(),
            self.balances.fetch_failures
        ));
        let categories = self
            .stakes
            .categories()
            .map(|(name, count)| format!("{name} {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "Staked assets: {categories} (total {}, {} stakers, {} malformed)",
            self.stakes.total, self.stakes.stakers, self.stakes.malformed
        ));
        lines.push(format!(
            "Non-qualifying stakers: {}",
            self.stakes.non_qualifying.len()
        ));
        lines.push(format!(
            "Writes: {} modified, {} deleted, {} unmatched",
            self.writes.modified, self.writes.deleted, self.writes.unmatched
        ));
        lines.push(format!(
            "Remote queries: {} ({} rate limited)",
            self.queries.attempts, self.queries.rate_limited
        ));
        lines.push(format!("Duration: {}", format_duration(self.duration)));
        lines.join("\n")
    }

    /// JSON report documents, named as they are persisted.
    pub fn artifacts(&self) -> Result<Vec<Attachment>, ReconcileError> {
        Ok(vec![
            Attachment::new(
                BALANCES_FILE,
                serde_json::to_vec_pretty(&self.balances.entries)?,
            ),
            Attachment::new(
                BALANCES_SORTED_FILE,
                serde_json::to_vec_pretty(&self.balances.sorted_desc())?,
            ),
            Attachment::new(
                NON_QUALIFYING_FILE,
                serde_json::to_vec_pretty(&self.stakes.non_qualifying)?,
            ),
        ])
    }
}

/// Persists report artifacts and hands the summary to the sink.
pub struct ReportEmitter {
    report_dir: PathBuf,
    sink: Arc<dyn NotificationSink>,
}

impl ReportEmitter {
    pub fn new(report_dir: impl Into<PathBuf>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            report_dir: report_dir.into(),
            sink,
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Write artifacts, then deliver. A failed delivery is retried once as
    /// text only; a second failure is logged and otherwise ignored.
    pub async fn emit(&self, report: &SummaryReport) -> Result<(), ReconcileError> {
        let summary = report.render();
        let attachments = report.artifacts()?;

        tokio::fs::create_dir_all(&self.report_dir).await?;
        for attachment in &attachments {
            tokio::fs::write(self.report_dir.join(&attachment.name), &attachment.bytes).await?;
        }
        tokio::fs::write(self.report_dir.join(SUMMARY_FILE), &summary).await?;
        tracing::info!(dir = %self.report_dir.display(), "report artifacts written");

        if let Err(e) = self.sink.deliver(&summary, &attachments).await {
            tracing::warn!(error = %e, "summary delivery failed, falling back to text only");
            if let Err(e) = self.sink.deliver(&summary, &[]).await {
                tracing::error!(error = %e, "text-only summary delivery failed");
            }
        }
        Ok(())
    }
}
