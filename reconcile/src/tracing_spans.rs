//! Pre-built [`tracing::Span`] constructors for reconciliation runs.
//!
//! Consistent span names and field sets make a run's log lines easy to
//! filter by stage or by record.

use tracing::{info_span, Span};

use regsync_types::{RecordId, WalletAddress};

/// Span covering one full run.
pub fn run_span(dry_run: bool) -> Span {
    info_span!("run", dry_run)
}

/// Span covering one pipeline stage (`allocate`, `resolve`, ...).
pub fn stage_span(stage: &'static str) -> Span {
    info_span!("stage", stage)
}

/// Span covering the chain lookup for a single record.
pub fn record_span(record: &RecordId, wallet: &WalletAddress) -> Span {
    info_span!("record", record = %record, wallet = %wallet)
}

/// Span covering the balance fetch for a single record.
pub fn balance_span(record: &RecordId) -> Span {
    info_span!("balance", record = %record)
}
