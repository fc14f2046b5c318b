//! The registry reconciliation engine.
//!
//! One run goes backup → load → allocate reference numbers → resolve NFTs
//! and apply the minimal update batch → scan for duplicates → aggregate
//! balances and stakes → emit the report. [`Reconciler`] drives the
//! pipeline; each stage lives in its own module and returns an explicit
//! accumulator instead of touching shared counters.

pub mod aggregate;
pub mod allocator;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod report;
pub mod resolver;
pub mod tracing_spans;
pub mod updater;

pub use aggregate::{
    aggregate_balances, aggregate_stakes, total_population, BalanceEntry, BalanceReport,
    NonQualifyingStaker, StakeTotals, CATEGORY_NAMES,
};
pub use allocator::{Allocation, AllocationPlan, RefAllocator, RefBounds, UniformDraw};
pub use config::ReconcileConfig;
pub use duplicates::DuplicateReport;
pub use engine::Reconciler;
pub use error::ReconcileError;
pub use report::{ReportEmitter, SummaryReport};
pub use resolver::{NftResolver, Resolution};
pub use updater::{decide, plan_updates, Decision, UpdatePlan, UpdateTally};
