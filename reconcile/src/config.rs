//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regsync_chain::rpc::DEFAULT_RPC_URL;
use regsync_chain::RetryPolicy;

use crate::allocator::RefBounds;
use crate::ReconcileError;

/// Configuration for a reconciliation run.
///
/// Can be loaded from a TOML file via [`ReconcileConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Full-node JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Exact type descriptor of a qualifying NFT. Required for a run.
    #[serde(default)]
    pub nft_type: String,

    /// Directory of the LMDB record store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving the JSON report artifacts.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// When set, summaries are delivered into this directory instead of the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox_dir: Option<PathBuf>,

    /// Concurrent in-flight remote queries, shared by every stage.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Total attempts per remote query when rate limited.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Sleep between rate-limited attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_ref_lower")]
    pub ref_lower: u64,

    #[serde(default = "default_ref_upper")]
    pub ref_upper: u64,

    /// Collisions tolerated for one record before the range widens.
    #[serde(default = "default_ref_widen_after")]
    pub ref_widen_after: u32,

    #[serde(default = "default_ref_widen_by")]
    pub ref_widen_by: u64,

    /// Raw on-chain balances are divided by this to get display balances.
    #[serde(default = "default_balance_divisor")]
    pub balance_divisor: u64,

    /// Page size for owned-object listings.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Operations per store round-trip.
    #[serde(default = "default_bulk_write_chunk")]
    pub bulk_write_chunk: usize,

    /// Compute every decision and the report, but take no backup and write nothing.
    #[serde(default)]
    pub dry_run: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./regsync_data")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./reports")
}

fn default_max_concurrent() -> usize {
    2
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    2_000
}

fn default_ref_lower() -> u64 {
    20_000
}

fn default_ref_upper() -> u64 {
    99_999
}

fn default_ref_widen_after() -> u32 {
    100
}

fn default_ref_widen_by() -> u64 {
    100_000
}

fn default_balance_divisor() -> u64 {
    1_000
}

fn default_page_limit() -> usize {
    50
}

fn default_bulk_write_chunk() -> usize {
    500
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ReconcileConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ReconcileError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReconcileError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ReconcileError> {
        toml::from_str(s).map_err(|e| ReconcileError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ReconcileError> {
        toml::to_string_pretty(self).map_err(|e| ReconcileError::Config(e.to_string()))
    }

    /// Reject settings a run cannot work with.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        let fail = |msg: &str| Err(ReconcileError::Config(msg.to_string()));
        if self.nft_type.trim().is_empty() {
            return fail("nft_type must be set");
        }
        if self.ref_lower > self.ref_upper {
            return fail("ref_lower must not exceed ref_upper");
        }
        if self.ref_widen_after == 0 || self.ref_widen_by == 0 {
            return fail("ref_widen_after and ref_widen_by must be positive");
        }
        if self.max_concurrent == 0 {
            return fail("max_concurrent must be at least 1");
        }
        if self.retry_max_attempts == 0 {
            return fail("retry_max_attempts must be at least 1");
        }
        if self.balance_divisor == 0 {
            return fail("balance_divisor must be positive");
        }
        if self.page_limit == 0 || self.bulk_write_chunk == 0 {
            return fail("page_limit and bulk_write_chunk must be positive");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    pub fn ref_bounds(&self) -> RefBounds {
        RefBounds {
            lower: self.ref_lower,
            upper: self.ref_upper,
            widen_after: self.ref_widen_after,
            widen_by: self.ref_widen_by,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            nft_type: String::new(),
            data_dir: default_data_dir(),
            report_dir: default_report_dir(),
            outbox_dir: None,
            max_concurrent: default_max_concurrent(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            ref_lower: default_ref_lower(),
            ref_upper: default_ref_upper(),
            ref_widen_after: default_ref_widen_after(),
            ref_widen_by: default_ref_widen_by(),
            balance_divisor: default_balance_divisor(),
            page_limit: default_page_limit(),
            bulk_write_chunk: default_bulk_write_chunk(),
            dry_run: false,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
