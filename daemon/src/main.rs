//! regsync daemon: entry point for reconciliation runs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::Value;

use regsync_chain::RpcChainClient;
use regsync_reconcile::{ReconcileConfig, Reconciler};
use regsync_sink::{NotificationSink, OutboxSink, TracingSink};
use regsync_store::{BackupId, RecordStore};
use regsync_store_lmdb::{Document, LmdbRecordStore};
use regsync_types::WalletAddress;
use regsync_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "regsync-daemon", about = "NFT holder registry reconciliation")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "REGSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of the LMDB record store.
    #[arg(long, env = "REGSYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Full-node JSON-RPC endpoint.
    #[arg(long, env = "REGSYNC_RPC_URL")]
    rpc_url: Option<String>,

    /// Exact type descriptor of a qualifying NFT.
    #[arg(long, env = "REGSYNC_NFT_TYPE")]
    nft_type: Option<String>,

    /// Directory receiving the JSON report artifacts.
    #[arg(long, env = "REGSYNC_REPORT_DIR")]
    report_dir: Option<PathBuf>,

    /// Deliver summaries into this directory instead of the log.
    #[arg(long, env = "REGSYNC_OUTBOX_DIR")]
    outbox_dir: Option<PathBuf>,

    /// Concurrent in-flight remote queries.
    #[arg(long, env = "REGSYNC_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,

    /// Compute decisions and the report without backing up or writing.
    #[arg(long, env = "REGSYNC_DRY_RUN")]
    dry_run: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "REGSYNC_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "REGSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run one reconciliation.
    Run,
    /// List stored backups.
    Backups,
    /// Replace the record collection with a backup.
    Restore {
        /// Backup id as printed by `backups`.
        id: String,
    },
    /// Insert records from a JSON array file. Wallet addresses are
    /// normalized; every other field is stored as given.
    Import { file: PathBuf },
    /// Print the effective configuration as TOML.
    Config,
}

/// Validate and normalize the wallet address of one imported document.
/// A missing or blank address is left as it is.
fn normalize_wallet(document: &mut Document) -> anyhow::Result<()> {
    let Some(Value::String(raw)) = document.get("walletAddress") else {
        return Ok(());
    };
    if raw.trim().is_empty() {
        return Ok(());
    }
    let id = document.get("id").cloned().unwrap_or(Value::Null);
    let wallet = WalletAddress::parse(raw).with_context(|| format!("record {id}"))?;
    document.insert("walletAddress".into(), Value::from(wallet.as_str()));
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ReconcileConfig> {
    let base = match &cli.config {
        Some(path) => ReconcileConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReconcileConfig::default(),
    };

    Ok(ReconcileConfig {
        data_dir: cli.data_dir.clone().unwrap_or(base.data_dir.clone()),
        rpc_url: cli.rpc_url.clone().unwrap_or(base.rpc_url.clone()),
        nft_type: cli.nft_type.clone().unwrap_or(base.nft_type.clone()),
        report_dir: cli.report_dir.clone().unwrap_or(base.report_dir.clone()),
        outbox_dir: cli.outbox_dir.clone().or(base.outbox_dir.clone()),
        max_concurrent: cli.max_concurrent.unwrap_or(base.max_concurrent),
        dry_run: cli.dry_run || base.dry_run,
        log_format: cli.log_format.clone().unwrap_or(base.log_format.clone()),
        log_level: cli.log_level.clone().unwrap_or(base.log_level.clone()),
        ..base
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(LogFormat::from_name(&config.log_format), &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Run => {
            config.validate()?;
            let store = LmdbRecordStore::open(&config.data_dir)
                .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
            let provider = Arc::new(RpcChainClient::new(config.rpc_url.clone()));
            let sink: Arc<dyn NotificationSink> = match &config.outbox_dir {
                Some(dir) => Arc::new(OutboxSink::new(dir.clone())),
                None => Arc::new(TracingSink),
            };
            tracing::info!(
                "Starting reconciliation against {} (nft type {}, {} concurrent queries{})",
                config.rpc_url,
                config.nft_type,
                config.max_concurrent,
                if config.dry_run { ", dry run" } else { "" },
            );

            let reconciler = Reconciler::new(config, Arc::new(store), provider, sink);
            let report = reconciler.run_reconciliation().await?;
            println!("{}", report.render());
        }
        Command::Backups => {
            let store = LmdbRecordStore::open(&config.data_dir)?;
            let backups = store.list_backups().await?;
            if backups.is_empty() {
                println!("no backups");
            }
            for backup in backups {
                println!("{}\t{}\t{} records", backup.id, backup.created_at, backup.records);
            }
        }
        Command::Restore { id } => {
            let store = LmdbRecordStore::open(&config.data_dir)?;
            let restored = store.restore_snapshot(&BackupId::new(id.clone())).await?;
            println!("restored {restored} records from {id}");
        }
        Command::Import { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut documents: Vec<Document> = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing {}", file.display()))?;
            if documents.is_empty() {
                bail!("{} holds no records", file.display());
            }
            for document in &mut documents {
                normalize_wallet(document)?;
            }
            let store = LmdbRecordStore::open(&config.data_dir)?;
            let inserted = store.insert_documents(&documents)?;
            println!("imported {inserted} records");
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
