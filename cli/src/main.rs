//! # powledger
//!
//! Entry point for the `powledger` binary. Parses CLI arguments, initializes
//! logging, opens the ledger under the data directory, and runs one command.
//!
//! The binary supports five subcommands:
//!
//! - `init`        — create the ledger (or open it if it already exists)
//! - `add-block`   — seal and append one block
//! - `print-chain` — dump every block from tip to genesis
//! - `verify`      — audit hashes, proof-of-work, and links
//! - `version`     — print build version information
//!
//! Proof-of-work searches run on a blocking worker thread. Ctrl+C or SIGTERM
//! during a search cancels it and nothing is written.

mod cli;
mod logging;
mod settings;
mod view;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use powledger::config::GENESIS_COINBASE_MEMO;
use powledger::{CancelToken, Chain, ChainConfig, LedgerError, SledStore, Transaction};

use cli::{Commands, GlobalArgs, PowledgerCli};
use logging::LogFormat;

/// Sub-directory of the data directory holding the sled database.
const DB_DIR: &str = "db";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PowledgerCli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    logging::init_logging(logging::DEFAULT_FILTER, LogFormat::from(cli.global.log_format));
    let config = settings::resolve(&cli.global)?;

    match cli.command {
        Commands::Init(args) => init_ledger(&cli.global, config, args).await,
        Commands::AddBlock(args) => add_block(&cli.global, config, args).await,
        Commands::PrintChain(args) => print_chain(&cli.global, config, args),
        Commands::Verify => verify_chain(&cli.global, config),
        Commands::Version => Ok(()),
    }
}

/// Creates the genesis block if the data directory holds no ledger yet.
async fn init_ledger(
    global: &GlobalArgs,
    config: ChainConfig,
    args: cli::InitArgs,
) -> Result<()> {
    let store = open_store(&global.data_dir)?;
    let difficulty = config.difficulty;
    let genesis = vec![Transaction::coinbase(&args.address, Some(GENESIS_COINBASE_MEMO))];

    tracing::info!(
        data_dir = %global.data_dir.display(),
        difficulty,
        "opening ledger"
    );

    let cancel = CancelToken::new();
    let chain = run_cancellable(cancel.clone(), move || {
        Chain::open_or_create_with_cancel(store, genesis, config, &cancel)
    })
    .await
    .context("failed to initialize ledger")?;

    println!("Ledger ready.");
    println!("  Data directory : {}", global.data_dir.display());
    println!("  Difficulty     : {}", difficulty);
    println!("  Tip            : {}", chain.tip_hex());

    Ok(())
}

/// Seals `--data` into a new block on top of the current tip.
async fn add_block(
    global: &GlobalArgs,
    config: ChainConfig,
    args: cli::AddBlockArgs,
) -> Result<()> {
    let chain = Arc::new(open_chain(global, config)?);
    let payload = vec![Transaction::new(args.data)];

    let cancel = CancelToken::new();
    let worker = Arc::clone(&chain);
    let block = run_cancellable(cancel.clone(), move || {
        worker.append_with_cancel(payload, &cancel)
    })
    .await
    .context("failed to append block")?;

    println!("Block added.");
    println!("  Hash  : {}", block.hash_hex());
    println!("  Nonce : {}", block.nonce);

    Ok(())
}

/// Prints the chain from tip to genesis, as text or JSON.
fn print_chain(
    global: &GlobalArgs,
    config: ChainConfig,
    args: cli::PrintChainArgs,
) -> Result<()> {
    let chain = open_chain(global, config)?;
    let limit = args.limit.unwrap_or(usize::MAX);

    let mut blocks = Vec::new();
    for block in chain.iter().take(limit) {
        blocks.push(block.context("failed to read block")?);
    }

    if args.json {
        let dump = view::ChainView {
            tip: chain.tip_hex(),
            height: blocks.len(),
            blocks: blocks.iter().map(view::BlockView::from).collect(),
        };
        let out = serde_json::to_string_pretty(&dump).context("failed to render JSON")?;
        println!("{}", out);
    } else {
        for block in &blocks {
            println!("{}", block);
        }
    }

    Ok(())
}

/// Audits the whole chain and prints a short report.
fn verify_chain(global: &GlobalArgs, config: ChainConfig) -> Result<()> {
    let chain = open_chain(global, config)?;
    let report = chain.verify().context("chain verification failed")?;

    tracing::info!(blocks = report.blocks, "chain verified");
    println!("Chain OK.");
    println!("  Blocks     : {}", report.blocks);
    println!("  Difficulty : {}", chain.config().difficulty);
    println!("  Tip        : {}", report.tip);
    println!("  Genesis    : {}", report.genesis);

    Ok(())
}

/// Opens (creating if needed) the sled database under `data_dir`.
fn open_store(data_dir: &Path) -> Result<Arc<SledStore>> {
    let db_path = data_dir.join(DB_DIR);
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "database opened");
    Ok(Arc::new(store))
}

/// Opens an existing ledger; points the user at `init` if there is none.
fn open_chain(global: &GlobalArgs, config: ChainConfig) -> Result<Chain<SledStore>> {
    let store = open_store(&global.data_dir)?;
    match Chain::open(store, config) {
        Ok(chain) => Ok(chain),
        Err(LedgerError::NotFound(_)) => anyhow::bail!(
            "no ledger in {}; run `powledger init` first",
            global.data_dir.display()
        ),
        Err(err) => Err(err).context("failed to open ledger"),
    }
}

/// Runs a proof-of-work job on the blocking pool, cancelling it on Ctrl+C
/// or SIGTERM. The job must observe `cancel`.
async fn run_cancellable<T, F>(cancel: CancelToken, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> powledger::Result<T> + Send + 'static,
{
    let mut handle = tokio::task::spawn_blocking(job);

    tokio::select! {
        joined = &mut handle => {
            Ok(joined.context("proof-of-work worker panicked")??)
        }
        _ = shutdown_signal() => {
            tracing::warn!("interrupt received, cancelling proof-of-work search");
            cancel.cancel();
            let joined = handle.await.context("proof-of-work worker panicked")?;
            Ok(joined?)
        }
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("powledger {}", env!("CARGO_PKG_VERSION"));
    println!("rustc     {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
