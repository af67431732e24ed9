//! # CLI Interface
//!
//! Defines the command-line argument structure for `powledger` using
//! `clap` derive. Supports five subcommands: `init`, `add-block`,
//! `print-chain`, `verify`, and `version`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Append-only proof-of-work ledger.
///
/// Every block is sealed by a SHA-256 nonce search and stored in an embedded
/// sled database under the data directory.
#[derive(Parser, Debug)]
#[command(
    name = "powledger",
    about = "Append-only proof-of-work ledger",
    version,
    propagate_version = true
)]
pub struct PowledgerCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Directory holding the ledger database. Created on first use.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "POWLEDGER_DATA_DIR",
        default_value = "./powledger-data"
    )]
    pub data_dir: PathBuf,

    /// Required leading zero bits of every block hash.
    ///
    /// Must match the value the ledger was created with. Overrides the
    /// config file.
    #[arg(long, global = true, env = "POWLEDGER_DIFFICULTY")]
    pub difficulty: Option<u32>,

    /// Path to a TOML file with chain settings.
    #[arg(long, short = 'c', global = true, env = "POWLEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

/// `--log-format` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Top-level subcommands for the `powledger` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger with a genesis block, or open it if it exists.
    Init(InitArgs),
    /// Seal a block holding one data record and append it.
    AddBlock(AddBlockArgs),
    /// Print every block from the tip back to genesis.
    PrintChain(PrintChainArgs),
    /// Re-check every hash, proof-of-work, and link in the ledger.
    Verify,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Recipient named in the genesis coinbase record.
    #[arg(long, default_value = "genesis")]
    pub address: String,
}

/// Arguments for the `add-block` subcommand.
#[derive(Parser, Debug)]
pub struct AddBlockArgs {
    /// Text stored as the block's single record.
    #[arg(long)]
    pub data: String,
}

/// Arguments for the `print-chain` subcommand.
#[derive(Parser, Debug)]
pub struct PrintChainArgs {
    /// Emit one JSON document instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// Stop after this many blocks.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        PowledgerCli::command().debug_assert();
    }

    #[test]
    fn parses_add_block_with_globals_after_subcommand() {
        let cli = PowledgerCli::try_parse_from([
            "powledger",
            "add-block",
            "--data",
            "Send 1 BTC to Ivan",
            "--difficulty",
            "12",
            "--data-dir",
            "/tmp/ledger",
        ])
        .unwrap();

        assert_eq!(cli.global.difficulty, Some(12));
        assert_eq!(cli.global.data_dir, PathBuf::from("/tmp/ledger"));
        match cli.command {
            Commands::AddBlock(args) => assert_eq!(args.data, "Send 1 BTC to Ivan"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_block_requires_data() {
        assert!(PowledgerCli::try_parse_from(["powledger", "add-block"]).is_err());
    }

    #[test]
    fn print_chain_flags() {
        let cli = PowledgerCli::try_parse_from([
            "powledger",
            "print-chain",
            "--json",
            "--limit",
            "3",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.global.log_format, LogFormatArg::Json);
        match cli.command {
            Commands::PrintChain(args) => {
                assert!(args.json);
                assert_eq!(args.limit, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
