//! # Settings
//!
//! Resolves the [`ChainConfig`] the binary runs with. Sources, highest
//! precedence first:
//!
//! ```text
//! --difficulty / POWLEDGER_DIFFICULTY
//! --config FILE, else <data-dir>/powledger.toml if present
//! built-in defaults
//! ```
//!
//! File format:
//!
//! ```toml
//! [chain]
//! difficulty = 16
//! max_append_retries = 8
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use powledger::ChainConfig;

use crate::cli::GlobalArgs;

/// Name of the config file looked up inside the data directory.
pub const DEFAULT_CONFIG_FILE: &str = "powledger.toml";

/// On-disk layout of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub chain: ChainConfig,
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Build the effective chain configuration from flags, file, and defaults.
pub fn resolve(global: &GlobalArgs) -> Result<ChainConfig> {
    let mut config = match config_path(global) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            FileConfig::load(&path)?.chain
        }
        None => ChainConfig::default(),
    };

    if let Some(difficulty) = global.difficulty {
        config.difficulty = difficulty;
    }

    config.validate().context("invalid chain settings")?;
    Ok(config)
}

fn config_path(global: &GlobalArgs) -> Option<PathBuf> {
    if let Some(path) = &global.config {
        return Some(path.clone());
    }
    let fallback = global.data_dir.join(DEFAULT_CONFIG_FILE);
    fallback.is_file().then_some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::LogFormatArg;
    use powledger::config::{DEFAULT_DIFFICULTY, DEFAULT_MAX_APPEND_RETRIES};

    fn args(data_dir: &Path) -> GlobalArgs {
        GlobalArgs {
            data_dir: data_dir.to_path_buf(),
            difficulty: None,
            config: None,
            log_format: LogFormatArg::Pretty,
        }
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve(&args(dir.path())).unwrap();
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.max_append_retries, DEFAULT_MAX_APPEND_RETRIES);
    }

    #[test]
    fn file_in_data_dir_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[chain]\ndifficulty = 10\nmax_append_retries = 2\n",
        )
        .unwrap();

        let config = resolve(&args(dir.path())).unwrap();
        assert_eq!(config.difficulty, 10);
        assert_eq!(config.max_append_retries, 2);
    }

    #[test]
    fn flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[chain]\ndifficulty = 10\n").unwrap();

        let mut global = args(dir.path());
        global.config = Some(path);
        global.difficulty = Some(6);

        let config = resolve(&global).unwrap();
        assert_eq!(config.difficulty, 6);
        assert_eq!(config.max_append_retries, DEFAULT_MAX_APPEND_RETRIES);
    }

    #[test]
    fn out_of_range_difficulty_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut global = args(dir.path());
        global.difficulty = Some(0);
        assert!(resolve(&global).is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[chain]\ndificulty = 10\n").unwrap();
        let mut global = args(dir.path());
        global.config = Some(path);
        assert!(resolve(&global).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut global = args(dir.path());
        global.config = Some(dir.path().join("absent.toml"));
        assert!(resolve(&global).is_err());
    }
}
