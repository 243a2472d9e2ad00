//! Service configuration
//!
//! TOML-backed, with serde defaults for everything operational so a minimal
//! file only names the endpoints.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid program id: {0}")]
    InvalidProgramId(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Escrow program id, defaults to the built-in deployment.
    #[serde(default = "default_program_id")]
    pub program_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScorerConfig {
    pub url: String,
    /// Tried only when the primary endpoint returns 402.
    #[serde(default)]
    pub fallback_url: Option<String>,
    #[serde(default = "default_scorer_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_confirmation_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_confirmation_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_confirmation_attempts(),
            interval_ms: default_confirmation_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Transactions inspected when scanning for an unreferenced escrow.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_limit: default_scan_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletsConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    pub chain: ChainConfig,
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    pub wallets: WalletsConfig,
}

impl SettlementConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from an explicit path, the `SETTLEMENT_CONFIG_PATH` env var, or
    /// `settlement.toml` in the working directory, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var("SETTLEMENT_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("settlement.toml")),
        };
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn program_id(&self) -> Result<Pubkey, ConfigError> {
        Pubkey::from_str(&self.chain.program_id)
            .map_err(|_| ConfigError::InvalidProgramId(self.chain.program_id.clone()))
    }
}

fn default_program_id() -> String {
    reply_escrow::id().to_string()
}

fn default_scorer_timeout_ms() -> u64 {
    30_000
}

fn default_confirmation_attempts() -> u32 {
    30
}

fn default_confirmation_interval_ms() -> u64 {
    3_000
}

fn default_scan_limit() -> usize {
    25
}
