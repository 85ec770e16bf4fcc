//! Orchestrator configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file
//! (or none at all) is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use xtz_vault::{PollPolicy, VaultConfig};

use crate::policy::FeePolicy;

/// Public mainnet node.
pub const DEFAULT_RPC_URL: &str = "https://rpc.tzbeta.net";
/// Blocks to wait for an operation before giving up.
pub const DEFAULT_CONFIRMATION_BLOCKS: u32 = 5;
/// Delay between polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Errors loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for one [`Staker`](crate::Staker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakerConfig {
    /// Tezos node RPC endpoint.
    pub rpc_url: String,
    /// Vault API connection
    pub vault: VaultConfig,
    /// Fee and limits applied to every content
    pub fees: FeePolicy,
    /// Blocks after the start height within which an awaited operation must appear.
    pub confirmation_blocks: u32,
    /// Interval between signing-status polls and between head polls.
    pub poll_interval_ms: u64,
    /// Maximum signing-status polls; unbounded when absent.
    pub max_sign_attempts: Option<u32>,
    /// Wait for each injected operation before returning its hash.
    pub confirm_after_inject: bool,
}

impl Default for StakerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            vault: VaultConfig::default(),
            fees: FeePolicy::default(),
            confirmation_blocks: DEFAULT_CONFIRMATION_BLOCKS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_sign_attempts: None,
            confirm_after_inject: false,
        }
    }
}

impl StakerConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Interval shared by both polling loops.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Poll policy for the signing-status loop.
    pub fn sign_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval(),
            max_attempts: self.max_sign_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = StakerConfig::default();
        assert_eq!(config.confirmation_blocks, 5);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.sign_policy().max_attempts, None);
        assert_eq!(config.fees, FeePolicy::default());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "rpc_url": "https://ghostnet.ecadinfra.com",
                "vault": {{"api_key": "abc"}},
                "fees": {{"gas_limit": 12000}},
                "poll_interval_ms": 250,
                "max_sign_attempts": 120
            }}"#
        )
        .unwrap();

        let config = StakerConfig::load(file.path()).unwrap();
        assert_eq!(config.rpc_url, "https://ghostnet.ecadinfra.com");
        assert_eq!(config.vault.api_key, "abc");
        assert_eq!(config.vault.base_url, xtz_vault::DEFAULT_VAULT_URL);
        assert_eq!(config.fees.gas_limit, 12000);
        assert_eq!(config.fees.fee, 1300);
        assert_eq!(config.confirmation_blocks, 5);
        assert_eq!(
            config.sign_policy(),
            PollPolicy {
                interval: Duration::from_millis(250),
                max_attempts: Some(120),
            }
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = StakerConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            StakerConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
