// Node configuration, loaded from JSON
use std::{collections::HashMap, path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};

use crate::primitives::{Account, Amount, Epoch, LedgerError, Link, Result};
use crate::storage::DatabaseConfig;

/// An epoch upgrade: blocks with `link` signed by `signer` move accounts to `epoch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochConfig {
    pub epoch: Epoch,
    pub link: Link,
    pub signer: Account,
}

/// Ledger construction parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub epochs: Vec<EpochConfig>,
    /// Bootstrap weights apply while the ledger holds fewer blocks than this
    pub bootstrap_weight_max_blocks: u64,
    pub bootstrap_weights: HashMap<Account, Amount>,
}

impl LedgerConfig {
    pub fn epoch_for_link(&self, link: &Link) -> Option<&EpochConfig> {
        if link.is_zero() {
            return None;
        }
        self.epochs.iter().find(|epoch| epoch.link == *link)
    }

    pub fn is_epoch_link(&self, link: &Link) -> bool {
        self.epoch_for_link(link).is_some()
    }
}

/// Election and vote handling parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Minimum time before a representative may switch blocks at the same sequence
    pub vote_cooldown_ms: u64,
    /// Leader must beat the runner-up by this share of the supply to confirm
    pub quorum_percent: u8,
    /// Competing blocks kept per root
    pub max_candidates: usize,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            vote_cooldown_ms: 15_000,
            quorum_percent: 50,
            max_candidates: 10,
        }
    }
}

impl ElectionConfig {
    pub fn vote_cooldown(&self) -> Duration {
        Duration::from_millis(self.vote_cooldown_ms)
    }
}

/// Top level node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub elections: ElectionConfig,
    /// Votes buffered ahead of the vote processor before new ones are dropped
    pub vote_queue_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            database: DatabaseConfig::default(),
            ledger: LedgerConfig::default(),
            elections: ElectionConfig::default(),
            vote_queue_capacity: 4096,
        }
    }
}

impl NodeConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| LedgerError::Config(format!("Failed to read {}: {}", path.as_ref().display(), e)))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: NodeConfig = serde_json::from_str(r#"{ "vote_queue_capacity": 8 }"#).unwrap();
        assert_eq!(config.vote_queue_capacity, 8);
        assert_eq!(config.elections, ElectionConfig::default());
        assert_eq!(config.ledger, LedgerConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = NodeConfig::default();
        config.ledger.bootstrap_weight_max_blocks = 3;
        config.ledger.bootstrap_weights.insert(Account::from(7u64), 1000);
        config.ledger.epochs.push(EpochConfig {
            epoch: Epoch(1),
            link: Link::from(123u64),
            signer: Account::from(1u64),
        });
        config.save(&path).unwrap();

        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.ledger.is_epoch_link(&Link::from(123u64)));
        assert!(!loaded.ledger.is_epoch_link(&Link::zero()));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        assert!(matches!(NodeConfig::load("/nonexistent/config.json"), Err(LedgerError::Config(_))));
    }
}
