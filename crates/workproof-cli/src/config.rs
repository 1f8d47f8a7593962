use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use workproof_ledger::{ExhaustionPolicy, MinerConfig, SealPolicy};
use workproof_types::{ValueModel, WorkproofError};

/// Longest accepted gap between mining ticks: one day.
const MAX_INTERVAL_SECS: f64 = 86_400.0;

/// Top-level configuration, stored as `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkproofConfig {
    /// Agent id stamped on records created by this node.
    #[serde(default = "default_agent_id")]
    pub agent_id: String,

    /// Wallet used for mining rewards and record signatures.
    #[serde(default = "default_wallet")]
    pub wallet: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    #[serde(default)]
    pub mining: MiningConfig,

    #[serde(default)]
    pub value_model: ValueModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Leading '0' hex characters required of a sealed block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u64,

    #[serde(default)]
    pub on_exhaustion: ExhaustionPolicy,

    #[serde(default = "default_reward")]
    pub reward: f64,

    /// Seconds between background mining ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Switch mining on when the server starts.
    #[serde(default)]
    pub autostart: bool,
}

fn default_agent_id() -> String {
    "agent".to_string()
}

fn default_wallet() -> String {
    "default".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_difficulty() -> usize {
    4
}

fn default_max_attempts() -> u64 {
    100_000
}

fn default_reward() -> f64 {
    10.0
}

fn default_interval_secs() -> f64 {
    10.0
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            max_attempts: default_max_attempts(),
            on_exhaustion: ExhaustionPolicy::default(),
            reward: default_reward(),
            interval_secs: default_interval_secs(),
            autostart: false,
        }
    }
}

impl MiningConfig {
    pub fn miner_config(&self) -> MinerConfig {
        MinerConfig {
            policy: SealPolicy {
                difficulty: self.difficulty,
                max_attempts: self.max_attempts,
                on_exhaustion: self.on_exhaustion,
            },
            reward: self.reward,
        }
    }

    /// Tick interval, bounded to `(0, MAX_INTERVAL_SECS]`.
    pub fn interval(&self) -> std::result::Result<Duration, WorkproofError> {
        let secs = self.interval_secs;
        if !(secs > 0.0 && secs <= MAX_INTERVAL_SECS) {
            return Err(WorkproofError::Config(format!(
                "mining.interval_secs must be in (0, {MAX_INTERVAL_SECS}], got {secs}"
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|e| WorkproofError::Config(format!("mining.interval_secs: {e}")))
    }
}

impl Default for WorkproofConfig {
    fn default() -> Self {
        Self {
            agent_id: default_agent_id(),
            wallet: default_wallet(),
            listen_addr: default_listen_addr(),
            mining: MiningConfig::default(),
            value_model: ValueModel::default(),
        }
    }
}

impl WorkproofConfig {
    /// Config file path within the data directory.
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.toml")
    }

    /// Default data directory: `$WORKPROOF_DATA_DIR` or `~/.workproof/`.
    pub fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("WORKPROOF_DATA_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".workproof")
        }
    }

    /// Load config from disk. Returns default if not found.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::config_path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = Self::config_path(data_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), WorkproofError> {
        let m = &self.mining;
        if m.difficulty > 64 {
            return Err(WorkproofError::Config(format!(
                "mining.difficulty {} exceeds the 64 hex characters of a SHA-256 digest",
                m.difficulty
            )));
        }
        if m.max_attempts == 0 {
            return Err(WorkproofError::Config("mining.max_attempts must be at least 1".into()));
        }
        m.interval()?;
        if !m.reward.is_finite() {
            return Err(WorkproofError::Config("mining.reward must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use workproof_types::TaskType;

    #[test]
    fn test_default_config() {
        let config = WorkproofConfig::default();
        assert_eq!(config.mining.difficulty, 4);
        assert_eq!(config.mining.max_attempts, 100_000);
        assert_eq!(config.mining.reward, 10.0);
        assert_eq!(config.mining.on_exhaustion, ExhaustionPolicy::AcceptUnsealed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let mut config = WorkproofConfig::default();
        config.mining.on_exhaustion = ExhaustionPolicy::Reject;
        config.value_model.weights.insert(TaskType::Doc, 0.5);
        config.save(dir.path()).unwrap();

        let loaded = WorkproofConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        assert_eq!(
            WorkproofConfig::load(dir.path()).unwrap(),
            WorkproofConfig::default()
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            WorkproofConfig::config_path(dir.path()),
            "agent_id = \"builder\"\n\n[mining]\ndifficulty = 2\non_exhaustion = \"reject\"\n",
        )
        .unwrap();

        let config = WorkproofConfig::load(dir.path()).unwrap();
        assert_eq!(config.agent_id, "builder");
        assert_eq!(config.mining.difficulty, 2);
        assert_eq!(config.mining.on_exhaustion, ExhaustionPolicy::Reject);
        assert_eq!(config.mining.reward, 10.0);
        assert_eq!(config.value_model, ValueModel::default());
    }

    #[test]
    fn test_huge_interval_is_rejected_not_panicking() {
        let dir = tempdir().unwrap();
        std::fs::write(
            WorkproofConfig::config_path(dir.path()),
            "[mining]\ninterval_secs = 1e20\n",
        )
        .unwrap();
        assert!(WorkproofConfig::load(dir.path()).is_err());

        let mut config = WorkproofConfig::default();
        config.mining.interval_secs = 1e20;
        assert!(matches!(config.validate(), Err(WorkproofError::Config(_))));
        assert!(config.mining.interval().is_err());

        config.mining.interval_secs = 86_400.0;
        assert_eq!(config.mining.interval().unwrap(), Duration::from_secs(86_400));
        config.mining.interval_secs = 0.5;
        assert_eq!(config.mining.interval().unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_validation() {
        let mut config = WorkproofConfig::default();
        config.mining.difficulty = 65;
        assert!(config.validate().is_err());

        let mut config = WorkproofConfig::default();
        config.mining.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = WorkproofConfig::default();
        config.mining.interval_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = WorkproofConfig::default();
        config.mining.interval_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = WorkproofConfig::default();
        config.mining.reward = f64::NAN;
        assert!(config.validate().is_err());
    }
}
