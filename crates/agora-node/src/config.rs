//! Node configuration.
//!
//! Loaded from a TOML file; every section falls back to its defaults, so an
//! empty file describes a runnable deployment.

use std::path::{Path, PathBuf};

use agora_governance::{DaoAddresses, GovernanceConfig};
use agora_types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name
    pub name: String,
    /// Governance policy
    pub governance: GovernanceConfig,
    /// Component identities
    pub addresses: DaoAddresses,
    /// Initial state
    pub genesis: GenesisConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "agora-node".to_string(),
            governance: GovernanceConfig::default(),
            addresses: DaoAddresses::default(),
            genesis: GenesisConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file.
    /// Paths containing `..` are rejected.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        check_path(path)?;

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    /// Paths containing `..` are rejected.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        check_path(path)?;

        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.governance.validate()?;

        let a = &self.addresses;
        if a.multisig == a.governor || a.multisig == a.ledger || a.governor == a.ledger {
            anyhow::bail!("component addresses must be distinct");
        }
        if self.genesis.treasury.is_zero() {
            anyhow::bail!("treasury address cannot be zero");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            anyhow::bail!("log format must be 'pretty' or 'json', got '{}'", self.logging.format);
        }

        Ok(())
    }
}

fn check_path(path: &Path) -> anyhow::Result<()> {
    if path.to_string_lossy().contains("..") {
        anyhow::bail!("Invalid path: directory traversal detected");
    }
    Ok(())
}

/// A genesis token balance; also recorded as a voting checkpoint at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub account: Address,
    pub amount: Amount,
}

/// Initial state of the collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Holder of the treasury role; funds reward pools
    pub treasury: Address,
    /// Tokens minted to the treasury and approved for the reward ledger
    pub treasury_funds: Amount,
    /// Holders of the canceller role
    pub cancellers: Vec<Address>,
    /// Token supply cap
    pub token_cap: Option<Amount>,
    /// Minimum delay between queue and execute
    pub timelock_delay: u64,
    /// Window after the delay in which execution is allowed; 0 = unbounded
    pub timelock_grace: u64,
    pub balances: Vec<GenesisBalance>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            treasury: Address::derive(b"agora/treasury"),
            treasury_funds: Amount::new(1_000_000),
            cancellers: vec![],
            token_cap: None,
            timelock_delay: 0,
            timelock_grace: 0,
            balances: vec![],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log to file
    pub log_file: Option<PathBuf>,
    /// Log format (json|pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            format: "pretty".to_string(),
        }
    }
}
