//! Governance policy configuration.
//!
//! Defaults are the policy constants the engine ships with: minor/major
//! council thresholds 2 and 3, a 1-unit voting delay, a 7-unit voting period,
//! a 4% quorum, no council execution approvals, and a 90-unit sweep grace
//! period.

use agora_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Smallest allowed council.
pub const MIN_COUNCIL_SIZE: usize = 3;
/// Largest allowed council.
pub const MAX_COUNCIL_SIZE: usize = 10;

/// Full policy for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GovernanceConfig {
    pub multisig: MultisigConfig,
    pub governor: GovernorConfig,
    pub rewards: RewardsConfig,
}

impl GovernanceConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        self.multisig.validate()?;
        self.governor.validate()?;
        self.rewards.validate()
    }
}

/// Council membership and severity thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultisigConfig {
    pub members: Vec<Address>,
    pub minor_threshold: u32,
    pub major_threshold: u32,
}

impl Default for MultisigConfig {
    fn default() -> Self {
        Self {
            members: (1..=3)
                .map(|i| Address::derive(format!("agora/council/{}", i).as_bytes()))
                .collect(),
            minor_threshold: 2,
            major_threshold: 3,
        }
    }
}

impl MultisigConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        let size = self.members.len();
        if !(MIN_COUNCIL_SIZE..=MAX_COUNCIL_SIZE).contains(&size) {
            return Err(GovernanceError::InvalidConfig(format!(
                "council size {} outside {}..={}",
                size, MIN_COUNCIL_SIZE, MAX_COUNCIL_SIZE
            )));
        }

        let mut sorted = self.members.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != size {
            return Err(GovernanceError::InvalidConfig(
                "duplicate council member".to_string(),
            ));
        }
        if sorted.iter().any(Address::is_zero) {
            return Err(GovernanceError::InvalidConfig(
                "zero address in council".to_string(),
            ));
        }

        if self.minor_threshold == 0
            || self.minor_threshold >= self.major_threshold
            || self.major_threshold as usize > size
        {
            return Err(GovernanceError::InvalidConfig(format!(
                "thresholds must satisfy 1 <= minor ({}) < major ({}) <= members ({})",
                self.minor_threshold, self.major_threshold, size
            )));
        }

        Ok(())
    }
}

/// Proposal timing, quorum and execution policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Units between proposal creation and the start of voting.
    pub voting_delay: u64,
    /// Length of the voting window.
    pub voting_period: u64,
    pub quorum_numerator: u64,
    pub quorum_denominator: u64,
    /// Council approvals needed before a queued proposal may execute.
    pub execution_approvals: u32,
    /// Upper bound on raw voting power (the ledger's max supply).
    pub max_voting_power: Amount,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            voting_delay: 1,
            voting_period: 7,
            quorum_numerator: 4,
            quorum_denominator: 100,
            execution_approvals: 0,
            // 10^9 tokens at 18 decimals
            max_voting_power: Amount::new(1_000_000_000_000_000_000_000_000_000),
        }
    }
}

impl GovernorConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.voting_period == 0 {
            return Err(GovernanceError::InvalidConfig(
                "voting period cannot be 0".to_string(),
            ));
        }
        if self.quorum_denominator == 0 || self.quorum_numerator > self.quorum_denominator {
            return Err(GovernanceError::InvalidConfig(format!(
                "quorum fraction {}/{} is not in [0, 1]",
                self.quorum_numerator, self.quorum_denominator
            )));
        }
        if self.execution_approvals as usize > MAX_COUNCIL_SIZE {
            return Err(GovernanceError::InvalidConfig(format!(
                "execution approvals {} exceed the largest council",
                self.execution_approvals
            )));
        }
        Ok(())
    }
}

/// Reward epoch policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Units after an epoch's start before its remainder may be swept.
    pub grace_period: u64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self { grace_period: 90 }
    }
}

impl RewardsConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GovernanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.governor.voting_delay, 1);
        assert_eq!(config.governor.voting_period, 7);
        assert_eq!(config.rewards.grace_period, 90);
    }

    #[test]
    fn test_council_bounds() {
        let mut config = MultisigConfig::default();
        config.members.truncate(2);
        config.major_threshold = 2;
        config.minor_threshold = 1;
        assert!(config.validate().is_err());

        let mut config = MultisigConfig::default();
        config.members = (0..11u8).map(|i| Address::from_bytes([i + 1; 20])).collect();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let mut config = MultisigConfig::default();
        config.minor_threshold = 3;
        config.major_threshold = 3;
        assert!(config.validate().is_err());

        config.minor_threshold = 2;
        config.major_threshold = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let mut config = MultisigConfig::default();
        config.members[2] = config.members[0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial_override() {
        let config: GovernanceConfig = toml::from_str(
            r#"
            [governor]
            voting_period = 20
            execution_approvals = 2

            [rewards]
            grace_period = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.governor.voting_period, 20);
        assert_eq!(config.governor.voting_delay, 1);
        assert_eq!(config.governor.execution_approvals, 2);
        assert_eq!(config.rewards.grace_period, 10);
        assert_eq!(config.multisig, MultisigConfig::default());
    }
}
