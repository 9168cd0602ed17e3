//! Quadratic vote weight.
//!
//! weight = isqrt(raw voting power at the proposal snapshot)

use agora_types::Amount;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Vote support options, numbered like the usual governor counting module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VoteSupport {
    Against,
    For,
    /// Counts toward quorum, not toward the for/against decision
    Abstain,
}

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)).
///
/// Starts from `z = (n + 1) / 2` and iterates `z = (n / z + z) / 2` while
/// the estimate keeps shrinking. The sequence is strictly decreasing until it
/// reaches the floor root, so the loop terminates for every `u128`.
pub fn integer_sqrt(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }

    // (n + 1) / 2 without overflowing at u128::MAX
    let mut z = (n >> 1) + (n & 1);
    let mut y = n;

    while z < y {
        y = z;
        z = (n / z + z) / 2;
    }

    y
}

/// Quadratic weight of a raw voting power amount.
pub fn quadratic_weight(raw: Amount) -> Amount {
    Amount::new(integer_sqrt(raw.raw()))
}

/// Converts raw snapshot power into tally weight, bounding the input first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadraticWeight {
    max_raw: Amount,
}

impl QuadraticWeight {
    pub fn new(max_raw: Amount) -> Self {
        Self { max_raw }
    }

    pub fn weigh(&self, raw: Amount) -> Result<Amount, GovernanceError> {
        if raw > self.max_raw {
            return Err(GovernanceError::VotingPowerOutOfRange {
                raw: raw.raw(),
                max: self.max_raw.raw(),
            });
        }

        let weight = quadratic_weight(raw);
        if weight.is_zero() {
            return Err(GovernanceError::NoVotingPower);
        }
        Ok(weight)
    }
}
