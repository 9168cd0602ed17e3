//! Counting policy: vote tallies, quorum fraction, resolution rule.

use agora_types::Amount;
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::voting::VoteSupport;

/// Weighted tallies of one proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub for_votes: Amount,
    pub against_votes: Amount,
    pub abstain_votes: Amount,
}

impl Tally {
    /// Tally with `weight` added to the `support` bucket. Pure, so a caller
    /// can compute it before committing anything.
    pub fn with_vote(&self, support: VoteSupport, weight: Amount) -> Result<Self, GovernanceError> {
        let mut next = *self;
        let bucket = match support {
            VoteSupport::For => &mut next.for_votes,
            VoteSupport::Against => &mut next.against_votes,
            VoteSupport::Abstain => &mut next.abstain_votes,
        };
        *bucket = bucket.try_add(weight)?;
        Ok(next)
    }

    /// Total votes cast, abstentions included.
    pub fn total(&self) -> Amount {
        [self.for_votes, self.against_votes, self.abstain_votes]
            .into_iter()
            .sum()
    }

    pub fn quorum_reached(&self, quorum: Amount) -> bool {
        self.total() >= quorum
    }

    /// Strict majority of for over against.
    pub fn vote_succeeded(&self) -> bool {
        self.for_votes > self.against_votes
    }

    /// Resolution rule at window close.
    pub fn passes(&self, quorum: Amount) -> bool {
        self.vote_succeeded() && self.quorum_reached(quorum)
    }
}

/// Quorum as a fraction of the total supply at the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumFraction {
    pub numerator: u64,
    pub denominator: u64,
}

impl QuorumFraction {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `total_supply * numerator / denominator`, truncating.
    pub fn quorum_for(&self, total_supply: Amount) -> Result<Amount, GovernanceError> {
        Ok(total_supply.mul_div(self.numerator as u128, self.denominator as u128)?)
    }
}

impl Default for QuorumFraction {
    fn default() -> Self {
        Self::new(4, 100)
    }
}
