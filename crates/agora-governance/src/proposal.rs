//! Proposal records and their lifecycle.
//!
//! Pending -> Active -> Succeeded/Defeated -> Queued -> Executed, with
//! Canceled reachable from every non-terminal state. Time-driven states are
//! derived from the voting window on every read; only queue, execute and
//! cancel are stored.

use std::collections::{BTreeSet, HashSet};

use agora_types::{Address, Amount, Hash, HashBuilder};
use serde::{Deserialize, Serialize};

use crate::collaborators::ScheduledCall;
use crate::counting::Tally;
use crate::error::GovernanceError;
use crate::voting::VoteSupport;

/// Proposal state in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    /// Created, voting window not open yet
    Pending,
    /// Voting window open
    Active,
    Canceled,
    /// Window closed without majority or quorum
    Defeated,
    /// Window closed with majority and quorum
    Succeeded,
    /// Handed to the scheduler
    Queued,
    Executed,
}

impl ProposalState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Executed | ProposalState::Defeated | ProposalState::Canceled
        )
    }

    pub fn can_vote(&self) -> bool {
        matches!(self, ProposalState::Active)
    }
}

/// Digest of a description, as carried into the scheduler.
pub fn description_hash(description: &str) -> Hash {
    HashBuilder::new("agora/description")
        .bytes(description.as_bytes())
        .finish()
}

/// Deterministic proposal id over `(targets, values, calldatas, descriptionHash)`.
pub fn proposal_id(
    targets: &[Address],
    values: &[Amount],
    calldatas: &[Vec<u8>],
    description_hash: &Hash,
) -> Hash {
    let mut builder = HashBuilder::new("agora/proposal");
    builder.u64(targets.len() as u64);
    for target in targets {
        builder.bytes(target.as_bytes());
    }
    builder.u64(values.len() as u64);
    for value in values {
        builder.u128(value.raw());
    }
    builder.u64(calldatas.len() as u64);
    for data in calldatas {
        builder.bytes(data);
    }
    builder.bytes(description_hash.as_bytes());
    builder.finish()
}

/// Governance proposal.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: Hash,
    /// Identity the proposal was forwarded from
    pub proposer: Address,
    pub targets: Vec<Address>,
    pub values: Vec<Amount>,
    pub calldatas: Vec<Vec<u8>>,
    pub description: String,
    pub description_hash: Hash,
    /// Point at which voting power and supply are read
    pub snapshot: u64,
    /// First unit of the voting window (inclusive)
    pub vote_start: u64,
    /// End of the voting window (exclusive)
    pub vote_end: u64,
    /// Total supply at the snapshot (for quorum calculation)
    pub total_supply: Amount,
    pub tally: Tally,
    voters: HashSet<Address>,
    /// Scheduler operation id once queued
    pub operation: Option<Hash>,
    /// Council members that approved execution
    pub approvals: BTreeSet<Address>,
    pub executed_at: Option<u64>,
    pub canceled_at: Option<u64>,
}

impl Proposal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<Amount>,
        calldatas: Vec<Vec<u8>>,
        description: String,
        snapshot: u64,
        voting_delay: u64,
        voting_period: u64,
        total_supply: Amount,
    ) -> Result<Self, GovernanceError> {
        if targets.is_empty() {
            return Err(GovernanceError::InvalidProposal("empty proposal".to_string()));
        }
        if targets.len() != values.len() || targets.len() != calldatas.len() {
            return Err(GovernanceError::InvalidProposal(format!(
                "length mismatch: {} targets, {} values, {} calldatas",
                targets.len(),
                values.len(),
                calldatas.len()
            )));
        }

        let vote_start = snapshot
            .checked_add(voting_delay)
            .ok_or(GovernanceError::ArithmeticOverflow)?;
        let vote_end = vote_start
            .checked_add(voting_period)
            .ok_or(GovernanceError::ArithmeticOverflow)?;

        let description_hash = description_hash(&description);
        let id = proposal_id(&targets, &values, &calldatas, &description_hash);

        Ok(Self {
            id,
            proposer,
            targets,
            values,
            calldatas,
            description,
            description_hash,
            snapshot,
            vote_start,
            vote_end,
            total_supply,
            tally: Tally::default(),
            voters: HashSet::new(),
            operation: None,
            approvals: BTreeSet::new(),
            executed_at: None,
            canceled_at: None,
        })
    }

    /// Current state given the clock and this proposal's quorum.
    pub fn state(&self, now: u64, quorum: Amount) -> ProposalState {
        if self.canceled_at.is_some() {
            return ProposalState::Canceled;
        }
        if self.executed_at.is_some() {
            return ProposalState::Executed;
        }
        if self.operation.is_some() {
            return ProposalState::Queued;
        }
        if now < self.vote_start {
            return ProposalState::Pending;
        }
        if now < self.vote_end {
            return ProposalState::Active;
        }
        if self.tally.passes(quorum) {
            ProposalState::Succeeded
        } else {
            ProposalState::Defeated
        }
    }

    /// Record a vote. Callers check the state and compute the new tally first.
    pub(crate) fn record_vote(&mut self, voter: Address, tally: Tally) {
        self.voters.insert(voter);
        self.tally = tally;
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn scheduled_call(&self) -> ScheduledCall {
        ScheduledCall {
            targets: self.targets.clone(),
            values: self.values.clone(),
            calldatas: self.calldatas.clone(),
            description_hash: self.description_hash,
        }
    }
}
