//! Events emitted by the governance components.
//!
//! Each component appends to its own log on success only; a failed call
//! leaves no event behind.

use agora_types::{Address, Amount, Hash};
use serde::Serialize;

use crate::multisig::Severity;
use crate::voting::VoteSupport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GovernanceEvent {
    RequestSigned {
        request: Hash,
        signer: Address,
        count: u32,
    },
    RequestForwarded {
        request: Hash,
        target: Address,
        severity: Severity,
    },
    ProposalCreated {
        proposal: Hash,
        proposer: Address,
        snapshot: u64,
        vote_start: u64,
        vote_end: u64,
        description: String,
    },
    VoteCast {
        proposal: Hash,
        voter: Address,
        support: VoteSupport,
        raw_power: Amount,
        weight: Amount,
    },
    ProposalQueued {
        proposal: Hash,
        operation: Hash,
    },
    ExecutionApproved {
        proposal: Hash,
        approver: Address,
        approvals: u32,
    },
    ProposalExecuted {
        proposal: Hash,
    },
    ProposalCanceled {
        proposal: Hash,
    },
    PointAdded {
        epoch: u64,
        voter: Address,
        points: u64,
    },
    EpochFinalised {
        epoch: u64,
        pool: Amount,
        total_points: u64,
    },
    EpochOpened {
        epoch: u64,
        start_time: u64,
    },
    RewardClaimed {
        epoch: u64,
        voter: Address,
        amount: Amount,
    },
    RemainderSwept {
        epoch: u64,
        to: Address,
        amount: Amount,
    },
}
