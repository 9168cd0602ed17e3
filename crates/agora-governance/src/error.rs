use agora_types::{Hash, TypesError};
use thiserror::Error;

use crate::collaborators::{SchedulerError, TokenError, VotesError};
use crate::proposal::ProposalState;

/// Errors that can occur in governance operations.
///
/// Every operation is all-or-nothing: when one of these is returned the
/// component state is exactly what it was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Signer already signed this request")]
    DuplicateSignature,

    #[error("Request already forwarded")]
    AlreadyForwarded,

    #[error("Forwarding failed: {0}")]
    ForwardingFailed(String),

    #[error("Proposal not found: {0}")]
    UnknownProposal(Hash),

    #[error("Proposal already exists: {0}")]
    ProposalExists(Hash),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Proposal not active (state {0:?})")]
    NotActive(ProposalState),

    #[error("Already voted")]
    AlreadyVoted,

    #[error("No voting power at snapshot")]
    NoVotingPower,

    #[error("Voting power {raw} exceeds bound {max}")]
    VotingPowerOutOfRange { raw: u128, max: u128 },

    #[error("Voting power source failed: {0}")]
    VotingPowerUnavailable(String),

    #[error("Proposal has not succeeded (state {0:?})")]
    NotSucceeded(ProposalState),

    #[error("Proposal not queued (state {0:?})")]
    NotQueued(ProposalState),

    #[error("Insufficient execution approvals: {have} < {need}")]
    InsufficientApprovals { have: u32, need: u32 },

    #[error("Proposal cannot be cancelled (state {0:?})")]
    NotCancellable(ProposalState),

    #[error("Scheduler failed: {0}")]
    SchedulerFailed(String),

    #[error("Epoch not found: {0}")]
    UnknownEpoch(u64),

    #[error("Current epoch is closed")]
    EpochClosed,

    #[error("Epoch already finalised")]
    AlreadyFinalised,

    #[error("Epoch not finalised")]
    NotFinalised,

    #[error("Epoch remainder already swept")]
    EpochSwept,

    #[error("Reward already claimed")]
    AlreadyClaimed,

    #[error("No points accrued in epoch")]
    NoPoints,

    #[error("Grace period not elapsed: sweep allowed from {ready_at}, now {now}")]
    GraceNotElapsed { ready_at: u64, now: u64 },

    #[error("Nothing to sweep")]
    NothingToSweep,

    #[error("Token transfer failed: {0}")]
    TransferFailed(String),

    #[error("Token cap exceeded: {0}")]
    CapExceeded(String),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<TypesError> for GovernanceError {
    fn from(_: TypesError) -> Self {
        GovernanceError::ArithmeticOverflow
    }
}

impl From<TokenError> for GovernanceError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::CapExceeded { .. } => GovernanceError::CapExceeded(e.to_string()),
            other => GovernanceError::TransferFailed(other.to_string()),
        }
    }
}

impl From<SchedulerError> for GovernanceError {
    fn from(e: SchedulerError) -> Self {
        GovernanceError::SchedulerFailed(e.to_string())
    }
}

impl From<VotesError> for GovernanceError {
    fn from(e: VotesError) -> Self {
        GovernanceError::VotingPowerUnavailable(e.to_string())
    }
}
