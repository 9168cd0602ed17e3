//! Agora Governance - council-gated quadratic voting with epoch rewards.
//!
//! This crate provides:
//! - A council membership multisig that forwards payloads once a
//!   severity-dependent threshold of signatures is reached
//! - A quadratic governor: proposals, votes weighted by the integer square
//!   root of snapshot voting power, quorum resolution, scheduling
//! - An epoch reward ledger that turns votes into proportional claims on a
//!   treasury-funded pool
//! - The collaborator interfaces it consumes (token ledger, voting power,
//!   execution scheduler, role check) and in-memory implementations of them
//! - [`Dao`], which wires all of the above together

pub mod access;
pub mod collaborators;
pub mod config;
pub mod counting;
pub mod dao;
pub mod error;
pub mod events;
pub mod execution;
pub mod governor;
pub mod memory;
pub mod multisig;
pub mod proposal;
pub mod rewards;
pub mod voting;

pub use access::{CallerContext, Role, RoleCheck};
pub use collaborators::{
    ExecutionScheduler, PointSink, ScheduledCall, SchedulerError, TokenError, TokenLedger,
    VotesError, VotingPowerSource,
};
pub use config::{GovernanceConfig, GovernorConfig, MultisigConfig, RewardsConfig};
pub use counting::{QuorumFraction, Tally};
pub use dao::{Dao, DaoAddresses, GovernorCall};
pub use error::GovernanceError;
pub use events::GovernanceEvent;
pub use governor::QuadraticGovernor;
pub use multisig::{ForwardTarget, MembershipMultisig, Severity, SignOutcome};
pub use proposal::{Proposal, ProposalState};
pub use rewards::{Epoch, EpochStatus, RewardEpochLedger};
pub use voting::{integer_sqrt, VoteSupport};
