//! Interfaces of the external collaborators the core consumes.
//!
//! Token ledger, voting power source, execution scheduler. Each failure type
//! is its own error enum; the components map them into
//! [`GovernanceError`](crate::GovernanceError) at the call site.

use agora_types::{Address, Amount, Hash, HashBuilder};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::CallerContext;
use crate::error::GovernanceError;

/// Failures reported by the value-token ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("cap {cap} exceeded by mint of {requested}")]
    CapExceeded { cap: Amount, requested: Amount },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// The value-token ledger.
pub trait TokenLedger {
    fn balance_of(&self, account: &Address) -> Amount;

    fn total_supply(&self) -> Amount;

    /// Move `amount` owned by `from` to `to`.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` owned by `from` to `to` using `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    fn mint(&mut self, to: Address, amount: Amount) -> Result<(), TokenError>;

    fn burn(&mut self, from: Address, amount: Amount) -> Result<(), TokenError>;
}

/// Failures reported by the voting power source.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VotesError {
    #[error("{0} already delegated; delegation is single-use")]
    DelegationLocked(Address),

    #[error("self-delegation is not allowed")]
    SelfDelegation,

    #[error("history is sealed at {sealed}; cannot write at {at}")]
    Sealed { at: u64, sealed: u64 },

    #[error("voting power unavailable: {0}")]
    Unavailable(String),
}

/// Historical voting weight and total supply.
pub trait VotingPowerSource {
    fn past_votes(&self, account: &Address, snapshot: u64) -> Result<Amount, VotesError>;

    fn past_total_supply(&self, snapshot: u64) -> Result<Amount, VotesError>;

    /// Close history up to and including `snapshot`. Balance changes and
    /// delegations at or before a sealed point must be refused afterwards.
    fn seal(&mut self, snapshot: u64) -> Result<(), VotesError>;

    fn delegate(&mut self, delegator: Address, delegatee: Address, now: u64)
        -> Result<(), VotesError>;
}

/// Failures reported by the execution scheduler.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("operation {0} already scheduled")]
    AlreadyQueued(Hash),

    #[error("operation {0} not scheduled")]
    UnknownOperation(Hash),

    #[error("operation not ready until {ready_at} (now {now})")]
    NotReady { ready_at: u64, now: u64 },

    #[error("operation expired at {expired_at}")]
    Expired { expired_at: u64 },

    #[error("operation {0} already finished")]
    AlreadyDone(Hash),

    #[error("execution reverted: {0}")]
    Reverted(String),
}

/// The batch of calls a proposal carries into the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ScheduledCall {
    pub targets: Vec<Address>,
    pub values: Vec<Amount>,
    pub calldatas: Vec<Vec<u8>>,
    pub description_hash: Hash,
}

impl ScheduledCall {
    /// Digest of the call contents; schedulers use it as the operation id.
    pub fn operation_hash(&self) -> Hash {
        let mut builder = HashBuilder::new("agora/operation");
        builder.u64(self.targets.len() as u64);
        for target in &self.targets {
            builder.bytes(target.as_bytes());
        }
        for value in &self.values {
            builder.u128(value.raw());
        }
        for data in &self.calldatas {
            builder.bytes(data);
        }
        builder.bytes(self.description_hash.as_bytes());
        builder.finish()
    }
}

/// Timelock-like scheduler. The governor only decides whether and when to
/// call it.
pub trait ExecutionScheduler {
    fn queue(&mut self, call: &ScheduledCall, now: u64) -> Result<Hash, SchedulerError>;

    fn execute(&mut self, operation: &Hash, now: u64) -> Result<(), SchedulerError>;

    fn cancel(&mut self, operation: &Hash) -> Result<(), SchedulerError>;
}

/// Participation notification channel, governor → reward ledger.
pub trait PointSink {
    fn add_point(&mut self, ctx: &CallerContext, voter: Address) -> Result<(), GovernanceError>;
}
