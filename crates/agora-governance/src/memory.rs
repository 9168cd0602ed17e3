//! In-memory collaborators.
//!
//! Plain implementations of the collaborator traits, used by the node binary
//! and the tests. They model the parts of a token ledger, a checkpointed
//! votes source, a timelock and a role table that the governance core relies
//! on, nothing more.

use std::collections::{BTreeSet, HashMap};

use agora_types::{Address, Amount, Hash};
use tracing::trace;

use crate::access::{Role, RoleCheck};
use crate::collaborators::{
    ExecutionScheduler, ScheduledCall, SchedulerError, TokenError, TokenLedger, VotesError,
    VotingPowerSource,
};

/// Balance/allowance ledger with an optional supply cap.
#[derive(Debug, Default, Clone)]
pub struct MemoryToken {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
    cap: Option<Amount>,
    /// When set every transfer is rejected (outage simulation)
    frozen: bool,
}

impl MemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(cap: Amount) -> Self {
        Self {
            cap: Some(cap),
            ..Self::default()
        }
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    fn check_open(&self) -> Result<(), TokenError> {
        if self.frozen {
            return Err(TokenError::Rejected("token transfers are frozen".to_string()));
        }
        Ok(())
    }

    /// Move balance after all checks passed.
    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        let have = self.balance_of(&from);
        let from_after = have.checked_sub(amount).ok_or(TokenError::InsufficientBalance {
            have,
            need: amount,
        })?;
        if from == to {
            return Ok(());
        }
        let to_after = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| TokenError::Rejected("balance overflow".to_string()))?;

        self.balances.insert(from, from_after);
        self.balances.insert(to, to_after);
        trace!(%from, %to, %amount, "Token transfer");
        Ok(())
    }
}

impl TokenLedger for MemoryToken {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.check_open()?;
        self.move_balance(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.check_open()?;
        let allowed = self.allowance(&from, &spender);
        let remaining = allowed
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientAllowance {
                have: allowed,
                need: amount,
            })?;

        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, spender), remaining);
        Ok(())
    }

    fn mint(&mut self, to: Address, amount: Amount) -> Result<(), TokenError> {
        let supply = self.total_supply.checked_add(amount);
        let supply = match (supply, self.cap) {
            (Some(supply), Some(cap)) if supply <= cap => supply,
            (Some(supply), None) => supply,
            (_, cap) => {
                return Err(TokenError::CapExceeded {
                    cap: cap.unwrap_or(Amount::MAX),
                    requested: amount,
                })
            }
        };
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| TokenError::Rejected("balance overflow".to_string()))?;

        self.balances.insert(to, balance);
        self.total_supply = supply;
        Ok(())
    }

    fn burn(&mut self, from: Address, amount: Amount) -> Result<(), TokenError> {
        let have = self.balance_of(&from);
        let after = have.checked_sub(amount).ok_or(TokenError::InsufficientBalance {
            have,
            need: amount,
        })?;
        self.balances.insert(from, after);
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }
}

/// A value recorded at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Checkpoint {
    at: u64,
    value: Amount,
}

/// Value of `checkpoints` at `at`: the last checkpoint not after it.
fn value_at(checkpoints: &[Checkpoint], at: u64) -> Amount {
    let idx = checkpoints.partition_point(|c| c.at <= at);
    if idx == 0 {
        Amount::ZERO
    } else {
        checkpoints[idx - 1].value
    }
}

fn push_checkpoint(checkpoints: &mut Vec<Checkpoint>, at: u64, value: Amount) {
    match checkpoints.last_mut() {
        Some(last) if last.at == at => last.value = value,
        _ => checkpoints.push(Checkpoint { at, value }),
    }
}

/// Checkpointed voting power with single-use delegation.
///
/// An account votes with its own balance until it delegates; from the
/// delegation point on its balance counts for the delegatee instead.
/// Once a snapshot is sealed, nothing at or before it can change.
#[derive(Debug, Default, Clone)]
pub struct CheckpointVotes {
    balances: HashMap<Address, Vec<Checkpoint>>,
    supply: Vec<Checkpoint>,
    /// delegator -> (delegatee, effective from)
    delegations: HashMap<Address, (Address, u64)>,
    sealed: Option<u64>,
}

impl CheckpointVotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `account`'s balance from `at` on. Checkpoints must not go back in
    /// time.
    pub fn record_balance(
        &mut self,
        account: Address,
        at: u64,
        amount: Amount,
    ) -> Result<(), VotesError> {
        self.check_unsealed(at)?;
        let latest = self
            .balances
            .get(&account)
            .and_then(|c| c.last())
            .map(|c| c.at)
            .into_iter()
            .chain(self.supply.last().map(|c| c.at))
            .max();
        if let Some(latest) = latest {
            if at < latest {
                return Err(VotesError::Unavailable(format!(
                    "checkpoint at {} precedes latest {}",
                    at, latest
                )));
            }
        }

        let previous = self.balance_at(&account, at);
        let supply = value_at(&self.supply, at)
            .checked_sub(previous)
            .and_then(|s| s.checked_add(amount))
            .ok_or_else(|| VotesError::Unavailable("supply overflow".to_string()))?;

        push_checkpoint(self.balances.entry(account).or_default(), at, amount);
        push_checkpoint(&mut self.supply, at, supply);
        Ok(())
    }

    pub fn balance_at(&self, account: &Address, at: u64) -> Amount {
        self.balances
            .get(account)
            .map_or(Amount::ZERO, |c| value_at(c, at))
    }

    pub fn delegate_of(&self, delegator: &Address) -> Option<Address> {
        self.delegations.get(delegator).map(|(to, _)| *to)
    }

    /// Latest sealed snapshot, if any.
    pub fn sealed(&self) -> Option<u64> {
        self.sealed
    }

    fn check_unsealed(&self, at: u64) -> Result<(), VotesError> {
        match self.sealed {
            Some(sealed) if at <= sealed => Err(VotesError::Sealed { at, sealed }),
            _ => Ok(()),
        }
    }

    fn delegated_at(&self, account: &Address, at: u64) -> bool {
        self.delegations
            .get(account)
            .is_some_and(|(_, since)| *since <= at)
    }
}

impl VotingPowerSource for CheckpointVotes {
    fn past_votes(&self, account: &Address, snapshot: u64) -> Result<Amount, VotesError> {
        let own = if self.delegated_at(account, snapshot) {
            Amount::ZERO
        } else {
            self.balance_at(account, snapshot)
        };

        self.delegations
            .iter()
            .filter(|(_, (to, since))| to == account && *since <= snapshot)
            .try_fold(own, |sum, (from, _)| {
                sum.checked_add(self.balance_at(from, snapshot))
                    .ok_or_else(|| VotesError::Unavailable("vote sum overflow".to_string()))
            })
    }

    fn past_total_supply(&self, snapshot: u64) -> Result<Amount, VotesError> {
        Ok(value_at(&self.supply, snapshot))
    }

    fn seal(&mut self, snapshot: u64) -> Result<(), VotesError> {
        self.sealed = self.sealed.max(Some(snapshot));
        Ok(())
    }

    fn delegate(
        &mut self,
        delegator: Address,
        delegatee: Address,
        now: u64,
    ) -> Result<(), VotesError> {
        if delegator == delegatee {
            return Err(VotesError::SelfDelegation);
        }
        self.check_unsealed(now)?;
        if self.delegations.contains_key(&delegator) {
            return Err(VotesError::DelegationLocked(delegator));
        }
        self.delegations.insert(delegator, (delegatee, now));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Waiting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelockOperation {
    pub call: ScheduledCall,
    pub ready_at: u64,
    pub status: OperationStatus,
}

/// Minimal timelock: a minimum delay before execution and an optional
/// expiry window after it.
#[derive(Debug, Default, Clone)]
pub struct MemoryTimelock {
    min_delay: u64,
    /// Units after `ready_at` during which the operation may run; 0 = forever
    grace: u64,
    operations: HashMap<Hash, TimelockOperation>,
    executed: Vec<Hash>,
    /// When set every execution reverts
    reverting: bool,
}

impl MemoryTimelock {
    pub fn new(min_delay: u64, grace: u64) -> Self {
        Self {
            min_delay,
            grace,
            ..Self::default()
        }
    }

    pub fn operation(&self, id: &Hash) -> Option<&TimelockOperation> {
        self.operations.get(id)
    }

    /// Operations executed so far, in order.
    pub fn executed(&self) -> &[Hash] {
        &self.executed
    }

    pub fn set_reverting(&mut self, reverting: bool) {
        self.reverting = reverting;
    }
}

impl ExecutionScheduler for MemoryTimelock {
    fn queue(&mut self, call: &ScheduledCall, now: u64) -> Result<Hash, SchedulerError> {
        let id = call.operation_hash();
        if self.operations.contains_key(&id) {
            return Err(SchedulerError::AlreadyQueued(id));
        }

        self.operations.insert(
            id,
            TimelockOperation {
                call: call.clone(),
                ready_at: now.saturating_add(self.min_delay),
                status: OperationStatus::Waiting,
            },
        );
        Ok(id)
    }

    fn execute(&mut self, operation: &Hash, now: u64) -> Result<(), SchedulerError> {
        let op = self
            .operations
            .get_mut(operation)
            .ok_or(SchedulerError::UnknownOperation(*operation))?;

        if op.status == OperationStatus::Done {
            return Err(SchedulerError::AlreadyDone(*operation));
        }
        if now < op.ready_at {
            return Err(SchedulerError::NotReady {
                ready_at: op.ready_at,
                now,
            });
        }
        if self.grace > 0 {
            let expired_at = op.ready_at.saturating_add(self.grace);
            if now >= expired_at {
                return Err(SchedulerError::Expired { expired_at });
            }
        }
        if self.reverting {
            return Err(SchedulerError::Reverted("call reverted".to_string()));
        }

        op.status = OperationStatus::Done;
        self.executed.push(*operation);
        Ok(())
    }

    fn cancel(&mut self, operation: &Hash) -> Result<(), SchedulerError> {
        match self.operations.get(operation) {
            None => Err(SchedulerError::UnknownOperation(*operation)),
            Some(op) if op.status == OperationStatus::Done => {
                Err(SchedulerError::AlreadyDone(*operation))
            }
            Some(_) => {
                self.operations.remove(operation);
                Ok(())
            }
        }
    }
}

/// Role table fixed at start-up.
#[derive(Debug, Default, Clone)]
pub struct StaticRoles {
    grants: HashMap<Role, BTreeSet<Address>>,
}

impl StaticRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: Role, account: Address) -> Self {
        self.grants.entry(role).or_default().insert(account);
        self
    }

    pub fn grant_all(self, role: Role, accounts: impl IntoIterator<Item = Address>) -> Self {
        accounts
            .into_iter()
            .fold(self, |roles, account| roles.grant(role, account))
    }

    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.grants.get(&role).into_iter().flatten()
    }
}

impl RoleCheck for StaticRoles {
    fn has_role(&self, role: Role, account: &Address) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|members| members.contains(account))
    }
}
