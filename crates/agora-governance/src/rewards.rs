//! Epoch reward ledger.
//!
//! Votes earn one point each in the open epoch. The treasury finalises the
//! epoch by funding a pool, which opens the next one; voters then claim
//! `pool * points / total_points`. Truncation dust stays in custody until the
//! treasury sweeps it after the grace period.
//!
//! Tokens leave custody only through [`RewardEpochLedger::claim`] and
//! [`RewardEpochLedger::sweep_remainder`], and both update the epoch's
//! settled total before the transfer is requested.

use std::collections::{HashMap, HashSet};

use agora_types::{Address, Amount};
use tracing::{debug, info, warn};

use crate::access::{CallerContext, Role};
use crate::collaborators::{PointSink, TokenLedger};
use crate::config::RewardsConfig;
use crate::error::GovernanceError;
use crate::events::GovernanceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochStatus {
    Open,
    Finalised,
    Swept,
}

/// One reward epoch.
#[derive(Debug, Clone)]
pub struct Epoch {
    pub id: u64,
    pub pool: Amount,
    pub total_points: u64,
    /// Claims paid plus any swept remainder
    pub claimed_total: Amount,
    /// Amount recovered by the treasury
    pub swept: Amount,
    pub start_time: u64,
    pub finalised: bool,
    points: HashMap<Address, u64>,
    claimed: HashSet<Address>,
}

impl Epoch {
    fn open(id: u64, start_time: u64) -> Self {
        Self {
            id,
            pool: Amount::ZERO,
            total_points: 0,
            claimed_total: Amount::ZERO,
            swept: Amount::ZERO,
            start_time,
            finalised: false,
            points: HashMap::new(),
            claimed: HashSet::new(),
        }
    }

    pub fn status(&self) -> EpochStatus {
        if !self.swept.is_zero() {
            EpochStatus::Swept
        } else if self.finalised {
            EpochStatus::Finalised
        } else {
            EpochStatus::Open
        }
    }

    pub fn points_of(&self, voter: &Address) -> u64 {
        self.points.get(voter).copied().unwrap_or(0)
    }

    pub fn has_claimed(&self, voter: &Address) -> bool {
        self.claimed.contains(voter)
    }

    pub fn voters(&self) -> usize {
        self.points.len()
    }

    /// Proportional share of `voter`, truncating.
    fn share_of(&self, voter: &Address) -> Result<Amount, GovernanceError> {
        let points = self.points_of(voter);
        if points == 0 {
            return Err(GovernanceError::NoPoints);
        }
        Ok(self
            .pool
            .mul_div(points as u128, self.total_points as u128)?)
    }

    /// Checks shared by `claim` and `pending_reward`.
    fn claimable(&self, voter: &Address) -> Result<Amount, GovernanceError> {
        if !self.finalised {
            return Err(GovernanceError::NotFinalised);
        }
        if !self.swept.is_zero() {
            return Err(GovernanceError::EpochSwept);
        }
        if self.has_claimed(voter) {
            return Err(GovernanceError::AlreadyClaimed);
        }
        self.share_of(voter)
    }
}

#[derive(Debug)]
pub struct RewardEpochLedger {
    /// Custody account holding funded pools
    address: Address,
    config: RewardsConfig,
    /// Indexed by epoch id; the last one is the open epoch
    epochs: Vec<Epoch>,
    events: Vec<GovernanceEvent>,
}

impl RewardEpochLedger {
    /// Create a ledger with epoch 0 open from `now`.
    pub fn new(address: Address, config: RewardsConfig, now: u64) -> Self {
        Self {
            address,
            config,
            epochs: vec![Epoch::open(0, now)],
            events: Vec::new(),
        }
    }

    /// Close the current epoch with a pool pulled from the treasury, then
    /// open the next epoch.
    ///
    /// The treasury must have approved this ledger's custody address for at
    /// least `pool`.
    pub fn finalise_epoch(
        &mut self,
        ctx: &CallerContext,
        pool: Amount,
        token: &mut dyn TokenLedger,
        now: u64,
    ) -> Result<u64, GovernanceError> {
        ctx.require(Role::Treasury)?;
        let current = self.current();
        if current.finalised {
            return Err(GovernanceError::AlreadyFinalised);
        }
        let id = current.id;
        let next = id.checked_add(1).ok_or(GovernanceError::ArithmeticOverflow)?;

        token.transfer_from(self.address, ctx.caller(), self.address, pool)?;

        let epoch = self.current_mut();
        epoch.pool = pool;
        epoch.finalised = true;
        let total_points = epoch.total_points;

        info!(epoch = id, %pool, total_points, "Epoch finalised");
        self.events.push(GovernanceEvent::EpochFinalised {
            epoch: id,
            pool,
            total_points,
        });

        self.epochs.push(Epoch::open(next, now));
        debug!(epoch = next, start_time = now, "Epoch opened");
        self.events.push(GovernanceEvent::EpochOpened {
            epoch: next,
            start_time: now,
        });

        Ok(id)
    }

    /// Pay the caller's share of a finalised epoch.
    pub fn claim(
        &mut self,
        ctx: &CallerContext,
        epoch_id: u64,
        token: &mut dyn TokenLedger,
    ) -> Result<Amount, GovernanceError> {
        let voter = ctx.caller();
        let custody = self.address;
        let epoch = self.epoch_mut(epoch_id)?;
        let share = epoch.claimable(&voter)?;
        let settled = epoch.claimed_total.try_add(share)?;

        let before = epoch.claimed_total;
        epoch.claimed.insert(voter);
        epoch.claimed_total = settled;

        if let Err(e) = token.transfer(custody, voter, share) {
            epoch.claimed.remove(&voter);
            epoch.claimed_total = before;
            warn!(epoch = epoch_id, %voter, %share, error = %e, "Claim payout failed, rolled back");
            return Err(e.into());
        }

        info!(epoch = epoch_id, %voter, %share, "Reward claimed");
        self.events.push(GovernanceEvent::RewardClaimed {
            epoch: epoch_id,
            voter,
            amount: share,
        });
        Ok(share)
    }

    /// Send everything not yet claimed from a finalised epoch to `to`, once
    /// the grace period since the epoch's start has elapsed.
    pub fn sweep_remainder(
        &mut self,
        ctx: &CallerContext,
        epoch_id: u64,
        to: Address,
        token: &mut dyn TokenLedger,
        now: u64,
    ) -> Result<Amount, GovernanceError> {
        ctx.require(Role::Treasury)?;
        let custody = self.address;
        let grace = self.config.grace_period;
        let epoch = self.epoch_mut(epoch_id)?;
        if !epoch.finalised {
            return Err(GovernanceError::NotFinalised);
        }

        let ready_at = epoch.start_time.saturating_add(grace);
        if now < ready_at {
            return Err(GovernanceError::GraceNotElapsed { ready_at, now });
        }

        let due = epoch.pool.try_sub(epoch.claimed_total)?;
        if due.is_zero() {
            return Err(GovernanceError::NothingToSweep);
        }

        let before = epoch.claimed_total;
        epoch.claimed_total = epoch.pool;
        epoch.swept = due;

        if let Err(e) = token.transfer(custody, to, due) {
            epoch.claimed_total = before;
            epoch.swept = Amount::ZERO;
            warn!(epoch = epoch_id, %to, %due, error = %e, "Sweep transfer failed, rolled back");
            return Err(e.into());
        }

        info!(epoch = epoch_id, %to, %due, "Remainder swept");
        self.events.push(GovernanceEvent::RemainderSwept {
            epoch: epoch_id,
            to,
            amount: due,
        });
        Ok(due)
    }

    pub fn current_epoch(&self) -> u64 {
        self.current().id
    }

    pub fn epoch(&self, id: u64) -> Option<&Epoch> {
        usize::try_from(id).ok().and_then(|i| self.epochs.get(i))
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn points_of(&self, epoch_id: u64, voter: &Address) -> u64 {
        self.epoch(epoch_id).map_or(0, |e| e.points_of(voter))
    }

    pub fn has_claimed(&self, epoch_id: u64, voter: &Address) -> bool {
        self.epoch(epoch_id).is_some_and(|e| e.has_claimed(voter))
    }

    /// What `claim` would pay right now; zero where it would fail.
    pub fn pending_reward(&self, epoch_id: u64, voter: &Address) -> Amount {
        self.epoch(epoch_id)
            .and_then(|e| e.claimable(voter).ok())
            .unwrap_or(Amount::ZERO)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.config
    }

    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }

    fn current(&self) -> &Epoch {
        // Never empty: `new` opens epoch 0 and epochs are only appended
        &self.epochs[self.epochs.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Epoch {
        let last = self.epochs.len() - 1;
        &mut self.epochs[last]
    }

    fn epoch_mut(&mut self, id: u64) -> Result<&mut Epoch, GovernanceError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.epochs.get_mut(i))
            .ok_or(GovernanceError::UnknownEpoch(id))
    }
}

impl PointSink for RewardEpochLedger {
    fn add_point(&mut self, ctx: &CallerContext, voter: Address) -> Result<(), GovernanceError> {
        ctx.require(Role::Governor)?;
        let epoch = self.current_mut();
        if epoch.finalised {
            return Err(GovernanceError::EpochClosed);
        }

        let points = epoch
            .points_of(&voter)
            .checked_add(1)
            .ok_or(GovernanceError::ArithmeticOverflow)?;
        let total = epoch
            .total_points
            .checked_add(1)
            .ok_or(GovernanceError::ArithmeticOverflow)?;

        epoch.points.insert(voter, points);
        epoch.total_points = total;
        let id = epoch.id;

        debug!(epoch = id, %voter, points, "Point added");
        self.events.push(GovernanceEvent::PointAdded {
            epoch: id,
            voter,
            points,
        });
        Ok(())
    }
}
