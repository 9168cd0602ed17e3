//! Composition root.
//!
//! [`Dao`] owns the multisig, the governor and the reward ledger together
//! with the four collaborators, and is the only place they are wired to each
//! other. Every entry point takes the caller's address and resolves its
//! roles once through the role check before calling into the core.

use agora_types::{Address, Amount, Hash};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::access::{CallerContext, RoleCheck};
use crate::collaborators::{ExecutionScheduler, TokenLedger, VotingPowerSource};
use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::events::GovernanceEvent;
use crate::governor::QuadraticGovernor;
use crate::multisig::{ForwardTarget, MembershipMultisig, Severity, SignOutcome};
use crate::proposal::ProposalState;
use crate::rewards::RewardEpochLedger;
use crate::voting::VoteSupport;

/// Payload the council forwards to the governor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum GovernorCall {
    Propose {
        targets: Vec<Address>,
        values: Vec<Amount>,
        calldatas: Vec<Vec<u8>>,
        description: String,
    },
    Cancel {
        proposal: Hash,
    },
}

impl GovernorCall {
    pub fn encode(&self) -> Result<Vec<u8>, GovernanceError> {
        borsh::to_vec(self).map_err(|e| GovernanceError::InvalidProposal(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, GovernanceError> {
        borsh::from_slice(bytes).map_err(|e| {
            GovernanceError::InvalidProposal(format!("undecodable governor call: {}", e))
        })
    }
}

/// Component identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoAddresses {
    /// Forwarding identity of the council multisig
    pub multisig: Address,
    pub governor: Address,
    /// Reward ledger custody account
    pub ledger: Address,
}

impl Default for DaoAddresses {
    fn default() -> Self {
        Self {
            multisig: Address::derive(b"agora/multisig"),
            governor: Address::derive(b"agora/governor"),
            ledger: Address::derive(b"agora/rewards"),
        }
    }
}

/// Delivers forwarded payloads to the governor.
struct GovernorForwarder<'a> {
    governor: &'a mut QuadraticGovernor,
    votes: &'a mut dyn VotingPowerSource,
    scheduler: &'a mut dyn ExecutionScheduler,
    now: u64,
}

impl ForwardTarget for GovernorForwarder<'_> {
    fn forward(
        &mut self,
        origin: Address,
        target: Address,
        payload: &[u8],
    ) -> Result<(), GovernanceError> {
        if target != self.governor.address() {
            return Err(GovernanceError::InvalidProposal(format!(
                "no receiver at {}",
                target
            )));
        }

        let ctx = CallerContext::system(origin, &[]);
        match GovernorCall::decode(payload)? {
            GovernorCall::Propose {
                targets,
                values,
                calldatas,
                description,
            } => self
                .governor
                .propose(&ctx, targets, values, calldatas, description, &mut *self.votes, self.now)
                .map(|_| ()),
            GovernorCall::Cancel { proposal } => {
                self.governor
                    .cancel(&ctx, &proposal, &mut *self.scheduler, self.now)
            }
        }
    }
}

/// The assembled DAO.
pub struct Dao<T, V, S, R> {
    addresses: DaoAddresses,
    multisig: MembershipMultisig,
    governor: QuadraticGovernor,
    ledger: RewardEpochLedger,
    token: T,
    votes: V,
    scheduler: S,
    roles: R,
}

impl<T, V, S, R> Dao<T, V, S, R>
where
    T: TokenLedger,
    V: VotingPowerSource,
    S: ExecutionScheduler,
    R: RoleCheck,
{
    pub fn new(
        config: GovernanceConfig,
        addresses: DaoAddresses,
        token: T,
        votes: V,
        scheduler: S,
        roles: R,
        now: u64,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;

        Ok(Self {
            multisig: MembershipMultisig::new(addresses.multisig, &config.multisig)?,
            governor: QuadraticGovernor::new(
                addresses.governor,
                addresses.multisig,
                config.governor,
            )?,
            ledger: RewardEpochLedger::new(addresses.ledger, config.rewards, now),
            addresses,
            token,
            votes,
            scheduler,
            roles,
        })
    }

    /// Capabilities of `caller` as of now.
    pub fn context(&self, caller: Address) -> CallerContext {
        CallerContext::verify(caller, &self.roles)
    }

    pub fn sign_and_forward(
        &mut self,
        caller: Address,
        target: Address,
        severity: Severity,
        payload: &[u8],
        now: u64,
    ) -> Result<SignOutcome, GovernanceError> {
        let ctx = self.context(caller);
        let mut forwarder = GovernorForwarder {
            governor: &mut self.governor,
            votes: &mut self.votes,
            scheduler: &mut self.scheduler,
            now,
        };
        self.multisig
            .sign_and_forward(&ctx, target, severity, payload, &mut forwarder)
    }

    pub fn cast_vote(
        &mut self,
        caller: Address,
        proposal: &Hash,
        support: VoteSupport,
        now: u64,
    ) -> Result<Amount, GovernanceError> {
        let ctx = self.context(caller);
        self.governor
            .cast_vote(&ctx, proposal, support, &self.votes, &mut self.ledger, now)
    }

    pub fn delegate(
        &mut self,
        caller: Address,
        delegatee: Address,
        now: u64,
    ) -> Result<(), GovernanceError> {
        Ok(self.votes.delegate(caller, delegatee, now)?)
    }

    pub fn queue(&mut self, proposal: &Hash, now: u64) -> Result<Hash, GovernanceError> {
        self.governor.queue(proposal, &mut self.scheduler, now)
    }

    pub fn approve_execution(
        &mut self,
        caller: Address,
        proposal: &Hash,
        now: u64,
    ) -> Result<u32, GovernanceError> {
        let ctx = self.context(caller);
        self.governor.approve_execution(&ctx, proposal, now)
    }

    pub fn execute(&mut self, proposal: &Hash, now: u64) -> Result<(), GovernanceError> {
        self.governor.execute(proposal, &mut self.scheduler, now)
    }

    /// Direct cancel, for canceller role holders. The council cancels through
    /// a forwarded [`GovernorCall::Cancel`].
    pub fn cancel(&mut self, caller: Address, proposal: &Hash, now: u64) -> Result<(), GovernanceError> {
        let ctx = self.context(caller);
        self.governor
            .cancel(&ctx, proposal, &mut self.scheduler, now)
    }

    pub fn finalise_epoch(
        &mut self,
        caller: Address,
        pool: Amount,
        now: u64,
    ) -> Result<u64, GovernanceError> {
        let ctx = self.context(caller);
        self.ledger.finalise_epoch(&ctx, pool, &mut self.token, now)
    }

    pub fn claim(&mut self, caller: Address, epoch: u64) -> Result<Amount, GovernanceError> {
        let ctx = self.context(caller);
        self.ledger.claim(&ctx, epoch, &mut self.token)
    }

    pub fn sweep_remainder(
        &mut self,
        caller: Address,
        epoch: u64,
        to: Address,
        now: u64,
    ) -> Result<Amount, GovernanceError> {
        let ctx = self.context(caller);
        self.ledger
            .sweep_remainder(&ctx, epoch, to, &mut self.token, now)
    }

    pub fn state(&self, proposal: &Hash, now: u64) -> Result<ProposalState, GovernanceError> {
        self.governor.state(proposal, now)
    }

    pub fn quorum(&self, block: u64) -> Result<Amount, GovernanceError> {
        self.governor.quorum(&self.votes, block)
    }

    /// Events of all three components since the last drain.
    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        let mut events = self.multisig.drain_events();
        events.extend(self.governor.drain_events());
        events.extend(self.ledger.drain_events());
        events
    }

    pub fn addresses(&self) -> &DaoAddresses {
        &self.addresses
    }

    pub fn multisig(&self) -> &MembershipMultisig {
        &self.multisig
    }

    pub fn governor(&self) -> &QuadraticGovernor {
        &self.governor
    }

    pub fn ledger(&self) -> &RewardEpochLedger {
        &self.ledger
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn votes(&self) -> &V {
        &self.votes
    }

    pub fn votes_mut(&mut self) -> &mut V {
        &mut self.votes
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::memory::{CheckpointVotes, MemoryTimelock, MemoryToken, StaticRoles};

    type TestDao = Dao<MemoryToken, CheckpointVotes, MemoryTimelock, StaticRoles>;

    fn dao() -> TestDao {
        let config = GovernanceConfig::default();
        let roles = StaticRoles::new().grant_all(Role::Council, config.multisig.members.clone());
        Dao::new(
            config,
            DaoAddresses::default(),
            MemoryToken::new(),
            CheckpointVotes::new(),
            MemoryTimelock::new(0, 0),
            roles,
            0,
        )
        .unwrap()
    }

    fn proposal_call(description: &str) -> GovernorCall {
        GovernorCall::Propose {
            targets: vec![Address::derive(b"grants")],
            values: vec![Amount::new(5)],
            calldatas: vec![b"fund".to_vec()],
            description: description.to_string(),
        }
    }

    #[test]
    fn test_governor_call_borsh() {
        let call = proposal_call("fund grants");
        let bytes = call.encode().unwrap();
        assert_eq!(GovernorCall::decode(&bytes).unwrap(), call);
        assert!(matches!(
            GovernorCall::decode(&[9, 9, 9]),
            Err(GovernanceError::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_forwarded_payload_creates_proposal() {
        let mut dao = dao();
        let members = GovernanceConfig::default().multisig.members;
        let governor = dao.addresses().governor;
        let payload = proposal_call("fund grants").encode().unwrap();

        dao.sign_and_forward(members[0], governor, Severity::Minor, &payload, 1)
            .unwrap();
        assert_eq!(dao.governor().proposals().count(), 0);

        let outcome = dao
            .sign_and_forward(members[1], governor, Severity::Minor, &payload, 1)
            .unwrap();
        assert!(outcome.forwarded);

        let proposal = dao.governor().proposals().next().unwrap();
        assert_eq!(proposal.proposer, dao.addresses().multisig);
        assert_eq!(proposal.description, "fund grants");
    }

    #[test]
    fn test_undecodable_payload_fails_forwarding() {
        let mut dao = dao();
        let members = GovernanceConfig::default().multisig.members;
        let governor = dao.addresses().governor;

        dao.sign_and_forward(members[0], governor, Severity::Minor, b"junk", 1)
            .unwrap();
        let result = dao.sign_and_forward(members[1], governor, Severity::Minor, b"junk", 1);
        assert!(matches!(result, Err(GovernanceError::ForwardingFailed(_))));

        let hash = MembershipMultisig::request_hash(&governor, Severity::Minor, b"junk");
        assert_eq!(dao.multisig().signature_count(&hash), 1);
    }

    #[test]
    fn test_drain_events_collects_components() {
        let mut dao = dao();
        let members = GovernanceConfig::default().multisig.members;
        let governor = dao.addresses().governor;
        let payload = proposal_call("events").encode().unwrap();
        dao.sign_and_forward(members[0], governor, Severity::Minor, &payload, 1)
            .unwrap();
        dao.sign_and_forward(members[1], governor, Severity::Minor, &payload, 1)
            .unwrap();

        let events = dao.drain_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[3], GovernanceEvent::ProposalCreated { .. }));
        assert!(dao.drain_events().is_empty());
    }
}
