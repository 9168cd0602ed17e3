//! Quadratic governor.
//!
//! One state machine composed from the weight source ([`QuadraticWeight`]),
//! the counting policy ([`QuorumFraction`] over a [`Tally`]) and the
//! execution gate ([`ExecutionGate`]). Proposal creation is restricted to the
//! multisig forwarding identity. Each successful vote notifies the reward
//! ledger through a [`PointSink`]; if that notification fails the vote fails
//! with it and nothing is recorded.

use std::collections::HashMap;

use agora_types::{Address, Amount, Hash};
use tracing::{debug, info};

use crate::access::{CallerContext, Role};
use crate::collaborators::{ExecutionScheduler, PointSink, VotingPowerSource};
use crate::config::GovernorConfig;
use crate::counting::{QuorumFraction, Tally};
use crate::error::GovernanceError;
use crate::events::GovernanceEvent;
use crate::execution::ExecutionGate;
use crate::proposal::{Proposal, ProposalState};
use crate::voting::{QuadraticWeight, VoteSupport};

#[derive(Debug)]
pub struct QuadraticGovernor {
    /// Identity used when notifying the reward ledger
    address: Address,
    /// The only identity allowed to propose (multisig forwarder)
    proposer: Address,
    config: GovernorConfig,
    weigher: QuadraticWeight,
    quorum: QuorumFraction,
    gate: ExecutionGate,
    proposals: HashMap<Hash, Proposal>,
    /// Creation order
    order: Vec<Hash>,
    events: Vec<GovernanceEvent>,
}

impl QuadraticGovernor {
    pub fn new(
        address: Address,
        proposer: Address,
        config: GovernorConfig,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;

        Ok(Self {
            address,
            proposer,
            weigher: QuadraticWeight::new(config.max_voting_power),
            quorum: QuorumFraction::new(config.quorum_numerator, config.quorum_denominator),
            gate: ExecutionGate::new(config.execution_approvals),
            config,
            proposals: HashMap::new(),
            order: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Create a proposal. Only the multisig forwarding identity may call this.
    ///
    /// Snapshot is `now`, sealed in `votes` once the proposal is accepted;
    /// voting runs over `[now + voting_delay, now + voting_delay + voting_period)`.
    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        &mut self,
        ctx: &CallerContext,
        targets: Vec<Address>,
        values: Vec<Amount>,
        calldatas: Vec<Vec<u8>>,
        description: String,
        votes: &mut dyn VotingPowerSource,
        now: u64,
    ) -> Result<Hash, GovernanceError> {
        if ctx.caller() != self.proposer {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not the proposer",
                ctx.caller()
            )));
        }

        let total_supply = votes.past_total_supply(now)?;
        let proposal = Proposal::new(
            ctx.caller(),
            targets,
            values,
            calldatas,
            description,
            now,
            self.config.voting_delay,
            self.config.voting_period,
            total_supply,
        )?;

        let id = proposal.id;
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::ProposalExists(id));
        }
        votes.seal(proposal.snapshot)?;

        info!(
            proposal = %id.short(),
            vote_start = proposal.vote_start,
            vote_end = proposal.vote_end,
            %total_supply,
            "Proposal created"
        );
        self.events.push(GovernanceEvent::ProposalCreated {
            proposal: id,
            proposer: proposal.proposer,
            snapshot: proposal.snapshot,
            vote_start: proposal.vote_start,
            vote_end: proposal.vote_end,
            description: proposal.description.clone(),
        });
        self.proposals.insert(id, proposal);
        self.order.push(id);

        Ok(id)
    }

    /// Cast a vote with quadratic weight. Returns the weight applied.
    pub fn cast_vote(
        &mut self,
        ctx: &CallerContext,
        id: &Hash,
        support: VoteSupport,
        votes: &dyn VotingPowerSource,
        points: &mut dyn PointSink,
        now: u64,
    ) -> Result<Amount, GovernanceError> {
        let voter = ctx.caller();
        let proposal = self.get(id)?;

        let state = proposal.state(now, self.quorum.quorum_for(proposal.total_supply)?);
        if !state.can_vote() {
            return Err(GovernanceError::NotActive(state));
        }
        if proposal.has_voted(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        let raw = votes.past_votes(&voter, proposal.snapshot)?;
        let weight = self.weigher.weigh(raw)?;
        let tally = proposal.tally.with_vote(support, weight)?;

        // Last fallible step: once the ledger accepted the point, commit.
        let governor = CallerContext::system(self.address, &[Role::Governor]);
        points.add_point(&governor, voter)?;

        self.get_mut(id)?.record_vote(voter, tally);

        debug!(proposal = %id.short(), %voter, ?support, %raw, %weight, "Vote cast");
        self.events.push(GovernanceEvent::VoteCast {
            proposal: *id,
            voter,
            support,
            raw_power: raw,
            weight,
        });

        Ok(weight)
    }

    pub fn state(&self, id: &Hash, now: u64) -> Result<ProposalState, GovernanceError> {
        let proposal = self.get(id)?;
        Ok(proposal.state(now, self.quorum.quorum_for(proposal.total_supply)?))
    }

    /// Quorum at an arbitrary point: a fraction of the total supply there.
    pub fn quorum(&self, votes: &dyn VotingPowerSource, block: u64) -> Result<Amount, GovernanceError> {
        self.quorum.quorum_for(votes.past_total_supply(block)?)
    }

    /// Quorum a proposal is resolved against.
    pub fn proposal_quorum(&self, id: &Hash) -> Result<Amount, GovernanceError> {
        self.quorum.quorum_for(self.get(id)?.total_supply)
    }

    /// Hand a succeeded proposal to the scheduler.
    pub fn queue(
        &mut self,
        id: &Hash,
        scheduler: &mut dyn ExecutionScheduler,
        now: u64,
    ) -> Result<Hash, GovernanceError> {
        let state = self.state(id, now)?;
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::NotSucceeded(state));
        }

        let call = self.get(id)?.scheduled_call();
        let operation = scheduler.queue(&call, now)?;
        self.get_mut(id)?.operation = Some(operation);

        info!(proposal = %id.short(), operation = %operation.short(), "Proposal queued");
        self.events.push(GovernanceEvent::ProposalQueued {
            proposal: *id,
            operation,
        });
        Ok(operation)
    }

    /// Record a council approval on a queued proposal.
    pub fn approve_execution(
        &mut self,
        ctx: &CallerContext,
        id: &Hash,
        now: u64,
    ) -> Result<u32, GovernanceError> {
        ctx.require(Role::Council)?;
        let state = self.state(id, now)?;
        if state != ProposalState::Queued {
            return Err(GovernanceError::NotQueued(state));
        }

        let approver = ctx.caller();
        let proposal = self.get_mut(id)?;
        if !proposal.approvals.insert(approver) {
            return Err(GovernanceError::DuplicateSignature);
        }
        let approvals = u32::try_from(proposal.approvals.len()).unwrap_or(u32::MAX);

        debug!(proposal = %id.short(), %approver, approvals, "Execution approved");
        self.events.push(GovernanceEvent::ExecutionApproved {
            proposal: *id,
            approver,
            approvals,
        });
        Ok(approvals)
    }

    pub fn execute(
        &mut self,
        id: &Hash,
        scheduler: &mut dyn ExecutionScheduler,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let state = self.state(id, now)?;
        if state != ProposalState::Queued {
            return Err(GovernanceError::NotQueued(state));
        }

        let proposal = self.get(id)?;
        self.gate.check(proposal.approvals.len())?;
        let operation = proposal
            .operation
            .ok_or(GovernanceError::NotQueued(state))?;

        scheduler.execute(&operation, now)?;
        self.get_mut(id)?.executed_at = Some(now);

        info!(proposal = %id.short(), "Proposal executed");
        self.events.push(GovernanceEvent::ProposalExecuted { proposal: *id });
        Ok(())
    }

    /// Cancel a proposal. Repeating a cancel is a no-op.
    pub fn cancel(
        &mut self,
        ctx: &CallerContext,
        id: &Hash,
        scheduler: &mut dyn ExecutionScheduler,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let proposal = self.get(id)?;
        if ctx.caller() != proposal.proposer && !ctx.has_role(Role::Canceller) {
            return Err(GovernanceError::Unauthorized(format!(
                "{} may not cancel {}",
                ctx.caller(),
                id.short()
            )));
        }

        let state = self.state(id, now)?;
        match state {
            ProposalState::Canceled => return Ok(()),
            s if s.is_terminal() => return Err(GovernanceError::NotCancellable(s)),
            _ => {}
        }

        if let Some(operation) = self.get(id)?.operation {
            scheduler.cancel(&operation)?;
        }
        self.get_mut(id)?.canceled_at = Some(now);

        info!(proposal = %id.short(), by = %ctx.caller(), "Proposal canceled");
        self.events.push(GovernanceEvent::ProposalCanceled { proposal: *id });
        Ok(())
    }

    pub fn proposal(&self, id: &Hash) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    /// Proposals in creation order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.order.iter().filter_map(|id| self.proposals.get(id))
    }

    pub fn has_voted(&self, id: &Hash, voter: &Address) -> bool {
        self.proposals
            .get(id)
            .is_some_and(|p| p.has_voted(voter))
    }

    pub fn proposal_votes(&self, id: &Hash) -> Result<Tally, GovernanceError> {
        Ok(self.get(id)?.tally)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn proposer(&self) -> Address {
        self.proposer
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }

    fn get(&self, id: &Hash) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(id)
            .ok_or(GovernanceError::UnknownProposal(*id))
    }

    fn get_mut(&mut self, id: &Hash) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(id)
            .ok_or(GovernanceError::UnknownProposal(*id))
    }
}
