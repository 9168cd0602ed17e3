//! Applies an operation log to an in-memory DAO.
//!
//! The log is the sequencer: entries run one at a time, in order, and their
//! `at` values are the clock. A rejected entry is recorded with its reason
//! and leaves the DAO untouched; the run continues with the next entry.

use std::io::Write;

use agora_governance::memory::{CheckpointVotes, MemoryTimelock, MemoryToken, StaticRoles};
use agora_governance::{Dao, GovernanceEvent, GovernorCall, Role, SignOutcome, TokenLedger};
use agora_types::{Address, Hash};
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::script::{decode_hex, Operation, ProposalRef, ScriptCall, ScriptEntry, ScriptError};

pub type NodeDao = Dao<MemoryToken, CheckpointVotes, MemoryTimelock, StaticRoles>;

/// Result of one entry.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub index: usize,
    pub at: u64,
    pub caller: Address,
    pub op: &'static str,
    pub result: Result<String, ScriptError>,
    pub events: Vec<GovernanceEvent>,
}

pub struct Runner {
    dao: NodeDao,
    last_at: Option<u64>,
    outcomes: Vec<Outcome>,
}

impl Runner {
    /// Build the DAO and its collaborators from genesis.
    pub fn new(config: &NodeConfig) -> anyhow::Result<Self> {
        let genesis = &config.genesis;
        let addresses = config.addresses;

        let mut token = match genesis.token_cap {
            Some(cap) => MemoryToken::with_cap(cap),
            None => MemoryToken::new(),
        };
        token.mint(genesis.treasury, genesis.treasury_funds)?;
        token.approve(genesis.treasury, addresses.ledger, genesis.treasury_funds);

        let mut votes = CheckpointVotes::new();
        for balance in &genesis.balances {
            token.mint(balance.account, balance.amount)?;
            votes.record_balance(balance.account, 0, balance.amount)?;
        }

        let roles = StaticRoles::new()
            .grant_all(Role::Council, config.governance.multisig.members.iter().copied())
            .grant(Role::Treasury, genesis.treasury)
            .grant_all(Role::Canceller, genesis.cancellers.iter().copied());

        let dao = Dao::new(
            config.governance.clone(),
            addresses,
            token,
            votes,
            MemoryTimelock::new(genesis.timelock_delay, genesis.timelock_grace),
            roles,
            0,
        )?;

        info!(
            council = config.governance.multisig.members.len(),
            holders = genesis.balances.len(),
            treasury = %genesis.treasury,
            "DAO assembled"
        );

        Ok(Self {
            dao,
            last_at: None,
            outcomes: Vec::new(),
        })
    }

    pub fn run(&mut self, entries: &[ScriptEntry]) -> &[Outcome] {
        for entry in entries {
            self.apply(entry);
        }
        &self.outcomes
    }

    pub fn apply(&mut self, entry: &ScriptEntry) -> &Outcome {
        let index = self.outcomes.len();
        let op = entry.op.name();

        let result = self
            .advance_clock(entry.at)
            .and_then(|()| self.dispatch(entry));
        let events = self.dao.drain_events();

        match &result {
            Ok(detail) => info!(index, at = entry.at, op, %detail, "Applied"),
            Err(e) => warn!(index, at = entry.at, op, error = %e, "Rejected"),
        }
        for event in &events {
            if let Ok(json) = serde_json::to_string(event) {
                debug!(index, event = %json, "Event");
            }
        }

        self.outcomes.push(Outcome {
            index,
            at: entry.at,
            caller: entry.caller,
            op,
            result,
            events,
        });
        &self.outcomes[index]
    }

    fn advance_clock(&mut self, at: u64) -> Result<(), ScriptError> {
        match self.last_at {
            Some(last) if at < last => Err(ScriptError::ClockWentBack { at, last }),
            _ => {
                self.last_at = Some(at);
                Ok(())
            }
        }
    }

    fn dispatch(&mut self, entry: &ScriptEntry) -> Result<String, ScriptError> {
        let (at, caller) = (entry.at, entry.caller);

        match &entry.op {
            Operation::Mint { to, amount } => {
                self.dao.token_mut().mint(*to, *amount)?;
                Ok(format!("minted {} to {}", amount, to))
            }
            Operation::Approve { spender, amount } => {
                self.dao.token_mut().approve(caller, *spender, *amount);
                Ok(format!("allowance of {} set to {}", spender, amount))
            }
            Operation::Checkpoint { account, amount } => {
                self.dao.votes_mut().record_balance(*account, at, *amount)?;
                Ok(format!("{} holds {} from {}", account, amount, at))
            }
            Operation::Delegate { to } => {
                self.dao.delegate(caller, *to, at)?;
                Ok(format!("delegated to {}", to))
            }
            Operation::Sign {
                target,
                severity,
                call,
            } => {
                let target = target.unwrap_or(self.dao.addresses().governor);
                let payload = self.encode_call(call)?;
                let outcome = self
                    .dao
                    .sign_and_forward(caller, target, *severity, &payload, at)?;
                Ok(describe_signature(&outcome))
            }
            Operation::SignRaw {
                target,
                severity,
                payload,
            } => {
                let payload = decode_hex(payload)?;
                let outcome = self
                    .dao
                    .sign_and_forward(caller, *target, *severity, &payload, at)?;
                Ok(describe_signature(&outcome))
            }
            Operation::Vote { proposal, support } => {
                let id = self.resolve(proposal)?;
                let weight = self.dao.cast_vote(caller, &id, *support, at)?;
                Ok(format!("{:?} with weight {} on {}", support, weight, id.short()))
            }
            Operation::Queue { proposal } => {
                let id = self.resolve(proposal)?;
                let operation = self.dao.queue(&id, at)?;
                Ok(format!("queued as {}", operation.short()))
            }
            Operation::ApproveExecution { proposal } => {
                let id = self.resolve(proposal)?;
                let approvals = self.dao.approve_execution(caller, &id, at)?;
                Ok(format!("{} approvals", approvals))
            }
            Operation::Execute { proposal } => {
                let id = self.resolve(proposal)?;
                self.dao.execute(&id, at)?;
                Ok(format!("executed {}", id.short()))
            }
            Operation::Cancel { proposal } => {
                let id = self.resolve(proposal)?;
                self.dao.cancel(caller, &id, at)?;
                Ok(format!("canceled {}", id.short()))
            }
            Operation::FinaliseEpoch { pool } => {
                let epoch = self.dao.finalise_epoch(caller, *pool, at)?;
                Ok(format!("epoch {} finalised with pool {}", epoch, pool))
            }
            Operation::Claim { epoch } => {
                let amount = self.dao.claim(caller, *epoch)?;
                Ok(format!("claimed {} from epoch {}", amount, epoch))
            }
            Operation::Sweep { epoch, to } => {
                let amount = self.dao.sweep_remainder(caller, *epoch, *to, at)?;
                Ok(format!("swept {} from epoch {} to {}", amount, epoch, to))
            }
            Operation::SetFrozen { frozen } => {
                self.dao.token_mut().set_frozen(*frozen);
                Ok(if *frozen { "token frozen" } else { "token thawed" }.to_string())
            }
        }
    }

    fn encode_call(&self, call: &ScriptCall) -> Result<Vec<u8>, ScriptError> {
        let call = match call {
            ScriptCall::Propose {
                targets,
                values,
                calldatas,
                description,
            } => GovernorCall::Propose {
                targets: targets.clone(),
                values: values.clone(),
                calldatas: calldatas
                    .iter()
                    .map(|data| decode_hex(data))
                    .collect::<Result<_, _>>()?,
                description: description.clone(),
            },
            ScriptCall::Cancel { proposal } => GovernorCall::Cancel {
                proposal: self.resolve(proposal)?,
            },
        };
        Ok(call.encode()?)
    }

    fn resolve(&self, proposal: &ProposalRef) -> Result<Hash, ScriptError> {
        match proposal {
            ProposalRef::Id(id) => Ok(*id),
            ProposalRef::Index(i) => self
                .dao
                .governor()
                .proposals()
                .nth(*i)
                .map(|p| p.id)
                .ok_or(ScriptError::UnknownProposalIndex(*i)),
        }
    }

    pub fn dao(&self) -> &NodeDao {
        &self.dao
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Outcome table, then final proposal and epoch state.
    pub fn write_summary(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "{:>4}  {:>6}  {:<18}  {:<6}  {:>6}  detail", "#", "at", "op", "result", "events")?;
        for o in &self.outcomes {
            let (status, detail) = match &o.result {
                Ok(detail) => ("ok", detail.clone()),
                Err(e) => ("err", e.to_string()),
            };
            writeln!(
                out,
                "{:>4}  {:>6}  {:<18}  {:<6}  {:>6}  {}",
                o.index,
                o.at,
                o.op,
                status,
                o.events.len(),
                detail
            )?;
        }

        let now = self.last_at.unwrap_or(0);
        writeln!(out)?;
        writeln!(out, "proposals at {}:", now)?;
        for (i, p) in self.dao.governor().proposals().enumerate() {
            let state = self
                .dao
                .state(&p.id, now)
                .map(|s| format!("{:?}", s))
                .unwrap_or_else(|e| e.to_string());
            writeln!(
                out,
                "{:>4}  {}  {:<10}  for {}  against {}  abstain {}  voters {}  \"{}\"",
                i,
                p.id.short(),
                state,
                p.tally.for_votes,
                p.tally.against_votes,
                p.tally.abstain_votes,
                p.voter_count(),
                p.description
            )?;
        }

        writeln!(out)?;
        writeln!(out, "epochs:")?;
        let token = self.dao.token();
        for e in self.dao.ledger().epochs() {
            writeln!(
                out,
                "{:>4}  {:<9}  pool {}  points {}  voters {}  settled {}  swept {}",
                e.id,
                format!("{:?}", e.status()),
                e.pool,
                e.total_points,
                e.voters(),
                e.claimed_total,
                e.swept
            )?;
        }
        writeln!(
            out,
            "ledger custody holds {}",
            token.balance_of(&self.dao.addresses().ledger)
        )?;

        Ok(())
    }
}

fn describe_signature(outcome: &SignOutcome) -> String {
    if outcome.forwarded {
        format!("request {} forwarded after {} signatures", outcome.request.short(), outcome.count)
    } else {
        format!("request {} has {} signatures", outcome.request.short(), outcome.count)
    }
}
