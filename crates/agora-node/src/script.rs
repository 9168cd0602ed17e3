//! Operation log format.
//!
//! A script is a JSON array of entries, applied in order:
//!
//! ```json
//! [
//!   { "at": 1, "caller": "0x…", "op": { "type": "vote", "proposal": 0, "support": "for" } }
//! ]
//! ```
//!
//! Proposals can be referenced by creation index or by id.

use std::path::Path;

use agora_governance::{GovernanceError, Severity, TokenError, VoteSupport, VotesError};
use agora_types::{Address, Amount, Hash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One sequenced operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub at: u64,
    pub caller: Address,
    pub op: Operation,
}

/// A proposal, by creation index or id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProposalRef {
    Index(usize),
    Id(Hash),
}

/// Council payload for the governor, in script form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ScriptCall {
    Propose {
        targets: Vec<Address>,
        values: Vec<Amount>,
        /// Hex-encoded call data, one per target
        calldatas: Vec<String>,
        description: String,
    },
    Cancel {
        proposal: ProposalRef,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Mint value tokens
    Mint { to: Address, amount: Amount },
    /// Caller approves `spender`
    Approve { spender: Address, amount: Amount },
    /// Record `account`'s voting balance from `at` on
    Checkpoint { account: Address, amount: Amount },
    /// Caller delegates its votes
    Delegate { to: Address },
    /// Caller signs a governor call as a council member
    Sign {
        #[serde(default)]
        target: Option<Address>,
        severity: Severity,
        call: ScriptCall,
    },
    /// Caller signs raw hex payload bytes for `target`
    SignRaw {
        target: Address,
        severity: Severity,
        payload: String,
    },
    Vote {
        proposal: ProposalRef,
        support: VoteSupport,
    },
    Queue { proposal: ProposalRef },
    ApproveExecution { proposal: ProposalRef },
    Execute { proposal: ProposalRef },
    Cancel { proposal: ProposalRef },
    FinaliseEpoch { pool: Amount },
    Claim { epoch: u64 },
    Sweep { epoch: u64, to: Address },
    /// Freeze or thaw token transfers
    SetFrozen { frozen: bool },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Mint { .. } => "mint",
            Operation::Approve { .. } => "approve",
            Operation::Checkpoint { .. } => "checkpoint",
            Operation::Delegate { .. } => "delegate",
            Operation::Sign { .. } => "sign",
            Operation::SignRaw { .. } => "sign_raw",
            Operation::Vote { .. } => "vote",
            Operation::Queue { .. } => "queue",
            Operation::ApproveExecution { .. } => "approve_execution",
            Operation::Execute { .. } => "execute",
            Operation::Cancel { .. } => "cancel",
            Operation::FinaliseEpoch { .. } => "finalise_epoch",
            Operation::Claim { .. } => "claim",
            Operation::Sweep { .. } => "sweep",
            Operation::SetFrozen { .. } => "set_frozen",
        }
    }
}

/// Why an entry was not applied.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("token: {0}")]
    Token(#[from] TokenError),

    #[error("votes: {0}")]
    Votes(#[from] VotesError),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("no proposal with index {0}")]
    UnknownProposalIndex(usize),

    #[error("entry at {at} precedes previous entry at {last}")]
    ClockWentBack { at: u64, last: u64 },
}

pub fn parse(json: &str) -> anyhow::Result<Vec<ScriptEntry>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load(path: &Path) -> anyhow::Result<Vec<ScriptEntry>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read script '{}': {}", path.display(), e))?;
    parse(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse script '{}': {}", path.display(), e))
}

/// Hex with or without `0x`.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}
