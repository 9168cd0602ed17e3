//! Caller capabilities.
//!
//! Operations never consult a global role table. The caller's verified role
//! membership travels with the call as a [`CallerContext`], built once from a
//! [`RoleCheck`] collaborator at the edge.

use std::collections::BTreeSet;
use std::fmt;

use agora_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Capabilities the core gates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Council member: may approve execution of queued proposals.
    Council,
    /// Funds and sweeps reward epochs.
    Treasury,
    /// May cancel any non-terminal proposal.
    Canceller,
    /// May notify the reward ledger of participation.
    Governor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Council, Role::Treasury, Role::Canceller, Role::Governor];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Council => "council",
            Role::Treasury => "treasury",
            Role::Canceller => "canceller",
            Role::Governor => "governor",
        };
        f.write_str(name)
    }
}

/// External role/capability lookup (`hasRole`).
pub trait RoleCheck {
    fn has_role(&self, role: Role, account: &Address) -> bool;
}

/// Verified caller identity plus the roles it held when the call entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    caller: Address,
    roles: BTreeSet<Role>,
}

impl CallerContext {
    /// Resolve every role of `caller` through `roles`.
    pub fn verify(caller: Address, roles: &dyn RoleCheck) -> Self {
        let roles = Role::ALL
            .iter()
            .copied()
            .filter(|role| roles.has_role(*role, &caller))
            .collect();
        Self { caller, roles }
    }

    /// Context for a call made by a component of this crate on its own
    /// behalf (governor → ledger, multisig → governor).
    pub(crate) fn system(caller: Address, roles: &[Role]) -> Self {
        Self {
            caller,
            roles: roles.iter().copied().collect(),
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    pub fn require(&self, role: Role) -> Result<(), GovernanceError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(GovernanceError::Unauthorized(format!(
                "{} lacks role {}",
                self.caller, role
            )))
        }
    }
}
