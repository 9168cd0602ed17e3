//! Execution gate: council approvals required before a queued proposal runs.

use crate::error::GovernanceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionGate {
    required_approvals: u32,
}

impl ExecutionGate {
    pub fn new(required_approvals: u32) -> Self {
        Self { required_approvals }
    }

    /// Zero required approvals means the policy does not gate execution.
    pub fn check(&self, approvals: usize) -> Result<(), GovernanceError> {
        let have = u32::try_from(approvals).unwrap_or(u32::MAX);
        if have < self.required_approvals {
            return Err(GovernanceError::InsufficientApprovals {
                have,
                need: self.required_approvals,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate() {
        assert!(ExecutionGate::new(0).check(0).is_ok());
        assert_eq!(
            ExecutionGate::new(2).check(1),
            Err(GovernanceError::InsufficientApprovals { have: 1, need: 2 })
        );
        assert!(ExecutionGate::new(2).check(2).is_ok());
    }
}
