use proptest::prelude::*;

use agora_governance::memory::MemoryToken;
use agora_governance::{
    integer_sqrt, CallerContext, GovernanceError, PointSink, RewardEpochLedger, RewardsConfig,
    Role, RoleCheck, TokenLedger,
};
use agora_types::{Address, Amount};

struct Roles {
    governor: Address,
    treasury: Address,
}

impl RoleCheck for Roles {
    fn has_role(&self, role: Role, account: &Address) -> bool {
        match role {
            Role::Governor => *account == self.governor,
            Role::Treasury => *account == self.treasury,
            _ => false,
        }
    }
}

fn voter(i: usize) -> Address {
    Address::derive(format!("voter-{}", i).as_bytes())
}

proptest! {
    /// isqrt(n)^2 <= n < (isqrt(n) + 1)^2 over the whole u128 range.
    #[test]
    fn isqrt_brackets_the_root(n in any::<u128>()) {
        let r = integer_sqrt(n);
        prop_assert!(r.checked_mul(r).is_some_and(|sq| sq <= n));
        if let Some(next) = (r + 1).checked_mul(r + 1) {
            prop_assert!(n < next);
        }
    }

    /// Claims never exceed the pool, and a sweep recovers exactly the rest.
    #[test]
    fn claims_plus_sweep_equal_pool(
        pool in 0u128..1_000_000_000,
        points in prop::collection::vec(1u64..20, 1..8),
        claimers in prop::collection::vec(any::<bool>(), 8),
    ) {
        let roles = Roles {
            governor: Address::derive(b"governor"),
            treasury: Address::derive(b"treasury"),
        };
        let custody = Address::derive(b"ledger");
        let mut ledger = RewardEpochLedger::new(custody, RewardsConfig::default(), 0);
        let mut token = MemoryToken::new();
        token.mint(roles.treasury, Amount::new(pool)).unwrap();
        token.approve(roles.treasury, custody, Amount::new(pool));

        let governor = CallerContext::verify(roles.governor, &roles);
        for (i, n) in points.iter().enumerate() {
            for _ in 0..*n {
                ledger.add_point(&governor, voter(i)).unwrap();
            }
        }

        let treasury = CallerContext::verify(roles.treasury, &roles);
        ledger.finalise_epoch(&treasury, Amount::new(pool), &mut token, 1).unwrap();

        let mut claimed = 0u128;
        for i in 0..points.len() {
            if claimers[i] {
                let ctx = CallerContext::verify(voter(i), &roles);
                claimed += ledger.claim(&ctx, 0, &mut token).unwrap().raw();
            }
        }
        prop_assert!(claimed <= pool);

        let sink = Address::derive(b"sink");
        let swept = match ledger.sweep_remainder(&treasury, 0, sink, &mut token, 1_000) {
            Ok(amount) => amount.raw(),
            Err(GovernanceError::NothingToSweep) => 0,
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };
        prop_assert_eq!(claimed + swept, pool);
        prop_assert_eq!(token.balance_of(&custody), Amount::ZERO);
    }
}
