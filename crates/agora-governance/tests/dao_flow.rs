//! End-to-end flows through the assembled DAO: council forwarding, voting,
//! scheduling, and epoch rewards.

use agora_governance::memory::{CheckpointVotes, MemoryTimelock, MemoryToken, StaticRoles};
use agora_governance::{
    Dao, DaoAddresses, GovernanceConfig, GovernanceError, GovernorCall, GovernorConfig,
    MembershipMultisig, ProposalState, Role, Severity, TokenLedger, VoteSupport, VotesError,
};
use agora_types::{Address, Amount, Hash};

type TestDao = Dao<MemoryToken, CheckpointVotes, MemoryTimelock, StaticRoles>;

fn addr(seed: &str) -> Address {
    Address::derive(seed.as_bytes())
}

struct World {
    dao: TestDao,
    council: Vec<Address>,
    treasury: Address,
    guardian: Address,
}

impl World {
    fn new() -> Self {
        Self::with_config(GovernanceConfig::default())
    }

    fn with_config(config: GovernanceConfig) -> Self {
        let council = config.multisig.members.clone();
        let treasury = addr("treasury");
        let guardian = addr("guardian");
        let addresses = DaoAddresses::default();

        let roles = StaticRoles::new()
            .grant_all(Role::Council, council.clone())
            .grant(Role::Treasury, treasury)
            .grant(Role::Canceller, guardian);

        let mut token = MemoryToken::new();
        token.mint(treasury, Amount::new(10_000)).unwrap();
        token.approve(treasury, addresses.ledger, Amount::new(10_000));

        // Supply 521: quorum 20, weights 20 / 10 / 4
        let mut votes = CheckpointVotes::new();
        votes.record_balance(addr("alice"), 0, Amount::new(400)).unwrap();
        votes.record_balance(addr("bob"), 0, Amount::new(100)).unwrap();
        votes.record_balance(addr("carol"), 0, Amount::new(21)).unwrap();

        let dao = Dao::new(
            config,
            addresses,
            token,
            votes,
            MemoryTimelock::new(0, 0),
            roles,
            0,
        )
        .unwrap();

        Self {
            dao,
            council,
            treasury,
            guardian,
        }
    }

    fn governor(&self) -> Address {
        self.dao.addresses().governor
    }

    /// Council passes a payload to the governor with two minor signatures.
    fn forward(&mut self, call: &GovernorCall, now: u64) {
        let payload = call.encode().unwrap();
        let governor = self.governor();
        for member in &self.council[..2] {
            self.dao
                .sign_and_forward(*member, governor, Severity::Minor, &payload, now)
                .unwrap();
        }
    }

    fn propose(&mut self, description: &str, now: u64) -> Hash {
        let before = self.dao.governor().proposals().count();
        self.forward(
            &GovernorCall::Propose {
                targets: vec![addr("grants")],
                values: vec![Amount::new(100)],
                calldatas: vec![description.as_bytes().to_vec()],
                description: description.to_string(),
            },
            now,
        );
        let proposals: Vec<_> = self.dao.governor().proposals().collect();
        assert_eq!(proposals.len(), before + 1);
        proposals[before].id
    }

    fn vote(&mut self, who: &str, id: &Hash, support: VoteSupport, now: u64) -> Result<Amount, GovernanceError> {
        self.dao.cast_vote(addr(who), id, support, now)
    }
}

#[test]
fn minor_threshold_forwards_exactly_once() {
    let mut world = World::new();
    let governor = world.governor();
    let payload = GovernorCall::Propose {
        targets: vec![addr("grants")],
        values: vec![Amount::ZERO],
        calldatas: vec![vec![]],
        description: "threshold".to_string(),
    }
    .encode()
    .unwrap();

    let a = world
        .dao
        .sign_and_forward(world.council[0], governor, Severity::Minor, &payload, 1)
        .unwrap();
    assert_eq!((a.count, a.forwarded), (1, false));
    assert_eq!(world.dao.governor().proposals().count(), 0);

    let b = world
        .dao
        .sign_and_forward(world.council[1], governor, Severity::Minor, &payload, 1)
        .unwrap();
    assert_eq!((b.count, b.forwarded), (2, true));
    assert_eq!(world.dao.governor().proposals().count(), 1);

    let c = world
        .dao
        .sign_and_forward(world.council[2], governor, Severity::Minor, &payload, 1);
    assert_eq!(c, Err(GovernanceError::AlreadyForwarded));
    assert_eq!(world.dao.governor().proposals().count(), 1);
}

#[test]
fn same_payload_under_two_targets_is_independent() {
    let mut world = World::new();
    let governor = world.governor();
    let elsewhere = addr("elsewhere");
    let payload = b"opaque".to_vec();

    world
        .dao
        .sign_and_forward(world.council[0], elsewhere, Severity::Minor, &payload, 1)
        .unwrap();
    world
        .dao
        .sign_and_forward(world.council[0], governor, Severity::Minor, &payload, 1)
        .unwrap();

    let ms = world.dao.multisig();
    let at_elsewhere = MembershipMultisig::request_hash(&elsewhere, Severity::Minor, &payload);
    let at_governor = MembershipMultisig::request_hash(&governor, Severity::Minor, &payload);
    assert_ne!(at_elsewhere, at_governor);
    assert_eq!(ms.signature_count(&at_elsewhere), 1);
    assert_eq!(ms.signature_count(&at_governor), 1);
}

#[test]
fn only_the_multisig_can_propose() {
    let mut world = World::new();
    let id = world.propose("legit", 1);
    assert_eq!(world.dao.governor().proposal(&id).unwrap().proposer, world.dao.addresses().multisig);

    let ctx = world.dao.context(world.council[0]);
    let mut governor = agora_governance::QuadraticGovernor::new(
        addr("other-governor"),
        world.dao.addresses().multisig,
        GovernorConfig::default(),
    )
    .unwrap();
    let direct = governor.propose(
        &ctx,
        vec![addr("grants")],
        vec![Amount::ZERO],
        vec![vec![]],
        "direct".to_string(),
        world.dao.votes_mut(),
        1,
    );
    assert!(matches!(direct, Err(GovernanceError::Unauthorized(_))));
}

#[test]
fn quadratic_votes_resolve_and_execute() {
    let mut world = World::new();
    let id = world.propose("fund grants", 10);

    assert_eq!(world.dao.state(&id, 10), Ok(ProposalState::Pending));
    assert_eq!(world.vote("alice", &id, VoteSupport::For, 11), Ok(Amount::new(20)));
    assert_eq!(world.vote("bob", &id, VoteSupport::Against, 12), Ok(Amount::new(10)));
    assert_eq!(world.vote("carol", &id, VoteSupport::Abstain, 17), Ok(Amount::new(4)));
    assert_eq!(
        world.vote("carol", &id, VoteSupport::For, 17),
        Err(GovernanceError::AlreadyVoted)
    );
    assert_eq!(
        world.vote("dave", &id, VoteSupport::For, 17),
        Err(GovernanceError::NoVotingPower)
    );
    // window [11, 18)
    assert_eq!(
        world.vote("alice", &id, VoteSupport::For, 18),
        Err(GovernanceError::NotActive(ProposalState::Succeeded))
    );

    assert_eq!(world.dao.quorum(10), Ok(Amount::new(20)));
    assert_eq!(world.dao.state(&id, 18), Ok(ProposalState::Succeeded));

    let op = world.dao.queue(&id, 18).unwrap();
    world.dao.execute(&id, 18).unwrap();
    assert_eq!(world.dao.state(&id, 19), Ok(ProposalState::Executed));
    assert_eq!(world.dao.scheduler().executed(), &[op]);

    // every successful vote earned exactly one point
    let ledger = world.dao.ledger();
    assert_eq!(ledger.points_of(0, &addr("alice")), 1);
    assert_eq!(ledger.points_of(0, &addr("bob")), 1);
    assert_eq!(ledger.points_of(0, &addr("carol")), 1);
    assert_eq!(ledger.points_of(0, &addr("dave")), 0);
    assert_eq!(ledger.epoch(0).unwrap().total_points, 3);
}

#[test]
fn council_approvals_gate_execution() {
    let mut config = GovernanceConfig::default();
    config.governor.execution_approvals = 2;
    let mut world = World::with_config(config);

    let id = world.propose("gated", 1);
    world.vote("alice", &id, VoteSupport::For, 2).unwrap();
    world.dao.queue(&id, 9).unwrap();

    assert_eq!(
        world.dao.execute(&id, 9),
        Err(GovernanceError::InsufficientApprovals { have: 0, need: 2 })
    );
    assert!(matches!(
        world.dao.approve_execution(addr("alice"), &id, 9),
        Err(GovernanceError::Unauthorized(_))
    ));

    let (c0, c1) = (world.council[0], world.council[1]);
    world.dao.approve_execution(c0, &id, 9).unwrap();
    assert_eq!(
        world.dao.execute(&id, 9),
        Err(GovernanceError::InsufficientApprovals { have: 1, need: 2 })
    );
    world.dao.approve_execution(c1, &id, 9).unwrap();
    world.dao.execute(&id, 9).unwrap();
    assert_eq!(world.dao.state(&id, 9), Ok(ProposalState::Executed));
}

#[test]
fn cancel_is_idempotent_and_final() {
    let mut world = World::new();
    let id = world.propose("to cancel", 1);
    world.forward(&GovernorCall::Cancel { proposal: id }, 2);
    assert_eq!(world.dao.state(&id, 2), Ok(ProposalState::Canceled));

    // a second cancel, through the guardian, is a no-op
    assert!(world.dao.cancel(world.guardian, &id, 3).is_ok());
    assert!(matches!(
        world.dao.cancel(addr("alice"), &id, 3),
        Err(GovernanceError::Unauthorized(_))
    ));
    assert_eq!(
        world.vote("alice", &id, VoteSupport::For, 3),
        Err(GovernanceError::NotActive(ProposalState::Canceled))
    );

    let executed = world.propose("executed", 1);
    world.vote("alice", &executed, VoteSupport::For, 2).unwrap();
    world.dao.queue(&executed, 9).unwrap();
    world.dao.execute(&executed, 9).unwrap();
    assert_eq!(
        world.dao.cancel(world.guardian, &executed, 10),
        Err(GovernanceError::NotCancellable(ProposalState::Executed))
    );
}

#[test]
fn rewards_split_three_to_one() {
    let mut world = World::new();
    let ids: Vec<Hash> = ["one", "two", "three"]
        .iter()
        .map(|d| world.propose(d, 1))
        .collect();
    for id in &ids {
        world.vote("alice", id, VoteSupport::For, 2).unwrap();
    }
    world.vote("bob", &ids[0], VoteSupport::Against, 2).unwrap();

    let treasury = world.treasury;
    assert_eq!(world.dao.finalise_epoch(treasury, Amount::new(1000), 9), Ok(0));

    assert_eq!(world.dao.claim(addr("alice"), 0), Ok(Amount::new(750)));
    assert_eq!(world.dao.claim(addr("bob"), 0), Ok(Amount::new(250)));
    assert_eq!(world.dao.claim(addr("bob"), 0), Err(GovernanceError::AlreadyClaimed));
    assert_eq!(world.dao.claim(addr("carol"), 0), Err(GovernanceError::NoPoints));
    assert_eq!(world.dao.claim(addr("alice"), 1), Err(GovernanceError::NotFinalised));
    assert_eq!(world.dao.token().balance_of(&addr("alice")), Amount::new(750));
}

#[test]
fn dust_is_recovered_only_by_sweep() {
    let mut world = World::new();
    let a = world.propose("a", 1);
    let b = world.propose("b", 1);
    world.vote("alice", &a, VoteSupport::For, 2).unwrap();
    world.vote("bob", &a, VoteSupport::For, 2).unwrap();
    world.vote("bob", &b, VoteSupport::For, 2).unwrap();

    let treasury = world.treasury;
    let ledger = world.dao.addresses().ledger;
    world.dao.finalise_epoch(treasury, Amount::new(10), 40).unwrap();

    assert_eq!(world.dao.claim(addr("alice"), 0), Ok(Amount::new(3)));
    assert_eq!(world.dao.claim(addr("bob"), 0), Ok(Amount::new(6)));
    assert_eq!(world.dao.token().balance_of(&ledger), Amount::new(1));

    let sink = addr("community-fund");
    assert_eq!(
        world.dao.sweep_remainder(treasury, 0, sink, 89),
        Err(GovernanceError::GraceNotElapsed { ready_at: 90, now: 89 })
    );
    assert!(matches!(
        world.dao.sweep_remainder(addr("alice"), 0, sink, 90),
        Err(GovernanceError::Unauthorized(_))
    ));
    assert_eq!(world.dao.sweep_remainder(treasury, 0, sink, 90), Ok(Amount::new(1)));
    assert_eq!(
        world.dao.sweep_remainder(treasury, 0, sink, 91),
        Err(GovernanceError::NothingToSweep)
    );

    let epoch = world.dao.ledger().epoch(0).unwrap();
    assert_eq!(epoch.claimed_total, epoch.pool);
    assert_eq!(world.dao.token().balance_of(&ledger), Amount::ZERO);
    assert_eq!(world.dao.token().balance_of(&sink), Amount::new(1));
}

#[test]
fn failed_payout_can_be_retried() {
    let mut world = World::new();
    let id = world.propose("payout", 1);
    world.vote("alice", &id, VoteSupport::For, 2).unwrap();
    let treasury = world.treasury;
    world.dao.finalise_epoch(treasury, Amount::new(500), 9).unwrap();

    world.dao.token_mut().set_frozen(true);
    assert!(matches!(
        world.dao.claim(addr("alice"), 0),
        Err(GovernanceError::TransferFailed(_))
    ));
    assert!(!world.dao.ledger().has_claimed(0, &addr("alice")));
    assert_eq!(world.dao.ledger().pending_reward(0, &addr("alice")), Amount::new(500));

    world.dao.token_mut().set_frozen(false);
    assert_eq!(world.dao.claim(addr("alice"), 0), Ok(Amount::new(500)));
}

#[test]
fn unfunded_finalisation_keeps_epoch_open() {
    let mut world = World::new();
    let id = world.propose("unfunded", 1);
    world.vote("alice", &id, VoteSupport::For, 2).unwrap();

    let treasury = world.treasury;
    assert!(matches!(
        world.dao.finalise_epoch(treasury, Amount::new(1_000_000), 9),
        Err(GovernanceError::TransferFailed(_))
    ));
    assert_eq!(world.dao.ledger().current_epoch(), 0);

    // votes after a successful finalisation land in the next epoch
    world.dao.finalise_epoch(treasury, Amount::new(100), 9).unwrap();
    let next = world.propose("next", 10);
    world.vote("bob", &next, VoteSupport::For, 11).unwrap();
    assert_eq!(world.dao.ledger().points_of(1, &addr("bob")), 1);
    assert_eq!(world.dao.ledger().points_of(0, &addr("bob")), 0);
}

#[test]
fn delegation_moves_weight_once() {
    let mut world = World::new();
    world.dao.delegate(addr("carol"), addr("bob"), 0).unwrap();
    assert!(matches!(
        world.dao.delegate(addr("carol"), addr("alice"), 0),
        Err(GovernanceError::VotingPowerUnavailable(_))
    ));

    let id = world.propose("delegated", 1);
    // bob: isqrt(100 + 21) = 11
    assert_eq!(world.vote("bob", &id, VoteSupport::For, 2), Ok(Amount::new(11)));
    assert_eq!(
        world.vote("carol", &id, VoteSupport::For, 2),
        Err(GovernanceError::NoVotingPower)
    );
}

#[test]
fn voting_power_is_fixed_once_proposed() {
    let mut world = World::new();
    let id = world.propose("locked snapshot", 5);
    let mallory = addr("mallory");

    assert_eq!(
        world.dao.votes_mut().record_balance(mallory, 5, Amount::new(1_000_000)),
        Err(VotesError::Sealed { at: 5, sealed: 5 })
    );
    assert!(matches!(
        world.dao.delegate(addr("carol"), addr("bob"), 5),
        Err(GovernanceError::VotingPowerUnavailable(_))
    ));

    // later balances and delegations do not reach back to the snapshot
    world.dao.votes_mut().record_balance(mallory, 6, Amount::new(1_000_000)).unwrap();
    world.dao.delegate(addr("carol"), addr("bob"), 6).unwrap();
    assert_eq!(
        world.vote("mallory", &id, VoteSupport::For, 6),
        Err(GovernanceError::NoVotingPower)
    );
    assert_eq!(world.vote("bob", &id, VoteSupport::For, 6), Ok(Amount::new(10)));
    assert_eq!(world.vote("carol", &id, VoteSupport::For, 6), Ok(Amount::new(4)));
    assert_eq!(
        world.dao.governor().proposal(&id).unwrap().total_supply,
        Amount::new(521)
    );
}
