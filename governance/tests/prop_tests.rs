use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

use agora_adapters::Validator;
use agora_governance::{
    Electorate, GovernanceEngine, GovernanceParams, LifecycleConfig, Payload, Proposal,
    ProposalStatus, TallyEngine, VoteOption, VoteRecord, VotingRules,
};
use agora_nullables::{
    MemoryGovernanceStore, NullClock, NullHeightSource, NullStateAdapter, NullUpgradeScheduler,
    NullValidatorSet,
};
use agora_types::{AccountId, ProposalId, Ratio, Timestamp};

fn addr(n: u8) -> AccountId {
    AccountId::new([n; 20])
}

fn voting_proposal(stakes: Vec<(u8, u128)>) -> Proposal {
    let electorate = Electorate::from_validators(
        stakes
            .iter()
            .map(|(n, stake)| Validator {
                address: addr(*n),
                stake: *stake,
            })
            .collect(),
    );
    Proposal {
        id: ProposalId::new(1),
        title: "p".to_string(),
        description: "d".to_string(),
        proposer: addr(1),
        submit_time: Timestamp::new(0),
        submit_height: 1,
        deposit_end: Timestamp::new(100),
        voting_start: Some(Timestamp::new(0)),
        voting_end: Some(Timestamp::new(10)),
        execute_time: None,
        status: ProposalStatus::VotingPeriod,
        total_deposit: 0,
        deposits: BTreeMap::new(),
        votes: BTreeMap::new(),
        tally: None,
        payload: Payload::Text,
        outcome: None,
        electorate: Some(electorate),
        rules: Some(VotingRules {
            quorum: Ratio::ONE_THIRD,
            pass_threshold: Ratio::ONE_HALF,
            veto_threshold: Ratio::ONE_THIRD,
            execution_delay_secs: 5,
        }),
    }
}

fn option_from(raw: u8) -> VoteOption {
    match raw % 4 {
        0 => VoteOption::Yes,
        1 => VoteOption::No,
        2 => VoteOption::Abstain,
        _ => VoteOption::NoWithVeto,
    }
}

proptest! {
    /// total_deposit always equals the sum over the deposit map.
    #[test]
    fn total_deposit_equals_sum(
        amounts in prop::collection::vec((0u8..8, 1u128..1_000_000), 1..40)
    ) {
        let mut p = voting_proposal(vec![(1, 60)]);
        for (n, amount) in &amounts {
            p.credit_deposit(addr(*n), *amount, Timestamp::new(1));
        }
        let sum: u128 = p.deposits.values().map(|d| d.amount).sum();
        prop_assert_eq!(p.total_deposit, sum);
    }

    /// Tally output is identical for any worker count and batch size.
    #[test]
    fn tally_pure_under_worker_and_batch_permutation(
        votes in prop::collection::btree_map(0u8..40, 0u8..4, 0..40),
        stake_seed in 1u128..1_000_000,
        workers in 1u32..8,
        batch in 1u32..50,
    ) {
        let stakes: Vec<(u8, u128)> = (0u8..40)
            .map(|n| (n, (n as u128 + 1) * stake_seed % 1_000_003 + 1))
            .collect();
        let mut p = voting_proposal(stakes);
        for (n, raw) in &votes {
            let voter = addr(*n);
            let weight = p.electorate.as_ref().unwrap().stake_of(&voter).unwrap();
            p.record_vote(voter, VoteRecord {
                option: option_from(*raw),
                weight,
                timestamp: Timestamp::new(3),
            });
        }

        let baseline = TallyEngine::new(1, 1).unwrap();
        let parallel = TallyEngine::new(workers, batch).unwrap();
        let now = Timestamp::new(10);
        let a = baseline.tally(&p, now, None).unwrap();
        let b = parallel.tally(&p, now, None).unwrap();
        prop_assert_eq!(a, b);
    }

    /// The tally verdict agrees with a widened-integer rational model.
    #[test]
    fn tally_verdict_matches_exact_model(
        votes in prop::collection::btree_map(0u8..12, 0u8..4, 0..12),
        stakes in prop::collection::vec(1u128..1_000_000_000, 12),
    ) {
        let stake_list: Vec<(u8, u128)> = stakes
            .iter()
            .enumerate()
            .map(|(i, s)| (i as u8, *s))
            .collect();
        let mut p = voting_proposal(stake_list);
        let total_stake: u128 = stakes.iter().sum();
        let mut yes = 0u128;
        let mut no = 0u128;
        let mut abstain = 0u128;
        let mut veto = 0u128;
        for (n, raw) in &votes {
            let voter = addr(*n);
            let weight = p.electorate.as_ref().unwrap().stake_of(&voter).unwrap();
            let option = option_from(*raw);
            match option {
                VoteOption::Yes => yes += weight,
                VoteOption::No => no += weight,
                VoteOption::Abstain => abstain += weight,
                VoteOption::NoWithVeto => veto += weight,
            }
            p.record_vote(voter, VoteRecord { option, weight, timestamp: Timestamp::new(3) });
        }
        let total = yes + no + abstain + veto;

        let engine = TallyEngine::new(2, 5).unwrap();
        let result = engine.tally(&p, Timestamp::new(10), None).unwrap();

        // Widened model: quorum 1/3 (weak), pass 1/2 (strict), veto 1/3 (strict).
        let quorum = total > 0 && total * 3 >= total_stake;
        let veto_reached = total > 0 && veto * 3 > total;
        let base = yes + no + veto;
        let passed = base > 0 && yes * 2 > base && quorum && !veto_reached;
        prop_assert_eq!(result.total_votes, total);
        prop_assert_eq!(result.quorum_reached, quorum);
        prop_assert_eq!(result.veto_reached, veto_reached);
        prop_assert_eq!(result.passed, passed);
    }

    /// Settlement is exactly-once: at any terminal status the net effect on
    /// a depositor's balance is 0 (refund) or −deposit (burn on veto).
    #[test]
    fn settlement_exactly_once(
        vote_raw in prop::collection::vec(0u8..4, 3),
        deposit in 100u128..500,
        extra_blocks in 1u64..5,
    ) {
        let backend = Arc::new(MemoryGovernanceStore::new());
        let clock = Arc::new(NullClock::new(0));
        let heights = Arc::new(NullHeightSource::new(1));
        let state = Arc::new(NullStateAdapter::new());
        let upgrades = Arc::new(NullUpgradeScheduler::new());
        let validators = Arc::new(NullValidatorSet::from_stakes(&[
            (addr(1), 60),
            (addr(2), 30),
            (addr(3), 10),
        ]));
        state.set_balance(addr(1), 1000);
        let mut params = GovernanceParams::defaults();
        params.min_deposit = 100;
        params.max_deposit_period_secs = 20;
        params.voting_period_secs = 10;
        params.execution_delay_secs = 5;
        let engine = GovernanceEngine::open(
            backend.clone(),
            backend,
            validators,
            state.clone(),
            upgrades,
            clock.clone(),
            heights.clone(),
            params,
            LifecycleConfig::default(),
        ).unwrap();

        let id = engine
            .submit(addr(1), "prop", "settlement", Payload::Text, deposit)
            .unwrap();
        clock.set(5);
        for (i, raw) in vote_raw.iter().enumerate() {
            engine
                .vote(id, addr(i as u8 + 1), option_from(*raw))
                .unwrap();
        }

        // Run well past voting end and execution delay, several blocks.
        for i in 0..(3 + extra_blocks) {
            clock.set(10 + i * 5);
            heights.advance(1);
            engine.on_block().unwrap();
        }

        let p = engine.proposal(id).unwrap();
        prop_assert!(p.status.is_terminal());
        let vetoed = p.tally.as_ref().map(|t| t.veto_reached).unwrap_or(false);
        let expected = if vetoed { 1000 - deposit } else { 1000 };
        prop_assert_eq!(state.balance_of(&addr(1)), expected);
        // Escrow fully drained either way.
        prop_assert_eq!(state.balance_of(&AccountId::DEPOSIT_ESCROW), 0);
    }

    /// Running the lifecycle twice on the same (now, height) is a no-op.
    #[test]
    fn lifecycle_idempotent(
        vote_raw in prop::collection::vec(0u8..4, 3),
        observe_at in 10u64..40,
    ) {
        let backend = Arc::new(MemoryGovernanceStore::new());
        let clock = Arc::new(NullClock::new(0));
        let heights = Arc::new(NullHeightSource::new(1));
        let state = Arc::new(NullStateAdapter::new());
        let upgrades = Arc::new(NullUpgradeScheduler::new());
        let validators = Arc::new(NullValidatorSet::from_stakes(&[
            (addr(1), 60),
            (addr(2), 30),
            (addr(3), 10),
        ]));
        state.set_balance(addr(1), 1000);
        let mut params = GovernanceParams::defaults();
        params.min_deposit = 100;
        params.max_deposit_period_secs = 20;
        params.voting_period_secs = 10;
        params.execution_delay_secs = 5;
        let engine = GovernanceEngine::open(
            backend.clone(),
            backend,
            validators,
            state.clone(),
            upgrades,
            clock.clone(),
            heights,
            params,
            LifecycleConfig::default(),
        ).unwrap();

        let id = engine
            .submit(addr(1), "idem", "run twice", Payload::Text, 100)
            .unwrap();
        clock.set(5);
        for (i, raw) in vote_raw.iter().enumerate() {
            engine
                .vote(id, addr(i as u8 + 1), option_from(*raw))
                .unwrap();
        }

        clock.set(observe_at);
        engine.on_block().unwrap();
        let after_first = engine.proposal(id).unwrap();
        let balance_first = state.balance_of(&addr(1));

        let second = engine.on_block().unwrap();
        prop_assert!(second.is_empty());
        prop_assert_eq!(engine.proposal(id).unwrap(), after_first);
        prop_assert_eq!(state.balance_of(&addr(1)), balance_first);
    }
}
