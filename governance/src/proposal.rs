//! Proposals, votes, deposits, and tally results.

use agora_adapters::Validator;
use agora_types::{AccountId, ProposalId, Ratio, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::GovernanceError;
use crate::params::GovernanceParams;

/// Maximum title length in Unicode code points.
pub const MAX_TITLE_CHARS: usize = 256;

/// Maximum description length in Unicode code points.
pub const MAX_DESCRIPTION_CHARS: usize = 10_000;

/// Lifecycle status of a proposal.
///
/// Transitions follow a DAG with no backward edges; the only exception is
/// `Passed → Failed` when execution errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Collecting deposits toward `min_deposit`.
    DepositPeriod,
    /// Votes are being accepted.
    VotingPeriod,
    /// Tally passed; waiting out the execution delay.
    Passed,
    /// Tally failed quorum, threshold, or was vetoed. Terminal.
    Rejected,
    /// Deposit window expired below minimum, or execution errored. Terminal.
    Failed,
    /// Payload applied to chain state. Terminal.
    Executed,
}

impl ProposalStatus {
    /// Stable one-byte tag used by the status secondary index.
    pub fn tag(&self) -> u8 {
        match self {
            Self::DepositPeriod => 0,
            Self::VotingPeriod => 1,
            Self::Passed => 2,
            Self::Rejected => 3,
            Self::Failed => 4,
            Self::Executed => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::DepositPeriod),
            1 => Some(Self::VotingPeriod),
            2 => Some(Self::Passed),
            3 => Some(Self::Rejected),
            4 => Some(Self::Failed),
            5 => Some(Self::Executed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Failed | Self::Executed)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DepositPeriod => "deposit_period",
            Self::VotingPeriod => "voting_period",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Executed => "executed",
        };
        write!(f, "{s}")
    }
}

/// A vote option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
    NoWithVeto,
}

impl VoteOption {
    /// Parse from a wire index. This is the fallible boundary where an
    /// out-of-range option surfaces as `InvalidOption`.
    pub fn from_index(index: u8) -> Result<Self, GovernanceError> {
        match index {
            0 => Ok(Self::Yes),
            1 => Ok(Self::No),
            2 => Ok(Self::Abstain),
            3 => Ok(Self::NoWithVeto),
            other => Err(GovernanceError::InvalidOption(other)),
        }
    }

    pub fn index(&self) -> u8 {
        match self {
            Self::Yes => 0,
            Self::No => 1,
            Self::Abstain => 2,
            Self::NoWithVeto => 3,
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Abstain => "abstain",
            Self::NoWithVeto => "no_with_veto",
        };
        write!(f, "{s}")
    }
}

/// One voter's recorded vote. At most one per voter per proposal; a re-vote
/// while voting is open replaces the previous record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub option: VoteOption,
    /// Stake weight copied from the frozen electorate.
    pub weight: u128,
    pub timestamp: Timestamp,
}

/// Cumulative deposit by one depositor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub depositor: AccountId,
    pub amount: u128,
    /// Time of the most recent top-up.
    pub timestamp: Timestamp,
}

/// One `(subspace, key, value)` triple of a parameter-change payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamChange {
    pub subspace: String,
    pub key: String,
    pub value: String,
}

/// The kind-tagged body of a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Signalling proposal with no on-chain effect.
    Text,
    /// Atomically update governance parameters.
    ParameterChange { changes: Vec<ParamChange> },
    /// Register a binary upgrade with the upgrade scheduler.
    SoftwareUpgrade {
        name: String,
        height: u64,
        info: String,
    },
    /// Transfer from the community pool to a recipient.
    CommunityPoolSpend { recipient: AccountId, amount: u128 },
}

/// Proposal kind, derived from the payload variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    Text,
    ParameterChange,
    SoftwareUpgrade,
    CommunityPoolSpend,
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::ParameterChange => "parameter_change",
            Self::SoftwareUpgrade => "software_upgrade",
            Self::CommunityPoolSpend => "community_pool_spend",
        };
        write!(f, "{s}")
    }
}

impl Payload {
    pub fn kind(&self) -> ProposalKind {
        match self {
            Self::Text => ProposalKind::Text,
            Self::ParameterChange { .. } => ProposalKind::ParameterChange,
            Self::SoftwareUpgrade { .. } => ProposalKind::SoftwareUpgrade,
            Self::CommunityPoolSpend { .. } => ProposalKind::CommunityPoolSpend,
        }
    }

    /// Structural validation at submit time. Value-level checks that depend
    /// on chain state (pool balance, current height) happen at execution.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        match self {
            Self::Text => Ok(()),
            Self::ParameterChange { changes } => {
                if changes.is_empty() {
                    return Err(GovernanceError::InvalidProposal(
                        "parameter change with no changes".to_string(),
                    ));
                }
                Ok(())
            }
            Self::SoftwareUpgrade { name, .. } => {
                if name.is_empty() {
                    return Err(GovernanceError::InvalidProposal(
                        "upgrade name must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::CommunityPoolSpend { recipient, amount } => {
                if *amount == 0 {
                    return Err(GovernanceError::InvalidProposal(
                        "spend amount must be positive".to_string(),
                    ));
                }
                if recipient.is_zero() || recipient.is_module_account() {
                    return Err(GovernanceError::InvalidProposal(format!(
                        "invalid spend recipient {recipient}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// The eligibility set and stake weights frozen at `voting_start`.
///
/// Captured from the validator set adapter exactly once per proposal; the
/// live set is never consulted again for this proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Electorate {
    pub total_stake: u128,
    pub stakes: BTreeMap<AccountId, u128>,
}

impl Electorate {
    pub fn from_validators(validators: Vec<Validator>) -> Self {
        let mut stakes = BTreeMap::new();
        let mut total_stake: u128 = 0;
        for v in validators {
            total_stake = total_stake.saturating_add(v.stake);
            stakes.insert(v.address, v.stake);
        }
        Self { total_stake, stakes }
    }

    pub fn stake_of(&self, address: &AccountId) -> Option<u128> {
        self.stakes.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }
}

/// Voting rules sampled from the parameter store at activation.
///
/// A later parameter change never retroactively affects a proposal that is
/// already voting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingRules {
    pub quorum: Ratio,
    pub pass_threshold: Ratio,
    pub veto_threshold: Ratio,
    pub execution_delay_secs: u64,
}

impl VotingRules {
    pub fn sample(params: &GovernanceParams) -> Self {
        Self {
            quorum: params.quorum,
            pass_threshold: params.pass_threshold,
            veto_threshold: params.veto_threshold,
            execution_delay_secs: params.execution_delay_secs,
        }
    }
}

/// Deterministic tally of a proposal's votes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    /// Total stake that voted, all options included.
    pub total_votes: u128,
    pub yes: u128,
    pub no: u128,
    pub abstain: u128,
    pub veto: u128,
    pub quorum_reached: bool,
    pub veto_reached: bool,
    pub passed: bool,
    pub computed_at: Timestamp,
}

/// A governance proposal.
///
/// Owned exclusively by the proposal store; every other component sees
/// borrowed references or clones valid for one invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub proposer: AccountId,
    pub submit_time: Timestamp,
    pub submit_height: u64,
    /// Absolute end of the deposit window.
    pub deposit_end: Timestamp,
    /// Set when the proposal enters the voting period.
    pub voting_start: Option<Timestamp>,
    pub voting_end: Option<Timestamp>,
    /// Set when the proposal passes: `voting_end + execution_delay`.
    pub execute_time: Option<Timestamp>,
    pub status: ProposalStatus,
    /// Derived aggregate: always equals the sum over `deposits`.
    pub total_deposit: u128,
    pub deposits: BTreeMap<AccountId, Deposit>,
    pub votes: BTreeMap<AccountId, VoteRecord>,
    /// Cached tally, invalidated on any vote mutation. Not persisted.
    pub tally: Option<TallyResult>,
    pub payload: Payload,
    /// Error string, set only for `Failed` and errored executions.
    pub outcome: Option<String>,
    /// Frozen at activation; `None` during the deposit period.
    pub electorate: Option<Electorate>,
    /// Sampled at activation; `None` during the deposit period.
    pub rules: Option<VotingRules>,
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        self.payload.kind()
    }

    /// Validate title and description bounds and the payload structure.
    pub fn validate_content(
        title: &str,
        description: &str,
        payload: &Payload,
    ) -> Result<(), GovernanceError> {
        if title.is_empty() {
            return Err(GovernanceError::InvalidProposal(
                "title must not be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(GovernanceError::InvalidProposal(format!(
                "title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(GovernanceError::InvalidProposal(format!(
                "description exceeds {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        payload.validate()
    }

    /// Record a cumulative deposit. Caller has already checked the phase
    /// and window; this only maintains the map and the derived total.
    pub fn credit_deposit(&mut self, depositor: AccountId, amount: u128, now: Timestamp) {
        let entry = self.deposits.entry(depositor).or_insert(Deposit {
            depositor,
            amount: 0,
            timestamp: now,
        });
        entry.amount = entry.amount.saturating_add(amount);
        entry.timestamp = now;
        self.total_deposit = self.total_deposit.saturating_add(amount);
    }

    /// Record (or replace) a vote and invalidate the cached tally.
    pub fn record_vote(&mut self, voter: AccountId, record: VoteRecord) {
        self.votes.insert(voter, record);
        self.tally = None;
    }

    /// Earliest time at which this proposal may be archived: one sampled
    /// voting period after its terminal boundary.
    pub fn retention_deadline(&self, voting_period_secs: u64) -> Option<Timestamp> {
        if !self.status.is_terminal() {
            return None;
        }
        let boundary = match self.status {
            ProposalStatus::Failed if self.voting_end.is_none() => self.deposit_end,
            _ => self
                .execute_time
                .or(self.voting_end)
                .unwrap_or(self.deposit_end),
        };
        Some(boundary.saturating_add_secs(voting_period_secs))
    }
}

/// The durable encoding of a proposal: every scalar field plus the
/// length-prefixed payload bytes. Votes and deposits live in their own
/// records and `total_deposit` is recomputed on load, so neither is
/// embedded here.
#[derive(Serialize, Deserialize)]
struct ProposalRecord {
    id: ProposalId,
    title: String,
    description: String,
    proposer: AccountId,
    submit_time: Timestamp,
    submit_height: u64,
    deposit_end: Timestamp,
    voting_start: Option<Timestamp>,
    voting_end: Option<Timestamp>,
    execute_time: Option<Timestamp>,
    status: ProposalStatus,
    outcome: Option<String>,
    electorate: Option<Electorate>,
    rules: Option<VotingRules>,
    payload: Vec<u8>,
}

impl Proposal {
    /// Encode the scalar record for the `proposals/{id}` slot.
    pub fn to_record_bytes(&self) -> Result<Vec<u8>, GovernanceError> {
        let payload = bincode::serialize(&self.payload)
            .map_err(|e| GovernanceError::Other(format!("payload encode: {e}")))?;
        let record = ProposalRecord {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            proposer: self.proposer,
            submit_time: self.submit_time,
            submit_height: self.submit_height,
            deposit_end: self.deposit_end,
            voting_start: self.voting_start,
            voting_end: self.voting_end,
            execute_time: self.execute_time,
            status: self.status,
            outcome: self.outcome.clone(),
            electorate: self.electorate.clone(),
            rules: self.rules.clone(),
            payload,
        };
        bincode::serialize(&record)
            .map_err(|e| GovernanceError::Other(format!("proposal encode: {e}")))
    }

    /// Reassemble a proposal from its record and the separately stored
    /// vote and deposit records.
    pub fn from_parts(
        record_bytes: &[u8],
        votes: Vec<(AccountId, Vec<u8>)>,
        deposits: Vec<(AccountId, Vec<u8>)>,
    ) -> Result<Self, GovernanceError> {
        let record: ProposalRecord = bincode::deserialize(record_bytes)
            .map_err(|e| GovernanceError::Other(format!("proposal decode: {e}")))?;
        let payload: Payload = bincode::deserialize(&record.payload)
            .map_err(|e| GovernanceError::Other(format!("payload decode: {e}")))?;

        let mut vote_map = BTreeMap::new();
        for (voter, bytes) in votes {
            let vote: VoteRecord = bincode::deserialize(&bytes)
                .map_err(|e| GovernanceError::Other(format!("vote decode: {e}")))?;
            vote_map.insert(voter, vote);
        }

        let mut deposit_map = BTreeMap::new();
        let mut total_deposit: u128 = 0;
        for (depositor, bytes) in deposits {
            let deposit: Deposit = bincode::deserialize(&bytes)
                .map_err(|e| GovernanceError::Other(format!("deposit decode: {e}")))?;
            total_deposit = total_deposit.saturating_add(deposit.amount);
            deposit_map.insert(depositor, deposit);
        }

        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            proposer: record.proposer,
            submit_time: record.submit_time,
            submit_height: record.submit_height,
            deposit_end: record.deposit_end,
            voting_start: record.voting_start,
            voting_end: record.voting_end,
            execute_time: record.execute_time,
            status: record.status,
            total_deposit,
            deposits: deposit_map,
            votes: vote_map,
            tally: None,
            payload,
            outcome: record.outcome,
            electorate: record.electorate,
            rules: record.rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> AccountId {
        AccountId::new([n; 20])
    }

    fn text_proposal(id: u64) -> Proposal {
        Proposal {
            id: ProposalId::new(id),
            title: "signal".to_string(),
            description: "a text proposal".to_string(),
            proposer: addr(1),
            submit_time: Timestamp::new(0),
            submit_height: 1,
            deposit_end: Timestamp::new(100),
            voting_start: None,
            voting_end: None,
            execute_time: None,
            status: ProposalStatus::DepositPeriod,
            total_deposit: 0,
            deposits: BTreeMap::new(),
            votes: BTreeMap::new(),
            tally: None,
            payload: Payload::Text,
            outcome: None,
            electorate: None,
            rules: None,
        }
    }

    #[test]
    fn test_status_tags_roundtrip() {
        for status in [
            ProposalStatus::DepositPeriod,
            ProposalStatus::VotingPeriod,
            ProposalStatus::Passed,
            ProposalStatus::Rejected,
            ProposalStatus::Failed,
            ProposalStatus::Executed,
        ] {
            assert_eq!(ProposalStatus::from_tag(status.tag()), Some(status));
        }
        assert_eq!(ProposalStatus::from_tag(99), None);
    }

    #[test]
    fn test_vote_option_from_index() {
        assert_eq!(VoteOption::from_index(0).unwrap(), VoteOption::Yes);
        assert_eq!(VoteOption::from_index(3).unwrap(), VoteOption::NoWithVeto);
        assert!(matches!(
            VoteOption::from_index(4),
            Err(GovernanceError::InvalidOption(4))
        ));
    }

    #[test]
    fn test_content_bounds() {
        assert!(Proposal::validate_content("t", "d", &Payload::Text).is_ok());
        assert!(Proposal::validate_content("", "d", &Payload::Text).is_err());
        let long_title = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(Proposal::validate_content(&long_title, "d", &Payload::Text).is_err());
        let long_desc = "x".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(Proposal::validate_content("t", &long_desc, &Payload::Text).is_err());
    }

    #[test]
    fn test_payload_validation() {
        assert!(Payload::ParameterChange { changes: vec![] }.validate().is_err());
        assert!(Payload::CommunityPoolSpend {
            recipient: AccountId::ZERO,
            amount: 5,
        }
        .validate()
        .is_err());
        assert!(Payload::CommunityPoolSpend {
            recipient: addr(9),
            amount: 0,
        }
        .validate()
        .is_err());
        assert!(Payload::SoftwareUpgrade {
            name: String::new(),
            height: 10,
            info: String::new(),
        }
        .validate()
        .is_err());
        assert!(Payload::CommunityPoolSpend {
            recipient: addr(9),
            amount: 5,
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_credit_deposit_accumulates() {
        let mut p = text_proposal(1);
        p.credit_deposit(addr(2), 40, Timestamp::new(1));
        p.credit_deposit(addr(2), 10, Timestamp::new(2));
        p.credit_deposit(addr(3), 5, Timestamp::new(3));
        assert_eq!(p.total_deposit, 55);
        assert_eq!(p.deposits.len(), 2);
        assert_eq!(p.deposits[&addr(2)].amount, 50);
        assert_eq!(p.deposits[&addr(2)].timestamp, Timestamp::new(2));
    }

    #[test]
    fn test_record_vote_invalidates_tally() {
        let mut p = text_proposal(1);
        p.tally = Some(TallyResult {
            total_votes: 1,
            yes: 1,
            no: 0,
            abstain: 0,
            veto: 0,
            quorum_reached: true,
            veto_reached: false,
            passed: true,
            computed_at: Timestamp::new(5),
        });
        p.record_vote(
            addr(2),
            VoteRecord {
                option: VoteOption::No,
                weight: 10,
                timestamp: Timestamp::new(6),
            },
        );
        assert!(p.tally.is_none());
    }

    #[test]
    fn test_record_roundtrip_preserves_fields() {
        let mut p = text_proposal(7);
        p.status = ProposalStatus::VotingPeriod;
        p.voting_start = Some(Timestamp::new(10));
        p.voting_end = Some(Timestamp::new(20));
        p.electorate = Some(Electorate::from_validators(vec![Validator {
            address: addr(1),
            stake: 60,
        }]));
        p.rules = Some(VotingRules {
            quorum: Ratio::ONE_THIRD,
            pass_threshold: Ratio::ONE_HALF,
            veto_threshold: Ratio::ONE_THIRD,
            execution_delay_secs: 5,
        });
        p.credit_deposit(addr(1), 100, Timestamp::new(1));
        p.record_vote(
            addr(1),
            VoteRecord {
                option: VoteOption::Yes,
                weight: 60,
                timestamp: Timestamp::new(12),
            },
        );

        let record = p.to_record_bytes().unwrap();
        let votes = p
            .votes
            .iter()
            .map(|(k, v)| (*k, bincode::serialize(v).unwrap()))
            .collect();
        let deposits = p
            .deposits
            .iter()
            .map(|(k, v)| (*k, bincode::serialize(v).unwrap()))
            .collect();
        let restored = Proposal::from_parts(&record, votes, deposits).unwrap();
        assert_eq!(restored, p);
    }

    #[test]
    fn test_retention_deadline() {
        let mut p = text_proposal(1);
        assert_eq!(p.retention_deadline(10), None);

        // Deposit-timeout failure: boundary is deposit_end.
        p.status = ProposalStatus::Failed;
        assert_eq!(p.retention_deadline(10), Some(Timestamp::new(110)));

        // Rejected after voting: boundary is voting_end.
        p.status = ProposalStatus::Rejected;
        p.voting_end = Some(Timestamp::new(200));
        assert_eq!(p.retention_deadline(10), Some(Timestamp::new(210)));

        // Executed: boundary is execute_time.
        p.status = ProposalStatus::Executed;
        p.execute_time = Some(Timestamp::new(300));
        assert_eq!(p.retention_deadline(10), Some(Timestamp::new(310)));
    }
}
