//! Governance core for the Agora chain.
//!
//! Proposal lifecycle: DepositPeriod → VotingPeriod → Passed/Rejected →
//! Executed/Failed, driven by block boundaries. Voting is stake-weighted
//! against an electorate frozen at `voting_start`; tallies are parallel,
//! deterministic, and checked with exact rational arithmetic; accepted
//! payloads execute under the state adapter's transactional discipline.

pub mod engine;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod params;
pub mod proposal;
mod settlement;
pub mod store;
pub mod tally;

pub use engine::GovernanceEngine;
pub use error::GovernanceError;
pub use executor::{ExecOutcome, Executor};
pub use lifecycle::{LifecycleConfig, LifecycleEngine, TransitionEvent};
pub use params::{GovernanceParams, ParamStore};
pub use proposal::{
    Deposit, Electorate, ParamChange, Payload, Proposal, ProposalKind, ProposalStatus,
    TallyResult, VoteOption, VoteRecord, VotingRules,
};
pub use store::ProposalStore;
pub use tally::TallyEngine;
