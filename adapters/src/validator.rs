//! Validator set adapter.

use crate::AdapterError;
use agora_types::AccountId;

/// One validator with its attested stake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub address: AccountId,
    pub stake: u128,
}

/// Read-only view of the active validator set.
///
/// `active_at` must be snapshot-consistent for the given height. The
/// governance core calls it exactly once per proposal, at `voting_start`,
/// to freeze the eligibility set and stake weights.
pub trait ValidatorSetAdapter: Send + Sync {
    /// The validators active at `height`, with their stakes.
    fn active_at(&self, height: u64) -> Result<Vec<Validator>, AdapterError>;

    /// Whether `address` is in the currently active set.
    fn contains(&self, address: &AccountId) -> bool;
}
