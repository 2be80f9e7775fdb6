//! Governance storage trait.
//!
//! The durable layout is one record per proposal (scalar fields plus the
//! length-prefixed payload), one record per vote, one record per deposit,
//! and a status secondary index. Keys are ordered so scanning a status
//! bucket yields proposals in ascending id.

use crate::StoreError;
use agora_types::{AccountId, ProposalId};

/// Trait for storing governance state (proposals, votes, deposits, index).
///
/// All payloads are opaque bytes; the governance crate owns the encoding.
/// Implementations must be safe for concurrent use from multiple threads.
pub trait GovernanceStore: Send + Sync {
    /// Store a proposal record (scalar fields + payload, without votes or
    /// deposits — those have their own records).
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError>;

    /// Get a proposal record by id.
    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError>;

    /// Delete a proposal record and all of its vote and deposit records.
    fn delete_proposal(&self, id: ProposalId) -> Result<(), StoreError>;

    /// List all proposal ids, ascending.
    fn list_proposals(&self) -> Result<Vec<ProposalId>, StoreError>;

    /// Store a vote record for a proposal. Overwrites a previous vote by
    /// the same voter (last write wins while voting is open).
    fn put_vote(
        &self,
        id: ProposalId,
        voter: &AccountId,
        data: &[u8],
    ) -> Result<(), StoreError>;

    /// Get all vote records for a proposal, ordered by voter bytes.
    fn iter_votes(&self, id: ProposalId) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError>;

    /// Store a deposit record for a proposal. Overwrites a previous record
    /// by the same depositor (deposits are cumulative per depositor).
    fn put_deposit(
        &self,
        id: ProposalId,
        depositor: &AccountId,
        data: &[u8],
    ) -> Result<(), StoreError>;

    /// Get all deposit records for a proposal, ordered by depositor bytes.
    fn iter_deposits(&self, id: ProposalId) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError>;

    /// Add a proposal to a status bucket.
    fn put_status_index(&self, status_tag: u8, id: ProposalId) -> Result<(), StoreError>;

    /// Remove a proposal from a status bucket.
    fn delete_status_index(&self, status_tag: u8, id: ProposalId) -> Result<(), StoreError>;

    /// Scan a status bucket, yielding proposal ids in ascending order.
    fn iter_status(&self, status_tag: u8) -> Result<Vec<ProposalId>, StoreError>;
}
