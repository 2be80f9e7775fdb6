//! Transactional chain-state adapter.
//!
//! Every monetary effect of the governance core (deposit escrow, refunds,
//! veto burns, community-pool spends) and every chain-level parameter write
//! goes through one of these transactions. Either the whole transaction
//! commits or none of it does; the core orders its own status writes after
//! a successful commit.

use crate::AdapterError;
use agora_types::AccountId;
use std::any::Any;

/// An open state transaction. Reads observe the transaction's own staged
/// writes (read-your-writes); nothing is visible to other readers until
/// [`StateAdapter::commit`].
pub trait StateTx: Send {
    /// Balance of `address` as seen by this transaction.
    fn balance(&self, address: &AccountId) -> Result<u128, AdapterError>;

    /// Move `amount` from `from` to `to`.
    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AdapterError>;

    /// Destroy `amount` held by `from`.
    fn burn(&mut self, from: &AccountId, amount: u128) -> Result<(), AdapterError>;

    /// Read a chain parameter. `None` if never set.
    fn get_param(&self, subspace: &str, key: &str) -> Result<Option<Vec<u8>>, AdapterError>;

    /// Write a chain parameter.
    fn set_param(&mut self, subspace: &str, key: &str, value: &[u8]) -> Result<(), AdapterError>;

    /// Recover the concrete transaction type inside [`StateAdapter::commit`].
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Factory and lifecycle for state transactions.
///
/// Transactions are opaque handles; `commit` downcasts to its own concrete
/// transaction type via [`StateTx::into_any`].
pub trait StateAdapter: Send + Sync {
    /// Begin a transaction.
    fn begin(&self) -> Result<Box<dyn StateTx>, AdapterError>;

    /// Atomically apply everything staged in `tx`.
    fn commit(&self, tx: Box<dyn StateTx>) -> Result<(), AdapterError>;

    /// Discard everything staged in `tx`.
    fn rollback(&self, tx: Box<dyn StateTx>);
}
