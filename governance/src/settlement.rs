//! Deposit settlement at exit transitions.
//!
//! Deposits live in the escrow module account while a proposal is live.
//! On the exit transition they are either refunded to their depositors or,
//! when a veto carried, burned out of escrow. Callers stage these moves in
//! the same state transaction as the transition's other effects, so
//! settlement happens exactly once or not at all.

use agora_adapters::{AdapterError, StateTx};
use agora_types::AccountId;

use crate::proposal::Proposal;

/// Return every deposit to its depositor.
pub(crate) fn refund_deposits(
    tx: &mut (dyn StateTx + '_),
    proposal: &Proposal,
) -> Result<(), AdapterError> {
    for deposit in proposal.deposits.values() {
        tx.transfer(&AccountId::DEPOSIT_ESCROW, &deposit.depositor, deposit.amount)?;
    }
    Ok(())
}

/// Destroy every deposit (veto rejection).
pub(crate) fn burn_deposits(
    tx: &mut (dyn StateTx + '_),
    proposal: &Proposal,
) -> Result<(), AdapterError> {
    for deposit in proposal.deposits.values() {
        tx.burn(&AccountId::DEPOSIT_ESCROW, deposit.amount)?;
    }
    Ok(())
}
