//! Proposal execution — applies accepted payloads to chain state.
//!
//! Every execution stages its effects and the deposit refund in one state
//! transaction; the status flip is persisted only after the transaction
//! commits. User-level failures (schema rejection, stale upgrade height,
//! underfunded pool) move the proposal to `Failed` with an outcome string;
//! adapter failures roll everything back and leave the proposal in
//! `Passed` for the next block to retry.

use agora_adapters::{AdapterError, StateAdapter, UpgradeScheduler};
use agora_store::MetaStore;
use agora_types::{AccountId, ProposalId};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::GovernanceError;
use crate::params::ParamStore;
use crate::proposal::{Payload, ProposalStatus};
use crate::settlement::refund_deposits;
use crate::store::ProposalStore;

/// Dispatches accepted proposals to their typed handlers.
pub struct Executor {
    state: Arc<dyn StateAdapter>,
    upgrades: Arc<dyn UpgradeScheduler>,
    meta: Arc<dyn MetaStore>,
}

/// What execution did to the proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutcome {
    pub status: ProposalStatus,
    pub reason: String,
}

impl Executor {
    pub fn new(
        state: Arc<dyn StateAdapter>,
        upgrades: Arc<dyn UpgradeScheduler>,
        meta: Arc<dyn MetaStore>,
    ) -> Self {
        Self {
            state,
            upgrades,
            meta,
        }
    }

    /// Execute a passed proposal whose `execute_time` has arrived (the
    /// lifecycle engine checks the schedule before calling).
    pub fn execute(
        &self,
        store: &ProposalStore,
        params: &ParamStore,
        id: ProposalId,
        height: u64,
    ) -> Result<ExecOutcome, GovernanceError> {
        let proposal = store.get(id)?;
        if proposal.status != ProposalStatus::Passed {
            return Err(GovernanceError::WrongPhase {
                id,
                status: proposal.status,
            });
        }

        let mut tx = self.state.begin()?;
        let mut scheduled_upgrade: Option<String> = None;

        // Stage the payload's effects. `Err(reason)` is a user-level
        // failure; adapter faults bubble out as hard errors.
        let staged: Result<(), String> = match &proposal.payload {
            Payload::Text => Ok(()),
            Payload::ParameterChange { changes } => {
                match params.get().apply_changes(changes) {
                    Ok(_) => {
                        for change in changes {
                            tx.set_param(&change.subspace, &change.key, change.value.as_bytes())?;
                        }
                        Ok(())
                    }
                    Err(e) => Err(e.to_string()),
                }
            }
            Payload::SoftwareUpgrade {
                name,
                height: target,
                info,
            } => {
                if *target <= height {
                    Err(format!(
                        "upgrade height {target} is not above current height {height}"
                    ))
                } else {
                    match self.upgrades.schedule(name, *target, info) {
                        Ok(()) => {
                            scheduled_upgrade = Some(name.clone());
                            Ok(())
                        }
                        Err(AdapterError::UpgradeExists(name)) => {
                            Err(format!("upgrade {name} already scheduled"))
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Payload::CommunityPoolSpend { recipient, amount } => {
                match tx.transfer(&AccountId::COMMUNITY_POOL, recipient, *amount) {
                    Ok(()) => Ok(()),
                    Err(AdapterError::InsufficientFunds {
                        needed, available, ..
                    }) => Err(format!(
                        "community pool underfunded: have {available}, need {needed}"
                    )),
                    Err(e) => return Err(e.into()),
                }
            }
        };

        match staged {
            Ok(()) => {
                // Deposits of passed proposals are refunded at execution.
                refund_deposits(&mut *tx, &proposal)?;
                if let Err(e) = self.state.commit(tx) {
                    // Unwind the out-of-band registration before retrying
                    // on a later block.
                    if let Some(name) = scheduled_upgrade {
                        if let Err(cancel_err) = self.upgrades.cancel(&name) {
                            warn!(%cancel_err, "failed to cancel upgrade after aborted commit");
                        }
                    }
                    return Err(e.into());
                }
                if let Payload::ParameterChange { changes } = &proposal.payload {
                    let installed = params.apply(changes)?;
                    if let Err(e) = params.persist(self.meta.as_ref()) {
                        warn!(%e, "failed to persist parameter snapshot");
                    }
                    debug!(version = installed.version, "governance parameters updated");
                }
                store.update(id, |p| {
                    p.status = ProposalStatus::Executed;
                    Ok(())
                })?;
                debug!(id = id.raw(), kind = %proposal.kind(), "proposal executed");
                Ok(ExecOutcome {
                    status: ProposalStatus::Executed,
                    reason: format!("{} executed", proposal.kind()),
                })
            }
            Err(reason) => {
                self.state.rollback(tx);
                // The proposal still exits with its deposits refunded.
                let mut settle = self.state.begin()?;
                refund_deposits(&mut *settle, &proposal)?;
                self.state.commit(settle)?;
                store.update(id, |p| {
                    p.status = ProposalStatus::Failed;
                    p.outcome = Some(reason.clone());
                    Ok(())
                })?;
                debug!(id = id.raw(), %reason, "proposal execution failed");
                Ok(ExecOutcome {
                    status: ProposalStatus::Failed,
                    reason,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{GovernanceParams, ParamStore};
    use crate::proposal::Payload;
    use agora_nullables::{MemoryGovernanceStore, NullStateAdapter, NullUpgradeScheduler};
    use agora_types::Timestamp;
    use std::sync::Arc;

    fn addr(n: u8) -> AccountId {
        AccountId::new([n; 20])
    }

    #[test]
    fn test_execute_requires_passed_status() {
        let backend = Arc::new(MemoryGovernanceStore::new());
        let store = ProposalStore::open(backend.clone(), backend.clone()).unwrap();
        let state = Arc::new(NullStateAdapter::new());
        state.set_balance(addr(1), 1000);
        let params = ParamStore::new(GovernanceParams::defaults()).unwrap();
        let executor = Executor::new(
            state.clone(),
            Arc::new(NullUpgradeScheduler::new()),
            backend,
        );

        let id = store
            .submit(
                addr(1),
                "t".to_string(),
                "d".to_string(),
                Payload::Text,
                0,
                &params.get(),
                state.as_ref(),
                Timestamp::new(0),
                1,
            )
            .unwrap();

        // Still in its deposit period: refuse to execute.
        let err = executor.execute(&store, &params, id, 1).unwrap_err();
        assert!(matches!(err, GovernanceError::WrongPhase { .. }));
    }
}
