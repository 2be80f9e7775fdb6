//! Block-driven proposal lifecycle.
//!
//! The host calls [`LifecycleEngine::advance`] once per block with the
//! pinned `(now, height)` pair. Transitions are driven only by time, height,
//! parameters, and vote contents, and every handler re-checks its guard
//! inside the store's update closure, so running `advance` twice on the same
//! `(now, height)` leaves state unchanged after the first successful run.

use agora_adapters::{StateAdapter, ValidatorSetAdapter};
use agora_types::{ProposalId, Timestamp};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::GovernanceError;
use crate::executor::Executor;
use crate::params::ParamStore;
use crate::proposal::{Proposal, ProposalStatus, TallyResult};
use crate::settlement::{burn_deposits, refund_deposits};
use crate::store::ProposalStore;
use crate::tally::TallyEngine;

/// One observed status transition, for the host to emit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionEvent {
    pub id: ProposalId,
    pub from: ProposalStatus,
    pub to: ProposalStatus,
    pub reason: String,
}

/// Lifecycle tuning.
#[derive(Clone, Copy, Debug)]
pub struct LifecycleConfig {
    /// Upper bound on status transitions performed in one `advance` call;
    /// left-over work is picked up on the next block.
    pub max_transitions: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_transitions: 128,
        }
    }
}

/// Advances proposal statuses on block boundaries.
pub struct LifecycleEngine {
    config: LifecycleConfig,
}

impl LifecycleEngine {
    pub fn new(config: LifecycleConfig) -> Self {
        Self { config }
    }

    /// Advance every due proposal. Called at most once per block.
    ///
    /// A user-level or adapter fault on one proposal is logged and skipped
    /// so the rest of the block proceeds; a tally deadline abort ends the
    /// whole call early (the remaining work is retried next block).
    #[allow(clippy::too_many_arguments)]
    pub fn advance(
        &self,
        store: &ProposalStore,
        params: &ParamStore,
        tally: &TallyEngine,
        validators: &dyn ValidatorSetAdapter,
        state: &dyn StateAdapter,
        executor: &Executor,
        now: Timestamp,
        height: u64,
        deadline: Option<Instant>,
    ) -> Result<Vec<TransitionEvent>, GovernanceError> {
        let mut events = Vec::new();
        let snapshot = params.get();
        let mut budget = self.config.max_transitions;

        // Deposit-period proposals: activate when funded, fail when the
        // window lapses. Activation is checked first so a proposal funded
        // on its last valid deposit activates even if `advance` runs late.
        for id in store.ids_by_status(ProposalStatus::DepositPeriod) {
            if budget == 0 {
                return Ok(events);
            }
            let proposal = match store.get(id) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if proposal.status != ProposalStatus::DepositPeriod {
                continue;
            }
            let outcome = if proposal.total_deposit >= snapshot.min_deposit {
                store
                    .activate(id, &snapshot, validators, now, height)
                    .map(|()| TransitionEvent {
                        id,
                        from: ProposalStatus::DepositPeriod,
                        to: ProposalStatus::VotingPeriod,
                        reason: "minimum deposit reached".to_string(),
                    })
            } else if now > proposal.deposit_end {
                self.fail_deposit_timeout(store, state, id, &proposal)
            } else {
                continue;
            };
            match outcome {
                Ok(event) => {
                    events.push(event);
                    budget -= 1;
                }
                Err(e) => warn!(id = id.raw(), %e, "deposit-period transition failed"),
            }
        }

        // Voting-period proposals whose window has closed: tally and settle.
        for id in store.ids_by_status(ProposalStatus::VotingPeriod) {
            if budget == 0 {
                return Ok(events);
            }
            let proposal = match store.get(id) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if proposal.status != ProposalStatus::VotingPeriod {
                continue;
            }
            let ended = matches!(proposal.voting_end, Some(end) if now >= end);
            if !ended {
                continue;
            }
            match self.close_voting(store, state, tally, id, now, deadline) {
                Ok(event) => {
                    events.push(event);
                    budget -= 1;
                }
                Err(GovernanceError::TimedOut) => {
                    warn!(id = id.raw(), "tally deadline exceeded, deferring to next block");
                    return Ok(events);
                }
                Err(e) => warn!(id = id.raw(), %e, "voting-end transition failed"),
            }
        }

        // Passed proposals whose execution delay has elapsed.
        for id in store.ids_by_status(ProposalStatus::Passed) {
            if budget == 0 {
                return Ok(events);
            }
            let proposal = match store.get(id) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if proposal.status != ProposalStatus::Passed {
                continue;
            }
            let due = matches!(proposal.execute_time, Some(t) if now >= t);
            if !due {
                continue;
            }
            match executor.execute(store, params, id, height) {
                Ok(outcome) => {
                    events.push(TransitionEvent {
                        id,
                        from: ProposalStatus::Passed,
                        to: outcome.status,
                        reason: outcome.reason,
                    });
                    budget -= 1;
                }
                // Adapter fault: the proposal stays PASSED and the next
                // block retries. No in-process retry loop.
                Err(e) => warn!(id = id.raw(), %e, "execution deferred"),
            }
        }

        debug!(
            transitions = events.len(),
            height, "lifecycle advance complete"
        );
        Ok(events)
    }

    fn fail_deposit_timeout(
        &self,
        store: &ProposalStore,
        state: &dyn StateAdapter,
        id: ProposalId,
        proposal: &Proposal,
    ) -> Result<TransitionEvent, GovernanceError> {
        let mut tx = state.begin()?;
        refund_deposits(&mut *tx, proposal)?;
        state.commit(tx)?;
        store.update(id, |p| {
            if p.status != ProposalStatus::DepositPeriod {
                return Err(GovernanceError::WrongPhase {
                    id,
                    status: p.status,
                });
            }
            p.status = ProposalStatus::Failed;
            p.outcome = Some("deposit period ended below minimum deposit".to_string());
            Ok(())
        })?;
        Ok(TransitionEvent {
            id,
            from: ProposalStatus::DepositPeriod,
            to: ProposalStatus::Failed,
            reason: "deposit window expired".to_string(),
        })
    }

    fn close_voting(
        &self,
        store: &ProposalStore,
        state: &dyn StateAdapter,
        tally: &TallyEngine,
        id: ProposalId,
        now: Timestamp,
        deadline: Option<Instant>,
    ) -> Result<TransitionEvent, GovernanceError> {
        let proposal = store.get(id)?;
        let result = tally.tally(&proposal, now, deadline)?;

        if result.passed {
            let event = TransitionEvent {
                id,
                from: ProposalStatus::VotingPeriod,
                to: ProposalStatus::Passed,
                reason: format!("passed with {} yes of {} cast", result.yes, result.total_votes),
            };
            store.update(id, |p| {
                if p.status != ProposalStatus::VotingPeriod {
                    return Err(GovernanceError::WrongPhase {
                        id,
                        status: p.status,
                    });
                }
                let end = p
                    .voting_end
                    .ok_or_else(|| GovernanceError::Other("voting_end unset".to_string()))?;
                let delay = p
                    .rules
                    .as_ref()
                    .map(|r| r.execution_delay_secs)
                    .ok_or_else(|| GovernanceError::Other("rules unset".to_string()))?;
                p.tally = Some(result.clone());
                p.status = ProposalStatus::Passed;
                p.execute_time = Some(end.saturating_add_secs(delay));
                Ok(())
            })?;
            Ok(event)
        } else {
            // Rejection settles immediately: veto burns, anything else
            // refunds.
            let mut tx = state.begin()?;
            if result.veto_reached {
                burn_deposits(&mut *tx, &proposal)?;
            } else {
                refund_deposits(&mut *tx, &proposal)?;
            }
            state.commit(tx)?;
            let event = TransitionEvent {
                id,
                from: ProposalStatus::VotingPeriod,
                to: ProposalStatus::Rejected,
                reason: rejection_reason(&result),
            };
            store.update(id, |p| {
                if p.status != ProposalStatus::VotingPeriod {
                    return Err(GovernanceError::WrongPhase {
                        id,
                        status: p.status,
                    });
                }
                p.tally = Some(result.clone());
                p.status = ProposalStatus::Rejected;
                Ok(())
            })?;
            Ok(event)
        }
    }
}

fn rejection_reason(result: &TallyResult) -> String {
    if result.veto_reached {
        "vetoed, deposits burned".to_string()
    } else if !result.quorum_reached {
        "quorum not reached".to_string()
    } else {
        "pass threshold not reached".to_string()
    }
}
