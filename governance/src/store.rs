//! The proposal store — exclusive owner of all proposal records.
//!
//! In-memory state is the authority during a run; every mutation is written
//! through to the storage backend before it becomes visible, and `open`
//! rebuilds the full state from the backend after a restart.
//!
//! Locking: submit and load serialise on the store-level lock; per-proposal
//! writes serialise on that proposal's mutex; list operations take a read
//! snapshot. Mutations are applied to a clone and swapped in only after the
//! backend write succeeds, so a storage fault never leaves memory ahead of
//! disk.

use agora_adapters::{StateAdapter, ValidatorSetAdapter};
use agora_store::{GovernanceStore, MetaStore, NEXT_ID_META_KEY};
use agora_types::{AccountId, ProposalId, Timestamp};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use crate::proposal::{
    Electorate, Payload, Proposal, ProposalKind, ProposalStatus, VoteOption, VoteRecord,
    VotingRules,
};

struct Inner {
    proposals: BTreeMap<u64, Arc<Mutex<Proposal>>>,
    next_id: u64,
}

/// Persistent, sequence-numbered store of proposals, deposits, and votes.
pub struct ProposalStore {
    backend: Arc<dyn GovernanceStore>,
    meta: Arc<dyn MetaStore>,
    inner: RwLock<Inner>,
}

impl ProposalStore {
    /// Open the store, rebuilding in-memory state from the backend.
    pub fn open(
        backend: Arc<dyn GovernanceStore>,
        meta: Arc<dyn MetaStore>,
    ) -> Result<Self, GovernanceError> {
        let mut proposals = BTreeMap::new();
        let mut max_id = 0u64;
        for id in backend.list_proposals()? {
            let record = backend.get_proposal(id)?;
            let votes = backend.iter_votes(id)?;
            let deposits = backend.iter_deposits(id)?;
            let proposal = Proposal::from_parts(&record, votes, deposits)?;
            max_id = max_id.max(id.raw());
            proposals.insert(id.raw(), Arc::new(Mutex::new(proposal)));
        }
        let next_id = match meta.get_meta(NEXT_ID_META_KEY)? {
            Some(bytes) if bytes.len() == 8 => {
                u64::from_le_bytes(bytes.try_into().expect("checked length"))
            }
            _ => max_id + 1,
        };
        Ok(Self {
            backend,
            meta,
            inner: RwLock::new(Inner { proposals, next_id }),
        })
    }

    /// Submit a new proposal, debiting the initial deposit into escrow.
    ///
    /// Returns the assigned id. The caller is responsible for requesting
    /// activation when `initial_deposit` already meets `min_deposit`.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &self,
        proposer: AccountId,
        title: String,
        description: String,
        payload: Payload,
        initial_deposit: u128,
        params: &GovernanceParams,
        state: &dyn StateAdapter,
        now: Timestamp,
        height: u64,
    ) -> Result<ProposalId, GovernanceError> {
        Proposal::validate_content(&title, &description, &payload)?;

        if initial_deposit > 0 {
            let mut tx = state.begin()?;
            tx.transfer(&proposer, &AccountId::DEPOSIT_ESCROW, initial_deposit)?;
            state.commit(tx)?;
        }

        let mut inner = self.inner.write().expect("store lock poisoned");
        let id = ProposalId::new(inner.next_id);
        // Persist the sequence first: a crash may skip an id but can never
        // reuse one.
        self.meta
            .put_meta(NEXT_ID_META_KEY, &(id.raw() + 1).to_le_bytes())?;
        inner.next_id = id.raw() + 1;

        let mut proposal = Proposal {
            id,
            title,
            description,
            proposer,
            submit_time: now,
            submit_height: height,
            deposit_end: params.deposit_end(now),
            voting_start: None,
            voting_end: None,
            execute_time: None,
            status: ProposalStatus::DepositPeriod,
            total_deposit: 0,
            deposits: BTreeMap::new(),
            votes: BTreeMap::new(),
            tally: None,
            payload,
            outcome: None,
            electorate: None,
            rules: None,
        };
        if initial_deposit > 0 {
            proposal.credit_deposit(proposer, initial_deposit, now);
            self.persist_deposit(&proposal, &proposer)?;
        }
        self.backend
            .put_proposal(id, &proposal.to_record_bytes()?)?;
        self.backend
            .put_status_index(proposal.status.tag(), id)?;
        debug!(id = id.raw(), kind = %proposal.kind(), "proposal submitted");
        inner.proposals.insert(id.raw(), Arc::new(Mutex::new(proposal)));
        Ok(id)
    }

    /// Add to a proposal's deposit. Returns `true` when this deposit lifted
    /// the total across `min_deposit` (the caller then requests activation).
    pub fn deposit(
        &self,
        id: ProposalId,
        depositor: AccountId,
        amount: u128,
        params: &GovernanceParams,
        state: &dyn StateAdapter,
        now: Timestamp,
    ) -> Result<bool, GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::InvalidProposal(
                "deposit amount must be positive".to_string(),
            ));
        }
        let slot = self.slot(id)?;
        let mut guard = slot.lock().expect("proposal lock poisoned");
        if guard.status != ProposalStatus::DepositPeriod {
            return Err(GovernanceError::WrongPhase {
                id,
                status: guard.status,
            });
        }
        if now > guard.deposit_end {
            return Err(GovernanceError::DepositWindowClosed(id));
        }

        let mut tx = state.begin()?;
        tx.transfer(&depositor, &AccountId::DEPOSIT_ESCROW, amount)?;
        state.commit(tx)?;

        let mut updated = guard.clone();
        let was_below = updated.total_deposit < params.min_deposit;
        updated.credit_deposit(depositor, amount, now);
        self.persist_deposit(&updated, &depositor)?;
        self.backend
            .put_proposal(id, &updated.to_record_bytes()?)?;
        let crossed = was_below && updated.total_deposit >= params.min_deposit;
        *guard = updated;
        Ok(crossed)
    }

    /// Record a vote. The voter must appear in the electorate frozen at
    /// `voting_start`; the weight is copied from that snapshot. A re-vote
    /// replaces the previous record and invalidates the cached tally.
    pub fn vote(
        &self,
        id: ProposalId,
        voter: AccountId,
        option: VoteOption,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let slot = self.slot(id)?;
        let mut guard = slot.lock().expect("proposal lock poisoned");
        if guard.status != ProposalStatus::VotingPeriod {
            return Err(GovernanceError::WrongPhase {
                id,
                status: guard.status,
            });
        }
        // The wall-clock window is authoritative even before the boundary
        // block flips the status.
        if let Some(end) = guard.voting_end {
            if now >= end {
                return Err(GovernanceError::WrongPhase {
                    id,
                    status: guard.status,
                });
            }
        }
        let electorate = guard
            .electorate
            .as_ref()
            .ok_or(GovernanceError::WrongPhase {
                id,
                status: guard.status,
            })?;
        let weight = electorate
            .stake_of(&voter)
            .ok_or(GovernanceError::NotEligible(voter))?;

        let mut updated = guard.clone();
        let record = VoteRecord {
            option,
            weight,
            timestamp: now,
        };
        self.backend
            .put_vote(id, &voter, &encode(&record)?)?;
        updated.record_vote(voter, record);
        *guard = updated;
        Ok(())
    }

    /// Move a deposit-period proposal into its voting period: freeze the
    /// electorate, sample the rules, and start the voting clock. The
    /// validator set is consulted exactly once, here.
    pub(crate) fn activate(
        &self,
        id: ProposalId,
        params: &GovernanceParams,
        validators: &dyn ValidatorSetAdapter,
        now: Timestamp,
        height: u64,
    ) -> Result<(), GovernanceError> {
        let slot = self.slot(id)?;
        let mut guard = slot.lock().expect("proposal lock poisoned");
        if guard.status != ProposalStatus::DepositPeriod {
            return Err(GovernanceError::WrongPhase {
                id,
                status: guard.status,
            });
        }
        let electorate = Electorate::from_validators(validators.active_at(height)?);
        let voting_end = now.saturating_add_secs(params.voting_period_secs);

        let mut updated = guard.clone();
        updated.status = ProposalStatus::VotingPeriod;
        updated.voting_start = Some(now);
        updated.voting_end = Some(voting_end);
        updated.electorate = Some(electorate);
        updated.rules = Some(VotingRules::sample(params));
        self.backend
            .put_proposal(id, &updated.to_record_bytes()?)?;
        self.backend
            .delete_status_index(ProposalStatus::DepositPeriod.tag(), id)?;
        self.backend
            .put_status_index(ProposalStatus::VotingPeriod.tag(), id)?;
        debug!(id = id.raw(), %voting_end, "proposal entered voting period");
        *guard = updated;
        Ok(())
    }

    /// Apply an arbitrary mutation under the proposal's lock, persisting
    /// the record (and any status-index move) before it becomes visible.
    /// Crate-internal: status transitions must flow through the lifecycle
    /// engine and executor so the status DAG holds.
    pub(crate) fn update<T>(
        &self,
        id: ProposalId,
        f: impl FnOnce(&mut Proposal) -> Result<T, GovernanceError>,
    ) -> Result<T, GovernanceError> {
        let slot = self.slot(id)?;
        let mut guard = slot.lock().expect("proposal lock poisoned");
        let mut updated = guard.clone();
        let out = f(&mut updated)?;
        let old_tag = guard.status.tag();
        let new_tag = updated.status.tag();
        self.backend
            .put_proposal(id, &updated.to_record_bytes()?)?;
        if old_tag != new_tag {
            self.backend.delete_status_index(old_tag, id)?;
            self.backend.put_status_index(new_tag, id)?;
        }
        *guard = updated;
        Ok(out)
    }

    /// Snapshot of one proposal.
    pub fn get(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        let slot = self.slot(id)?;
        let guard = slot.lock().expect("proposal lock poisoned");
        Ok(guard.clone())
    }

    /// Snapshot of all proposals, ascending by id.
    pub fn list(&self) -> Vec<Proposal> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .proposals
            .values()
            .map(|slot| slot.lock().expect("proposal lock poisoned").clone())
            .collect()
    }

    /// Snapshot of proposals in `status`, ascending by id.
    pub fn list_by_status(&self, status: ProposalStatus) -> Vec<Proposal> {
        self.list()
            .into_iter()
            .filter(|p| p.status == status)
            .collect()
    }

    /// Snapshot of proposals of `kind`, ascending by id.
    pub fn list_by_kind(&self, kind: ProposalKind) -> Vec<Proposal> {
        self.list()
            .into_iter()
            .filter(|p| p.kind() == kind)
            .collect()
    }

    /// Ids currently in `status`, ascending, without cloning proposals.
    pub fn ids_by_status(&self, status: ProposalStatus) -> Vec<ProposalId> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .proposals
            .iter()
            .filter(|(_, slot)| {
                slot.lock().expect("proposal lock poisoned").status == status
            })
            .map(|(raw, _)| ProposalId::new(*raw))
            .collect()
    }

    /// Delete a terminal proposal whose retention window has elapsed.
    pub fn archive(
        &self,
        id: ProposalId,
        params: &GovernanceParams,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let slot = inner
            .proposals
            .get(&id.raw())
            .cloned()
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        let guard = slot.lock().expect("proposal lock poisoned");
        // The retention window is one voting period past the terminal
        // boundary; proposals that voted use their own sampled period.
        let voting_period_secs = match (guard.voting_start, guard.voting_end) {
            (Some(start), Some(end)) => start.elapsed_since(end).max(1),
            _ => params.voting_period_secs,
        };
        let deadline = guard
            .retention_deadline(voting_period_secs)
            .ok_or(GovernanceError::WrongPhase {
                id,
                status: guard.status,
            })?;
        if now < deadline {
            return Err(GovernanceError::WrongPhase {
                id,
                status: guard.status,
            });
        }
        self.backend.delete_status_index(guard.status.tag(), id)?;
        self.backend.delete_proposal(id)?;
        drop(guard);
        inner.proposals.remove(&id.raw());
        debug!(id = id.raw(), "proposal archived");
        Ok(())
    }

    fn slot(&self, id: ProposalId) -> Result<Arc<Mutex<Proposal>>, GovernanceError> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .proposals
            .get(&id.raw())
            .cloned()
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    fn persist_deposit(
        &self,
        proposal: &Proposal,
        depositor: &AccountId,
    ) -> Result<(), GovernanceError> {
        let deposit = proposal
            .deposits
            .get(depositor)
            .expect("deposit just credited");
        self.backend
            .put_deposit(proposal.id, depositor, &encode(deposit)?)?;
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GovernanceError> {
    bincode::serialize(value).map_err(|e| GovernanceError::Other(format!("encode: {e}")))
}
