//! The governance engine — wires the parameter store, proposal store,
//! tally engine, lifecycle, and executor behind one host-facing API.

use agora_adapters::{Clock, HeightSource, StateAdapter, UpgradeScheduler, ValidatorSetAdapter};
use agora_store::{GovernanceStore, MetaStore};
use agora_types::{AccountId, ProposalId};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::error::GovernanceError;
use crate::executor::Executor;
use crate::lifecycle::{LifecycleConfig, LifecycleEngine, TransitionEvent};
use crate::params::{GovernanceParams, ParamStore};
use crate::proposal::{Payload, Proposal, ProposalKind, ProposalStatus, VoteOption};
use crate::store::ProposalStore;
use crate::tally::TallyEngine;

/// Current durable schema version, stamped into fresh stores.
const SCHEMA_VERSION: u32 = 1;

/// Host-facing facade over the governance core.
///
/// Submissions, deposits, and votes are answered synchronously; lifecycle
/// transitions happen when the host calls [`on_block`](Self::on_block) once
/// per block.
pub struct GovernanceEngine {
    params: ParamStore,
    store: ProposalStore,
    tally: RwLock<TallyEngine>,
    lifecycle: LifecycleEngine,
    executor: Executor,
    validators: Arc<dyn ValidatorSetAdapter>,
    state: Arc<dyn StateAdapter>,
    clock: Arc<dyn Clock>,
    heights: Arc<dyn HeightSource>,
}

impl GovernanceEngine {
    /// Open the engine over a storage backend and the node's adapters.
    ///
    /// A persisted parameter snapshot takes precedence over
    /// `genesis_params`; on first start the genesis parameters are
    /// validated, installed, and persisted.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        backend: Arc<dyn GovernanceStore>,
        meta: Arc<dyn MetaStore>,
        validators: Arc<dyn ValidatorSetAdapter>,
        state: Arc<dyn StateAdapter>,
        upgrades: Arc<dyn UpgradeScheduler>,
        clock: Arc<dyn Clock>,
        heights: Arc<dyn HeightSource>,
        genesis_params: GovernanceParams,
        lifecycle_config: LifecycleConfig,
    ) -> Result<Self, GovernanceError> {
        if meta.get_schema_version()? == 0 {
            meta.set_schema_version(SCHEMA_VERSION)?;
        }
        let initial = ParamStore::load(meta.as_ref())?.unwrap_or(genesis_params);
        let params = ParamStore::new(initial)?;
        params.persist(meta.as_ref())?;
        let snapshot = params.get();
        let tally = TallyEngine::new(snapshot.tally_workers, snapshot.tally_batch_size)?;
        let store = ProposalStore::open(backend, Arc::clone(&meta))?;
        let executor = Executor::new(Arc::clone(&state), upgrades, meta);
        Ok(Self {
            params,
            store,
            tally: RwLock::new(tally),
            lifecycle: LifecycleEngine::new(lifecycle_config),
            executor,
            validators,
            state,
            clock,
            heights,
        })
    }

    /// Submit a proposal. The initial deposit is debited into escrow; if it
    /// already meets `min_deposit`, the proposal activates immediately.
    pub fn submit(
        &self,
        proposer: AccountId,
        title: impl Into<String>,
        description: impl Into<String>,
        payload: Payload,
        initial_deposit: u128,
    ) -> Result<ProposalId, GovernanceError> {
        let now = self.clock.now();
        let height = self.heights.height();
        let params = self.params.get();
        let id = self.store.submit(
            proposer,
            title.into(),
            description.into(),
            payload,
            initial_deposit,
            &params,
            self.state.as_ref(),
            now,
            height,
        )?;
        if initial_deposit >= params.min_deposit {
            self.store
                .activate(id, &params, self.validators.as_ref(), now, height)?;
        }
        Ok(id)
    }

    /// Top up a proposal's deposit; activates the proposal when the total
    /// crosses `min_deposit`.
    pub fn deposit(
        &self,
        id: ProposalId,
        depositor: AccountId,
        amount: u128,
    ) -> Result<(), GovernanceError> {
        let now = self.clock.now();
        let height = self.heights.height();
        let params = self.params.get();
        let crossed =
            self.store
                .deposit(id, depositor, amount, &params, self.state.as_ref(), now)?;
        if crossed {
            self.store
                .activate(id, &params, self.validators.as_ref(), now, height)?;
        }
        Ok(())
    }

    /// Cast (or replace) a vote.
    pub fn vote(
        &self,
        id: ProposalId,
        voter: AccountId,
        option: VoteOption,
    ) -> Result<(), GovernanceError> {
        self.store.vote(id, voter, option, self.clock.now())
    }

    /// Per-block lifecycle entry point.
    pub fn on_block(&self) -> Result<Vec<TransitionEvent>, GovernanceError> {
        self.on_block_with_deadline(None)
    }

    /// Per-block lifecycle entry point with a hard tally deadline (the
    /// block's processing budget).
    pub fn on_block_with_deadline(
        &self,
        deadline: Option<Instant>,
    ) -> Result<Vec<TransitionEvent>, GovernanceError> {
        let now = self.clock.now();
        let height = self.heights.height();
        let events = {
            let tally = self.tally.read().expect("tally lock poisoned");
            self.lifecycle.advance(
                &self.store,
                &self.params,
                &tally,
                self.validators.as_ref(),
                self.state.as_ref(),
                &self.executor,
                now,
                height,
                deadline,
            )?
        };
        // A parameter-change execution may have retuned the tally pool.
        self.refresh_tally_engine()?;
        Ok(events)
    }

    /// Snapshot of one proposal.
    pub fn proposal(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        self.store.get(id)
    }

    /// Snapshot of all proposals, ascending by id.
    pub fn proposals(&self) -> Vec<Proposal> {
        self.store.list()
    }

    pub fn proposals_by_status(&self, status: ProposalStatus) -> Vec<Proposal> {
        self.store.list_by_status(status)
    }

    pub fn proposals_by_kind(&self, kind: ProposalKind) -> Vec<Proposal> {
        self.store.list_by_kind(kind)
    }

    /// Current parameter snapshot.
    pub fn params(&self) -> Arc<GovernanceParams> {
        self.params.get()
    }

    /// Delete a terminal proposal whose retention window has elapsed.
    pub fn archive(&self, id: ProposalId) -> Result<(), GovernanceError> {
        let params = self.params.get();
        self.store.archive(id, &params, self.clock.now())
    }

    fn refresh_tally_engine(&self) -> Result<(), GovernanceError> {
        let snapshot = self.params.get();
        let desired = (snapshot.tally_workers, snapshot.tally_batch_size);
        let current = self.tally.read().expect("tally lock poisoned").config();
        if current != desired {
            let rebuilt = TallyEngine::new(desired.0, desired.1)?;
            *self.tally.write().expect("tally lock poisoned") = rebuilt;
        }
        Ok(())
    }
}
