//! Governance parameters — validation, the parameter-change schema, and the
//! copy-on-write parameter store.
//!
//! Readers hold an `Arc` snapshot; a successful update installs a new
//! snapshot with a bumped version. Readers never observe a partial update.

use agora_store::{MetaStore, PARAMS_META_KEY};
use agora_types::{Ratio, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::error::GovernanceError;
use crate::proposal::ParamChange;

/// Subspace owned by this module in the parameter-change schema.
pub const GOV_SUBSPACE: &str = "gov";

/// Shortest duration any period parameter may take: one block.
pub const MIN_PERIOD_SECS: u64 = 1;

/// All governance parameters. Runtime-mutable only through a successful
/// `PARAMETER_CHANGE` proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Deposit required to enter the voting period (raw units).
    pub min_deposit: u128,

    /// How long a proposal may sit below `min_deposit` before failing.
    pub max_deposit_period_secs: u64,

    /// Wall-clock window during which votes are accepted.
    pub voting_period_secs: u64,

    /// Delay between PASSED and the execute attempt.
    pub execution_delay_secs: u64,

    /// Minimum fraction of active stake that must vote for a decisive tally.
    pub quorum: Ratio,

    /// Minimum yes share of (yes + no + veto) required to pass.
    pub pass_threshold: Ratio,

    /// Veto share of all cast votes that forces rejection and burns deposits.
    pub veto_threshold: Ratio,

    /// Tally worker threads. 0 means one per CPU core.
    pub tally_workers: u32,

    /// Votes per tally batch.
    pub tally_batch_size: u32,

    /// Snapshot version, bumped on every installed update.
    pub version: u64,
}

impl GovernanceParams {
    /// Intended mainnet defaults.
    pub fn defaults() -> Self {
        Self {
            min_deposit: 512_000_000_000, // 512 × 10⁹ raw
            max_deposit_period_secs: 14 * 24 * 3600,
            voting_period_secs: 14 * 24 * 3600,
            execution_delay_secs: 2 * 24 * 3600,
            quorum: Ratio::ONE_THIRD,
            pass_threshold: Ratio::ONE_HALF,
            veto_threshold: Ratio::ONE_THIRD,
            tally_workers: 0,
            tally_batch_size: 100,
            version: 0,
        }
    }

    /// Validate every field. Ratios are range-checked at construction; this
    /// covers the remaining cross-field rules.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.min_deposit == 0 {
            return Err(GovernanceError::InvalidParameter(
                "min_deposit must be positive".to_string(),
            ));
        }
        for (name, secs) in [
            ("max_deposit_period", self.max_deposit_period_secs),
            ("voting_period", self.voting_period_secs),
            ("execution_delay", self.execution_delay_secs),
        ] {
            if secs < MIN_PERIOD_SECS {
                return Err(GovernanceError::InvalidParameter(format!(
                    "{name} must be at least one block ({MIN_PERIOD_SECS}s)"
                )));
            }
        }
        if self.tally_batch_size == 0 {
            return Err(GovernanceError::InvalidParameter(
                "tally_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a parameter-change set, producing the candidate new snapshot.
    ///
    /// Pure: `self` is untouched. Unknown subspaces or keys and malformed
    /// values are `INVALID_PARAMETER`; the result is validated as a whole so
    /// no partial application can ever be observed.
    pub fn apply_changes(&self, changes: &[ParamChange]) -> Result<Self, GovernanceError> {
        let mut next = self.clone();
        for change in changes {
            if change.subspace != GOV_SUBSPACE {
                return Err(GovernanceError::InvalidParameter(format!(
                    "unknown subspace {}",
                    change.subspace
                )));
            }
            let value = change.value.trim();
            match change.key.as_str() {
                "min_deposit" => next.min_deposit = parse_u128(&change.key, value)?,
                "max_deposit_period" => {
                    next.max_deposit_period_secs = parse_u64(&change.key, value)?
                }
                "voting_period" => next.voting_period_secs = parse_u64(&change.key, value)?,
                "execution_delay" => next.execution_delay_secs = parse_u64(&change.key, value)?,
                "quorum" => next.quorum = parse_ratio(&change.key, value)?,
                "pass_threshold" => next.pass_threshold = parse_ratio(&change.key, value)?,
                "veto_threshold" => next.veto_threshold = parse_ratio(&change.key, value)?,
                "tally_workers" => next.tally_workers = parse_u32(&change.key, value)?,
                "tally_batch_size" => next.tally_batch_size = parse_u32(&change.key, value)?,
                other => {
                    return Err(GovernanceError::InvalidParameter(format!(
                        "unknown key {GOV_SUBSPACE}/{other}"
                    )))
                }
            }
        }
        next.validate()?;
        next.version = self.version + 1;
        Ok(next)
    }

    /// Absolute end of a deposit window opening at `submit_time`.
    pub fn deposit_end(&self, submit_time: Timestamp) -> Timestamp {
        submit_time.saturating_add_secs(self.max_deposit_period_secs)
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self::defaults()
    }
}

fn parse_u128(key: &str, value: &str) -> Result<u128, GovernanceError> {
    value
        .parse::<u128>()
        .map_err(|_| GovernanceError::InvalidParameter(format!("{key}: bad integer '{value}'")))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, GovernanceError> {
    value
        .parse::<u64>()
        .map_err(|_| GovernanceError::InvalidParameter(format!("{key}: bad integer '{value}'")))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, GovernanceError> {
    value
        .parse::<u32>()
        .map_err(|_| GovernanceError::InvalidParameter(format!("{key}: bad integer '{value}'")))
}

fn parse_ratio(key: &str, value: &str) -> Result<Ratio, GovernanceError> {
    Ratio::parse(value)
        .map_err(|e| GovernanceError::InvalidParameter(format!("{key}: {e}")))
}

/// Copy-on-write parameter store.
///
/// `get` hands out the current snapshot; `apply` atomically validates and
/// installs a new one. Long-lived readers keep the snapshot they started
/// with — in-flight proposals sample their rules at activation and are
/// never affected by later updates.
pub struct ParamStore {
    current: RwLock<Arc<GovernanceParams>>,
}

impl ParamStore {
    /// Create a store from validated parameters.
    pub fn new(params: GovernanceParams) -> Result<Self, GovernanceError> {
        params.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(params)),
        })
    }

    /// The current immutable snapshot.
    pub fn get(&self) -> Arc<GovernanceParams> {
        Arc::clone(&self.current.read().expect("params lock poisoned"))
    }

    /// Validate `changes` against the current snapshot and install the
    /// result. Returns the installed snapshot.
    pub fn apply(&self, changes: &[ParamChange]) -> Result<Arc<GovernanceParams>, GovernanceError> {
        let mut guard = self.current.write().expect("params lock poisoned");
        let next = Arc::new(guard.apply_changes(changes)?);
        *guard = Arc::clone(&next);
        Ok(next)
    }

    /// Install a fully-formed snapshot (restart path).
    pub fn install(&self, params: GovernanceParams) -> Result<(), GovernanceError> {
        params.validate()?;
        *self.current.write().expect("params lock poisoned") = Arc::new(params);
        Ok(())
    }

    /// Persist the current snapshot to the meta store.
    pub fn persist(&self, meta: &dyn MetaStore) -> Result<(), GovernanceError> {
        let snapshot = self.get();
        let bytes = bincode::serialize(snapshot.as_ref())
            .map_err(|e| GovernanceError::Other(format!("params encode: {e}")))?;
        meta.put_meta(PARAMS_META_KEY, &bytes)?;
        Ok(())
    }

    /// Load the persisted snapshot, if one exists.
    pub fn load(meta: &dyn MetaStore) -> Result<Option<GovernanceParams>, GovernanceError> {
        match meta.get_meta(PARAMS_META_KEY)? {
            Some(bytes) => {
                let params: GovernanceParams = bincode::deserialize(&bytes)
                    .map_err(|e| GovernanceError::Other(format!("params decode: {e}")))?;
                Ok(Some(params))
            }
            None => Ok(None),
        }
    }
}
