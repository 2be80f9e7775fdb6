//! Parallel vote tally.
//!
//! Votes are partitioned into fixed-size batches; workers aggregate
//! per-option sums locally and the partials are combined in ascending
//! batch-index order, so the result is bit-identical regardless of worker
//! count or scheduling. All threshold checks cross-multiply through
//! arbitrary-precision integers; no floats.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use agora_types::Timestamp;

use crate::error::GovernanceError;
use crate::proposal::{Proposal, TallyResult, VoteOption};

#[derive(Clone, Copy, Default)]
struct Partial {
    yes: u128,
    no: u128,
    abstain: u128,
    veto: u128,
}

/// Deterministic, cancellable tally engine over a fixed worker pool.
pub struct TallyEngine {
    pool: rayon::ThreadPool,
    workers: u32,
    batch_size: usize,
}

impl TallyEngine {
    /// Build an engine. `workers == 0` means one thread per CPU core.
    pub fn new(workers: u32, batch_size: u32) -> Result<Self, GovernanceError> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if workers > 0 {
            builder = builder.num_threads(workers as usize);
        }
        let pool = builder
            .build()
            .map_err(|e| GovernanceError::Other(format!("tally pool: {e}")))?;
        Ok(Self {
            pool,
            workers,
            batch_size: batch_size.max(1) as usize,
        })
    }

    /// The `(workers, batch_size)` this engine was built with.
    pub fn config(&self) -> (u32, u32) {
        (self.workers, self.batch_size as u32)
    }

    /// Tally a proposal's votes against its sampled rules and frozen
    /// electorate.
    ///
    /// Pure with respect to the proposal: same votes, electorate, and rules
    /// produce the same result bytes. `deadline` cancels the computation;
    /// partial results are discarded and the caller gets `TimedOut`.
    pub fn tally(
        &self,
        proposal: &Proposal,
        now: Timestamp,
        deadline: Option<Instant>,
    ) -> Result<TallyResult, GovernanceError> {
        let electorate = proposal
            .electorate
            .as_ref()
            .ok_or(GovernanceError::WrongPhase {
                id: proposal.id,
                status: proposal.status,
            })?;
        let rules = proposal.rules.as_ref().ok_or(GovernanceError::WrongPhase {
            id: proposal.id,
            status: proposal.status,
        })?;

        let entries: Vec<(VoteOption, u128)> = proposal
            .votes
            .values()
            .map(|record| (record.option, record.weight))
            .collect();
        let batches: Vec<&[(VoteOption, u128)]> = entries.chunks(self.batch_size).collect();

        let deadline_hit = AtomicBool::new(false);
        let partials: Vec<Partial> = self.pool.install(|| {
            batches
                .par_iter()
                .map(|batch| {
                    if let Some(d) = deadline {
                        if Instant::now() >= d {
                            deadline_hit.store(true, Ordering::Relaxed);
                            return Partial::default();
                        }
                    }
                    let mut partial = Partial::default();
                    for (option, weight) in batch.iter() {
                        match option {
                            VoteOption::Yes => {
                                partial.yes = partial.yes.saturating_add(*weight)
                            }
                            VoteOption::No => partial.no = partial.no.saturating_add(*weight),
                            VoteOption::Abstain => {
                                partial.abstain = partial.abstain.saturating_add(*weight)
                            }
                            VoteOption::NoWithVeto => {
                                partial.veto = partial.veto.saturating_add(*weight)
                            }
                        }
                    }
                    partial
                })
                .collect()
        });
        if deadline_hit.load(Ordering::Relaxed) {
            return Err(GovernanceError::TimedOut);
        }

        // Combine in ascending batch-index order. Addition is associative
        // and commutative, but a fixed order keeps the reduction
        // bit-identical across implementations.
        let mut sum = Partial::default();
        for partial in partials {
            sum.yes = sum.yes.saturating_add(partial.yes);
            sum.no = sum.no.saturating_add(partial.no);
            sum.abstain = sum.abstain.saturating_add(partial.abstain);
            sum.veto = sum.veto.saturating_add(partial.veto);
        }
        let total_votes = sum
            .yes
            .saturating_add(sum.no)
            .saturating_add(sum.abstain)
            .saturating_add(sum.veto);

        // All three tests are strict on the passing side: a vote landing
        // exactly on a threshold does not pass it.
        let quorum_reached =
            total_votes > 0 && rules.quorum.le_frac(total_votes, electorate.total_stake);
        let veto_reached = total_votes > 0 && rules.veto_threshold.lt_frac(sum.veto, total_votes);
        let pass_base = sum.yes.saturating_add(sum.no).saturating_add(sum.veto);
        let mut passed = pass_base > 0 && rules.pass_threshold.lt_frac(sum.yes, pass_base);
        if veto_reached {
            passed = false;
        }
        if !quorum_reached {
            passed = false;
        }

        Ok(TallyResult {
            total_votes,
            yes: sum.yes,
            no: sum.no,
            abstain: sum.abstain,
            veto: sum.veto,
            quorum_reached,
            veto_reached,
            passed,
            computed_at: now,
        })
    }
}
