mod config;
mod hierarchical;
mod planner;
mod proportional;
mod report;

pub mod builder;
pub mod export;
pub mod manual;
pub mod quick_start;
pub mod standardize;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub use crate::config::*;
pub use crate::hierarchical::allocate_forced;
pub use crate::planner::plan_quotas;
pub use crate::proportional::allocate_proportional;
pub use crate::report::{
    bottleneck_report, collection_gaps, deviation_report, sample_profile, source_audit,
};

// The proportional allocator runs on its own stream so that its draws do not
// depend on how many draws the forced allocator made.
const PROPORTIONAL_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// The respondents that can be part of a sample.
///
/// `core` holds the respondents of the included surveys: they bypass the date
/// and age filters. `free` holds everybody else that passes the filters and is
/// not excluded. Both lists are sorted positions in the underlying pool and
/// never overlap.
#[derive(Debug, Clone)]
pub struct EligiblePool<'a> {
    pool: &'a Pool,
    core: Vec<usize>,
    free: Vec<usize>,
}

impl<'a> EligiblePool<'a> {
    /// Applies the base filters and the survey cohorts of a request.
    pub fn new(pool: &'a Pool, request: &SamplingRequest) -> EligiblePool<'a> {
        let conflicts = request.conflicting_surveys();
        if !conflicts.is_empty() {
            warn!(
                "EligiblePool: surveys {:?} are both included and excluded, they are kept as included",
                conflicts
            );
        }
        let exclusions = request.effective_exclusions();
        let mut core: Vec<usize> = Vec::new();
        let mut free: Vec<usize> = Vec::new();
        for (idx, r) in pool.respondents().iter().enumerate() {
            if request.include_surveys.contains(&r.survey_id) {
                core.push(idx);
                continue;
            }
            if exclusions.contains(&r.survey_id) {
                continue;
            }
            let date_ok = match request.date_range {
                None => true,
                Some(dr) => r.collected_on.map(|d| dr.contains(d)).unwrap_or(false),
            };
            let age_ok = r
                .age
                .map(|a| request.age_range.contains(a))
                .unwrap_or(false);
            if date_ok && age_ok {
                free.push(idx);
            }
        }
        debug!(
            "EligiblePool: pool: {} core: {} free: {}",
            pool.len(),
            core.len(),
            free.len()
        );
        EligiblePool { pool, core, free }
    }

    pub fn pool(&self) -> &'a Pool {
        self.pool
    }

    pub fn core_len(&self) -> usize {
        self.core.len()
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn len(&self) -> usize {
        self.core.len() + self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.free.is_empty()
    }

    /// Core respondents first, then the free pool.
    pub fn respondents(&self) -> impl Iterator<Item = &'a Respondent> + '_ {
        let pool = self.pool;
        self.indices().map(move |idx| pool.at(idx))
    }

    pub(crate) fn core(&self) -> &[usize] {
        &self.core
    }

    pub(crate) fn free(&self) -> &[usize] {
        &self.free
    }

    pub(crate) fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.core.iter().chain(self.free.iter()).copied()
    }
}

/// Runs a full sampling call: filters, planning, both allocators and all the
/// reports.
///
/// A pool with nothing left after filtering is not an error: the outcome is
/// `SamplingOutcome::NoData`.
///
/// Arguments:
/// * `pool` the standardized respondents
/// * `request` the constraints of this call. When `request.seed` is empty, a
/// seed is picked at random and reported in the outcome.
pub fn run_sampling(
    pool: &Pool,
    request: &SamplingRequest,
) -> Result<SamplingOutcome, SamplingError> {
    info!(
        "Sampling from {} respondents, requested size: {}, seed: {:?}",
        pool.len(),
        request.requested_size,
        request.seed
    );
    request.validate(pool)?;

    let seed = request.seed.unwrap_or_else(rand::random::<u64>);
    let fingerprint = request.fingerprint();
    info!("Request fingerprint: {} seed: {}", fingerprint, seed);

    let eligible = EligiblePool::new(pool, request);
    let plan = match plan_quotas(&eligible, request) {
        Feasibility::NoData => {
            warn!("No respondent left after filtering, nothing to sample");
            return Ok(SamplingOutcome::NoData { seed, fingerprint });
        }
        Feasibility::Planned(plan) => plan,
    };

    let mut forced_rng = StdRng::seed_from_u64(seed);
    let forced = allocate_forced(&eligible, request, &mut forced_rng);
    info!(
        "Forced sample: {} respondents (core: {}, quotas: {}, bracket backfill: {}, global backfill: {})",
        forced.len(),
        forced.core_kept,
        forced.quota_draws,
        forced.bracket_backfill,
        forced.global_backfill
    );
    if forced.len() < request.requested_size {
        warn!(
            "Forced sample has only {} respondents out of {} requested",
            forced.len(),
            request.requested_size
        );
    }

    let mut proportional_rng = StdRng::seed_from_u64(seed ^ PROPORTIONAL_STREAM);
    let proportional = allocate_proportional(&eligible, &plan, &mut proportional_rng);
    info!(
        "Proportional sample: {} respondents, min ratio: {:.4}",
        proportional.len(),
        proportional.min_ratio
    );

    let deviation = deviation_report(&plan, pool, &forced);
    let gaps = collection_gaps(&plan);
    let bottlenecks = bottleneck_report(&plan);
    if !bottlenecks.is_empty() {
        warn!(
            "{} strata have a positive target and no respondent available",
            bottlenecks.strata.len()
        );
    }
    let source_audit = source_audit(pool, &forced.members);
    let profile = sample_profile(pool, &forced.members);

    Ok(SamplingOutcome::Completed(Box::new(SamplingResponse {
        seed,
        fingerprint,
        core_size: eligible.core_len(),
        free_size: eligible.free_len(),
        plan,
        forced,
        proportional,
        deviation,
        gaps,
        bottlenecks,
        source_audit,
        profile,
    })))
}

/// Rounds to the nearest integer, ties to the even neighbour.
pub(crate) fn round_half_even(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}

/// Picks `n` distinct positions among the candidates, uniformly, without
/// replacement. The result is sorted.
pub(crate) fn draw<R: Rng + ?Sized>(rng: &mut R, candidates: &[usize], n: usize) -> Vec<usize> {
    let n = n.min(candidates.len());
    let mut picked: Vec<usize> = candidates.choose_multiple(rng, n).copied().collect();
    picked.sort_unstable();
    picked
}

pub(crate) fn keys_of(pool: &Pool, indices: &[usize]) -> Vec<RespondentKey> {
    indices.iter().map(|idx| pool.at(*idx).key()).collect()
}
