use std::collections::{BTreeSet, HashMap};

use log::debug;
use rand::Rng;

use crate::config::*;
use crate::{draw, keys_of, round_half_even, EligiblePool};

/// Builds a sample that keeps the target proportions of every stratum, scaled
/// down uniformly by the scarcest stratum.
///
/// Each stratum gets `round(target_n × min_ratio)` respondents, never more
/// than it has. If rounding pushes the total above the requested size, the
/// strata that were rounded up the most give one back each until the total
/// fits.
pub fn allocate_proportional<R: Rng + ?Sized>(
    eligible: &EligiblePool,
    plan: &QuotaPlan,
    rng: &mut R,
) -> ProportionalSample {
    let pool = eligible.pool();
    let min_ratio = plan.min_ratio();

    let mut by_stratum: HashMap<Stratum, Vec<usize>> = HashMap::new();
    for idx in eligible.indices() {
        if let Some(s) = pool.at(idx).stratum() {
            by_stratum.entry(s).or_insert_with(Vec::new).push(idx);
        }
    }

    // (exact share, rounded count) per stratum, in plan order.
    let mut quotas: Vec<(f64, usize)> = plan
        .strata
        .iter()
        .map(|sp| {
            let exact = sp.target_n * min_ratio;
            let available = by_stratum.get(&sp.stratum).map(|v| v.len()).unwrap_or(0);
            let n = (round_half_even(exact) as usize).min(available);
            (exact, n)
        })
        .collect();
    trim_overshoot(&mut quotas, plan.requested_size);

    let mut members: BTreeSet<RespondentKey> = BTreeSet::new();
    let mut stratum_counts: Vec<(Stratum, usize)> = Vec::new();
    for (sp, (_, n)) in plan.strata.iter().zip(quotas.iter()) {
        if *n == 0 {
            continue;
        }
        let candidates: &[usize] = by_stratum
            .get(&sp.stratum)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let drawn = draw(rng, candidates, *n);
        stratum_counts.push((sp.stratum, drawn.len()));
        members.extend(keys_of(pool, &drawn));
    }
    debug!(
        "allocate_proportional: min ratio: {} drawn: {} over {} strata",
        min_ratio,
        members.len(),
        stratum_counts.len()
    );
    ProportionalSample {
        members,
        min_ratio,
        stratum_counts,
    }
}

// Removes one unit at a time from the count with the largest rounding excess.
// Ties go to the first stratum in plan order.
fn trim_overshoot(quotas: &mut [(f64, usize)], limit: usize) {
    let mut total: usize = quotas.iter().map(|(_, n)| *n).sum();
    while total > limit {
        let mut best: Option<(usize, f64)> = None;
        for (pos, (exact, n)) in quotas.iter().enumerate() {
            if *n == 0 {
                continue;
            }
            let excess = *n as f64 - *exact;
            match best {
                Some((_, e)) if e >= excess => {}
                _ => best = Some((pos, excess)),
            }
        }
        match best {
            Some((pos, _)) => {
                quotas[pos].1 -= 1;
                total -= 1;
            }
            None => break,
        }
    }
}
