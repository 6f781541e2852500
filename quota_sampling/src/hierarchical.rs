use std::collections::BTreeSet;

use log::{debug, warn};
use rand::Rng;

use crate::config::*;
use crate::{draw, keys_of, round_half_even, EligiblePool};

/// Builds a sample of exactly the requested size whenever enough respondents
/// are eligible.
///
/// The core cohort is taken first. The rest is filled income bracket by
/// income bracket (in weight order), each bracket being split along region ×
/// locality sub-quotas. Shortfalls are completed first inside the bracket,
/// then from the whole remaining free pool, regardless of any dimension.
pub fn allocate_forced<R: Rng + ?Sized>(
    eligible: &EligiblePool,
    request: &SamplingRequest,
    rng: &mut R,
) -> ForcedSample {
    let pool = eligible.pool();
    let size = request.requested_size;
    let core = eligible.core();
    let n_core = core.len();
    let mut res = ForcedSample::default();

    if n_core >= size {
        let kept: Vec<usize> = if n_core > size {
            warn!(
                "allocate_forced: core cohort has {} respondents for a requested size of {}, keeping a random subset",
                n_core, size
            );
            res.core_truncated = true;
            draw(rng, core, size)
        } else {
            core.to_vec()
        };
        res.core_kept = kept.len();
        res.members = keys_of(pool, &kept).into_iter().collect();
        return res;
    }
    res.core_kept = n_core;
    let n_needed = size - n_core;

    // Drawn rows leave this set immediately.
    let mut remaining: BTreeSet<usize> = eligible.free().iter().copied().collect();
    let mut picked: Vec<usize> = Vec::new();

    for (income, iw) in request.income_weights.iter() {
        if iw <= 0.0 {
            continue;
        }
        let still_needed = n_needed - picked.len();
        if still_needed == 0 {
            break;
        }
        let target = (round_half_even(n_needed as f64 * iw / 100.0) as usize).min(still_needed);
        let in_bracket: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|idx| pool.at(*idx).income == Some(income))
            .collect();
        let take = target.min(in_bracket.len());
        debug!(
            "allocate_forced: bracket {:?} target: {} available: {} take: {}",
            income,
            target,
            in_bracket.len(),
            take
        );
        if take == 0 {
            continue;
        }

        let mut bracket_count: usize = 0;
        for (region, rw) in request.region_weights.iter() {
            for (locality, lw) in request.locality_weights.iter() {
                let room = take - bracket_count;
                if room == 0 {
                    break;
                }
                let sub_target = round_half_even(take as f64 * rw * lw / 10_000.0) as usize;
                if sub_target == 0 {
                    continue;
                }
                let candidates: Vec<usize> = in_bracket
                    .iter()
                    .copied()
                    .filter(|idx| {
                        let r = pool.at(*idx);
                        r.region == Some(region) && r.locality == Some(locality)
                    })
                    .collect();
                let drawn = draw(rng, &candidates, sub_target.min(room));
                for idx in drawn.iter() {
                    remaining.remove(idx);
                }
                bracket_count += drawn.len();
                res.quota_draws += drawn.len();
                picked.extend(drawn);
            }
        }

        let shortfall = take - bracket_count;
        if shortfall > 0 {
            let rest: Vec<usize> = in_bracket
                .iter()
                .copied()
                .filter(|idx| remaining.contains(idx))
                .collect();
            let drawn = draw(rng, &rest, shortfall);
            debug!(
                "allocate_forced: bracket {:?} backfilled {} of {}",
                income,
                drawn.len(),
                shortfall
            );
            for idx in drawn.iter() {
                remaining.remove(idx);
            }
            res.bracket_backfill += drawn.len();
            picked.extend(drawn);
        }
    }

    let global_shortfall = n_needed - picked.len();
    if global_shortfall > 0 && !remaining.is_empty() {
        let rest: Vec<usize> = remaining.iter().copied().collect();
        let drawn = draw(rng, &rest, global_shortfall);
        debug!(
            "allocate_forced: global backfill {} of {}",
            drawn.len(),
            global_shortfall
        );
        res.global_backfill = drawn.len();
        picked.extend(drawn);
    }

    let mut members: BTreeSet<RespondentKey> = keys_of(pool, core).into_iter().collect();
    members.extend(keys_of(pool, &picked));
    res.members = members;
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn respondent(
        id: usize,
        survey_id: SurveyId,
        region: Region,
        income: IncomeBracket,
        locality: Locality,
    ) -> Respondent {
        Respondent {
            respondent_id: format!("r{}", id),
            survey_id,
            region: Some(region),
            income: Some(income),
            locality: Some(locality),
            age: Some(40),
            collected_on: None,
            attributes: Vec::new(),
        }
    }

    fn mixed_pool(n: usize) -> Pool {
        let mut rows = Vec::new();
        for i in 0..n {
            let region = Region::all()[i % Region::all().len()];
            let income = IncomeBracket::all()[(i / 5) % IncomeBracket::all().len()];
            let locality = Locality::all()[(i / 25) % 2];
            rows.push(respondent(i, 1 + (i % 3) as SurveyId, region, income, locality));
        }
        Pool::new(rows).unwrap()
    }

    fn run(pool: &Pool, request: &SamplingRequest, seed: u64) -> ForcedSample {
        let eligible = EligiblePool::new(pool, request);
        let mut rng = StdRng::seed_from_u64(seed);
        allocate_forced(&eligible, request, &mut rng)
    }

    #[test]
    fn hits_requested_size_with_default_weights() {
        let pool = mixed_pool(500);
        let request = SamplingRequest {
            requested_size: 120,
            ..SamplingRequest::default()
        };
        let forced = run(&pool, &request, 7);
        assert_eq!(forced.len(), 120);
        assert_eq!(
            forced.quota_draws + forced.bracket_backfill + forced.global_backfill,
            120
        );
        assert!(!forced.core_truncated);
    }

    #[test]
    fn keeps_whole_core_then_fills() {
        let pool = mixed_pool(200);
        let request = SamplingRequest {
            requested_size: 100,
            include_surveys: [2].into_iter().collect(),
            ..SamplingRequest::default()
        };
        let forced = run(&pool, &request, 1);
        let core: Vec<RespondentKey> = pool
            .respondents()
            .iter()
            .filter(|r| r.survey_id == 2)
            .map(|r| r.key())
            .collect();
        assert_eq!(forced.core_kept, core.len());
        assert!(core.iter().all(|k| forced.members.contains(k)));
        assert_eq!(forced.len(), 100);
    }

    #[test]
    fn truncates_oversized_core() {
        let pool = mixed_pool(90);
        let request = SamplingRequest {
            requested_size: 10,
            include_surveys: [1].into_iter().collect(),
            ..SamplingRequest::default()
        };
        let forced = run(&pool, &request, 5);
        assert!(forced.core_truncated);
        assert_eq!(forced.len(), 10);
        assert_eq!(forced.core_kept, 10);
        assert!(forced
            .members
            .iter()
            .all(|k| k.survey_id == 1));
    }

    #[test]
    fn global_backfill_ignores_dimensions() {
        // Only one respondent matches the single wanted stratum.
        let mut rows = vec![respondent(
            0,
            1,
            Region::Sul,
            IncomeBracket::Over20000,
            Locality::Capital,
        )];
        for i in 1..30 {
            rows.push(respondent(
                i,
                1,
                Region::Norte,
                IncomeBracket::Under2500,
                Locality::Interior,
            ));
        }
        let pool = Pool::new(rows).unwrap();
        let request = SamplingRequest {
            region_weights: Weights::new(vec![(Region::Sul, 100.0)]),
            income_weights: Weights::new(vec![(IncomeBracket::Over20000, 100.0)]),
            locality_weights: Weights::new(vec![(Locality::Capital, 100.0)]),
            requested_size: 10,
            ..SamplingRequest::default()
        };
        let forced = run(&pool, &request, 9);
        assert_eq!(forced.len(), 10);
        assert_eq!(forced.quota_draws, 1);
        assert_eq!(forced.bracket_backfill, 0);
        assert_eq!(forced.global_backfill, 9);
    }

    #[test]
    fn bracket_backfill_stays_in_bracket() {
        // The bracket has rows but none in the wanted region × locality.
        let mut rows = Vec::new();
        for i in 0..40 {
            rows.push(respondent(
                i,
                1,
                Region::Norte,
                IncomeBracket::Over20000,
                Locality::Interior,
            ));
        }
        for i in 40..80 {
            rows.push(respondent(
                i,
                1,
                Region::Sul,
                IncomeBracket::Under2500,
                Locality::Capital,
            ));
        }
        let pool = Pool::new(rows).unwrap();
        let request = SamplingRequest {
            region_weights: Weights::new(vec![(Region::Sul, 100.0)]),
            income_weights: Weights::new(vec![(IncomeBracket::Over20000, 100.0)]),
            locality_weights: Weights::new(vec![(Locality::Capital, 100.0)]),
            requested_size: 20,
            ..SamplingRequest::default()
        };
        let forced = run(&pool, &request, 11);
        assert_eq!(forced.len(), 20);
        assert_eq!(forced.quota_draws, 0);
        assert_eq!(forced.bracket_backfill, 20);
        assert_eq!(forced.global_backfill, 0);
        let top_bracket: BTreeSet<RespondentKey> = pool
            .respondents()
            .iter()
            .filter(|r| r.income == Some(IncomeBracket::Over20000))
            .map(|r| r.key())
            .collect();
        assert!(forced.members.iter().all(|k| top_bracket.contains(k)));
    }

    #[test]
    fn same_seed_same_sample() {
        let pool = mixed_pool(300);
        let request = SamplingRequest {
            requested_size: 80,
            ..SamplingRequest::default()
        };
        assert_eq!(run(&pool, &request, 42), run(&pool, &request, 42));
    }

    #[test]
    fn short_pool_returns_everything() {
        let pool = mixed_pool(20);
        let request = SamplingRequest {
            requested_size: 50,
            ..SamplingRequest::default()
        };
        let forced = run(&pool, &request, 3);
        assert_eq!(forced.len(), 20);
    }
}
