use std::collections::BTreeSet;

use quota_sampling::*;
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
        respondent_id: format!("{}", id),
        survey_id,
        region: Some(region),
        income: Some(income),
        locality: Some(locality),
        age: Some(35),
        collected_on: None,
        attributes: vec![(
            "genero".to_string(),
            if id % 2 == 0 { "Feminino" } else { "Masculino" }.to_string(),
        )],
    }
}

/// Every region, income and locality combination, spread over surveys 1 to 4.
fn mixed_pool(n: usize) -> Pool {
    let rows: Vec<Respondent> = (0..n)
        .map(|i| {
            respondent(
                i,
                1 + (i % 4) as SurveyId,
                Region::all()[i % 5],
                IncomeBracket::all()[(i / 5) % 5],
                Locality::all()[(i / 25) % 2],
            )
        })
        .collect();
    Pool::new(rows).unwrap()
}

fn single_stratum_request(size: usize) -> SamplingRequest {
    SamplingRequest {
        region_weights: Weights::new(
            Region::all()
                .iter()
                .map(|r| (*r, if *r == Region::Sudeste { 100.0 } else { 0.0 }))
                .collect(),
        ),
        income_weights: Weights::new(
            IncomeBracket::all()
                .iter()
                .map(|c| {
                    let w = if *c == IncomeBracket::From5000To10000 {
                        100.0
                    } else {
                        0.0
                    };
                    (*c, w)
                })
                .collect(),
        ),
        locality_weights: Weights::new(vec![(Locality::Capital, 100.0), (Locality::Interior, 0.0)]),
        requested_size: size,
        seed: Some(2024),
        ..SamplingRequest::default()
    }
}

fn completed(pool: &Pool, request: &SamplingRequest) -> SamplingResponse {
    match run_sampling(pool, request).unwrap() {
        SamplingOutcome::Completed(r) => *r,
        SamplingOutcome::NoData { .. } => panic!("expected a completed sampling"),
    }
}

fn count_in_stratum(pool: &Pool, members: &BTreeSet<RespondentKey>, s: &Stratum) -> usize {
    members
        .iter()
        .filter(|k| pool.get(k).and_then(|r| r.stratum()) == Some(*s))
        .count()
}

#[test]
fn no_duplicate_respondents() {
    let _ = env_logger::try_init();
    let pool = mixed_pool(600);
    let request = SamplingRequest {
        requested_size: 240,
        include_surveys: [2].into_iter().collect(),
        seed: Some(5),
        ..SamplingRequest::default()
    };
    let r = completed(&pool, &request);
    let forced = &r.forced;
    // Every draw landed on a distinct respondent.
    assert_eq!(
        forced.len(),
        forced.core_kept + forced.quota_draws + forced.bracket_backfill + forced.global_backfill
    );
    let drawn: usize = r.proportional.stratum_counts.iter().map(|(_, n)| *n).sum();
    assert_eq!(r.proportional.len(), drawn);
}

#[test]
fn core_cohort_takes_precedence() {
    let pool = mixed_pool(400);
    let mut request = SamplingRequest {
        requested_size: 150,
        include_surveys: [3].into_iter().collect(),
        exclude_surveys: [3].into_iter().collect(),
        seed: Some(11),
        ..SamplingRequest::default()
    };
    let r = completed(&pool, &request);
    assert_eq!(r.core_size, 100);
    for respondent in pool.respondents().iter().filter(|r| r.survey_id == 3) {
        assert!(r.forced.members.contains(&respondent.key()));
    }
    assert_eq!(r.forced.len(), 150);

    // Core respondents bypass the age filter.
    request.age_range = AgeRange { min: 50, max: 60 };
    let r = completed(&pool, &request);
    assert_eq!(r.free_size, 0);
    assert_eq!(r.forced.len(), 100);
}

#[test]
fn excluded_surveys_never_appear() {
    let pool = mixed_pool(500);
    let request = SamplingRequest {
        requested_size: 450,
        exclude_surveys: [1, 4].into_iter().collect(),
        seed: Some(3),
        ..SamplingRequest::default()
    };
    let r = completed(&pool, &request);
    let all: Vec<&RespondentKey> = r
        .forced
        .members
        .iter()
        .chain(r.proportional.members.iter())
        .collect();
    assert!(!all.is_empty());
    assert!(all.iter().all(|k| k.survey_id == 2 || k.survey_id == 3));
    // Only 250 respondents are eligible.
    assert_eq!(r.forced.len(), 250);
}

#[test]
fn forced_size_is_bounded() {
    let pool = mixed_pool(300);
    for size in [1, 37, 120, 299, 300, 301, 1000] {
        let request = SamplingRequest {
            requested_size: size,
            seed: Some(size as u64),
            ..SamplingRequest::default()
        };
        let eligible = EligiblePool::new(&pool, &request);
        let mut rng = StdRng::seed_from_u64(1);
        let forced = allocate_forced(&eligible, &request, &mut rng);
        assert!(forced.len() <= size);
        assert_eq!(forced.len(), size.min(eligible.len()));
    }
}

#[test]
fn proportional_never_exceeds_availability() {
    let pool = mixed_pool(333);
    let request = SamplingRequest {
        requested_size: 500,
        seed: Some(8),
        ..SamplingRequest::default()
    };
    let r = completed(&pool, &request);
    assert!(r.proportional.len() <= request.requested_size);
    for (s, n) in r.proportional.stratum_counts.iter() {
        let sp = r.plan.stratum(s).unwrap();
        assert!(*n <= sp.available_n);
        assert_eq!(count_in_stratum(&pool, &r.proportional.members, s), *n);
    }
}

#[test]
fn weight_sums_are_validated() {
    let pool = mixed_pool(50);
    let with_locality = |capital: f64, interior: f64| SamplingRequest {
        locality_weights: Weights::new(vec![
            (Locality::Capital, capital),
            (Locality::Interior, interior),
        ]),
        requested_size: 10,
        seed: Some(1),
        ..SamplingRequest::default()
    };
    for (capital, interior) in [(60.0, 39.0), (60.0, 41.0)] {
        let err = run_sampling(&pool, &with_locality(capital, interior)).unwrap_err();
        assert!(matches!(
            err,
            SamplingError::Configuration(ConfigurationIssue::WeightSum {
                dimension: Dimension::Locality,
                ..
            })
        ));
    }
    assert!(run_sampling(&pool, &with_locality(60.0, 40.0)).is_ok());
    assert!(run_sampling(&pool, &with_locality(60.0, 40.05)).is_ok());

    let request = SamplingRequest {
        requested_size: 0,
        ..SamplingRequest::default()
    };
    assert_eq!(
        run_sampling(&pool, &request).unwrap_err(),
        SamplingError::Configuration(ConfigurationIssue::RequestedSizeNotPositive)
    );
}

#[test]
fn scenario_single_stratum_with_backfill() {
    let _ = env_logger::try_init();
    let mut rows: Vec<Respondent> = (0..150)
        .map(|i| {
            respondent(
                i,
                1,
                Region::Sudeste,
                IncomeBracket::From5000To10000,
                Locality::Capital,
            )
        })
        .collect();
    rows.extend((150..1000).map(|i| {
        respondent(
            i,
            2,
            Region::all()[1 + i % 4],
            IncomeBracket::all()[[0, 1, 3, 4][i % 4]],
            Locality::all()[i % 2],
        )
    }));
    let pool = Pool::new(rows).unwrap();
    let request = single_stratum_request(200);
    let target = Stratum {
        region: Region::Sudeste,
        income: IncomeBracket::From5000To10000,
        locality: Locality::Capital,
    };

    let r = completed(&pool, &request);
    assert_eq!(r.forced.len(), 200);
    assert_eq!(count_in_stratum(&pool, &r.forced.members, &target), 150);
    assert_eq!(r.forced.quota_draws, 150);
    assert_eq!(r.forced.global_backfill, 50);

    assert_eq!(r.proportional.min_ratio, 0.75);
    assert_eq!(r.proportional.len(), 150);
    assert_eq!(r.proportional.stratum_counts, vec![(target, 150)]);

    let sp = r.plan.stratum(&target).unwrap();
    assert_eq!(sp.target_n, 200.0);
    assert_eq!(sp.available_n, 150);
    assert_eq!(r.gaps.total, 50);
    assert!(r.bottlenecks.is_empty());
}

#[test]
fn scenario_core_cohort_larger_than_size() {
    let mut rows: Vec<Respondent> = (0..300)
        .map(|i| {
            respondent(
                i,
                7,
                Region::all()[i % 5],
                IncomeBracket::all()[i % 5],
                Locality::all()[i % 2],
            )
        })
        .collect();
    rows.extend((300..500).map(|i| {
        respondent(
            i,
            8,
            Region::Sul,
            IncomeBracket::Over20000,
            Locality::Interior,
        )
    }));
    let pool = Pool::new(rows).unwrap();
    let request = SamplingRequest {
        requested_size: 100,
        include_surveys: [7].into_iter().collect(),
        seed: Some(99),
        ..SamplingRequest::default()
    };
    let r = completed(&pool, &request);
    assert_eq!(r.forced.len(), 100);
    assert!(r.forced.core_truncated);
    assert_eq!(r.forced.quota_draws + r.forced.global_backfill, 0);
    assert!(r.forced.members.iter().all(|k| k.survey_id == 7));
    let realized: usize = r
        .deviation
        .iter()
        .filter(|d| d.dimension == Dimension::Locality)
        .map(|d| d.realized_n)
        .sum();
    assert_eq!(realized, 100);
}

#[test]
fn scenario_empty_target_stratum() {
    // Nobody in the capitals.
    let rows: Vec<Respondent> = (0..80)
        .map(|i| {
            respondent(
                i,
                1,
                Region::Sudeste,
                IncomeBracket::From5000To10000,
                Locality::Interior,
            )
        })
        .collect();
    let pool = Pool::new(rows).unwrap();
    let request = single_stratum_request(50);
    let target = Stratum {
        region: Region::Sudeste,
        income: IncomeBracket::From5000To10000,
        locality: Locality::Capital,
    };

    let r = completed(&pool, &request);
    assert_eq!(
        r.gaps.gaps,
        vec![CollectionGap {
            stratum: target,
            gap: 50
        }]
    );
    assert_eq!(r.proportional.min_ratio, 0.0);
    assert!(r.proportional.is_empty());
    assert_eq!(r.bottlenecks.strata, vec![target]);
    assert_eq!(r.bottlenecks.capital, 1);
    // The forced sample still reaches the requested size.
    assert_eq!(r.forced.len(), 50);
}

#[test]
fn planner_is_idempotent() {
    let pool = mixed_pool(250);
    let request = SamplingRequest {
        requested_size: 300,
        ..SamplingRequest::default()
    };
    let eligible = EligiblePool::new(&pool, &request);
    let first = plan_quotas(&eligible, &request);
    let second = plan_quotas(&eligible, &request);
    assert_eq!(first, second);
    assert!(matches!(first, Feasibility::Planned(_)));
}

#[test]
fn same_seed_same_samples() {
    let pool = mixed_pool(400);
    let request = SamplingRequest {
        requested_size: 90,
        seed: Some(31),
        ..SamplingRequest::default()
    };
    let a = completed(&pool, &request);
    let b = completed(&pool, &request);
    assert_eq!(a.forced, b.forced);
    assert_eq!(a.proportional, b.proportional);
    assert_eq!(a.fingerprint, b.fingerprint);

    let unseeded = SamplingRequest {
        seed: None,
        ..request.clone()
    };
    let c = completed(&pool, &unseeded);
    let replay = SamplingRequest {
        seed: Some(c.seed),
        ..request
    };
    assert_eq!(completed(&pool, &replay).forced, c.forced);
}

#[test]
fn nothing_left_after_filters() {
    let pool = mixed_pool(20);
    let request = SamplingRequest {
        age_range: AgeRange { min: 60, max: 70 },
        seed: Some(4),
        requested_size: 10,
        ..SamplingRequest::default()
    };
    assert!(matches!(
        run_sampling(&pool, &request).unwrap(),
        SamplingOutcome::NoData { seed: 4, .. }
    ));
}
