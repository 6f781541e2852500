use std::collections::HashMap;

use log::debug;

use crate::config::*;
use crate::EligiblePool;

/// Computes the per-stratum and per-category feasibility of a request.
///
/// Strata are enumerated over the configured categories of each weighting
/// set, in region, income, locality order. Availability is counted over the
/// core cohort and the free pool together.
pub fn plan_quotas(eligible: &EligiblePool, request: &SamplingRequest) -> Feasibility {
    if eligible.is_empty() {
        return Feasibility::NoData;
    }
    let size = request.requested_size as f64;

    let mut counts: HashMap<Stratum, usize> = HashMap::new();
    for r in eligible.respondents() {
        if let Some(s) = r.stratum() {
            *counts.entry(s).or_insert(0) += 1;
        }
    }

    let mut strata: Vec<StratumPlan> = Vec::new();
    for (region, rw) in request.region_weights.iter() {
        for (income, iw) in request.income_weights.iter() {
            for (locality, lw) in request.locality_weights.iter() {
                let stratum = Stratum {
                    region,
                    income,
                    locality,
                };
                // The percentages are multiplied before dividing, which keeps
                // whole targets exact.
                let pct_product = rw * iw * lw;
                let target_weight = pct_product / 1_000_000.0;
                let target_n = pct_product * size / 1_000_000.0;
                let available_n = counts.get(&stratum).copied().unwrap_or(0);
                let ratio = if target_n > 0.0 {
                    available_n as f64 / target_n
                } else {
                    1.0
                };
                strata.push(StratumPlan {
                    stratum,
                    target_weight,
                    target_n,
                    available_n,
                    ratio,
                });
            }
        }
    }
    debug!(
        "plan_quotas: {} strata, {} with a positive target",
        strata.len(),
        strata.iter().filter(|sp| sp.target_n > 0.0).count()
    );

    let mut categories: Vec<CategoryFeasibility> = Vec::new();
    categories.extend(category_rows(eligible, &request.region_weights, size));
    categories.extend(category_rows(eligible, &request.income_weights, size));
    categories.extend(category_rows(eligible, &request.locality_weights, size));

    Feasibility::Planned(QuotaPlan {
        requested_size: request.requested_size,
        strata,
        categories,
    })
}

fn category_rows<C: Category>(
    eligible: &EligiblePool,
    weights: &Weights<C>,
    size: f64,
) -> Vec<CategoryFeasibility> {
    let mut counts: HashMap<C, usize> = HashMap::new();
    for r in eligible.respondents() {
        if let Some(c) = C::of(r) {
            *counts.entry(c).or_insert(0) += 1;
        }
    }
    weights
        .iter()
        .map(|(c, w)| CategoryFeasibility {
            dimension: C::DIMENSION,
            category: c.label(),
            weight: w,
            // Truncated, not rounded.
            desired_n: (size * w / 100.0).floor() as u64,
            available_n: counts.get(&c).copied().unwrap_or(0),
        })
        .collect()
}
