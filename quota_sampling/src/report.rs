use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::*;

/// Compares the forced sample with the flat per-category targets.
pub fn deviation_report(
    plan: &QuotaPlan,
    pool: &Pool,
    forced: &ForcedSample,
) -> Vec<DeviationRow> {
    let mut realized: HashMap<(Dimension, &'static str), usize> = HashMap::new();
    for key in forced.members.iter() {
        if let Some(r) = pool.get(key) {
            for dimension in Dimension::ALL {
                if let Some(label) = r.category_label(dimension) {
                    *realized.entry((dimension, label)).or_insert(0) += 1;
                }
            }
        }
    }
    plan.categories
        .iter()
        .map(|cf| {
            let realized_n = realized
                .get(&(cf.dimension, cf.category))
                .copied()
                .unwrap_or(0);
            let deviation = realized_n as i64 - cf.desired_n as i64;
            let status = if deviation < 0 {
                Fulfillment::Under
            } else if deviation > 0 {
                Fulfillment::Over
            } else {
                Fulfillment::Exact
            };
            DeviationRow {
                dimension: cf.dimension,
                category: cf.category,
                desired_n: cf.desired_n,
                available_n: cf.available_n,
                realized_n,
                deviation,
                status,
            }
        })
        .collect()
}

/// The strata that cannot reach their target, with the number of respondents
/// still to collect.
pub fn collection_gaps(plan: &QuotaPlan) -> GapSummary {
    let gaps: Vec<CollectionGap> = plan
        .strata
        .iter()
        .filter(|sp| sp.target_n - sp.available_n as f64 > 0.0)
        .map(|sp| CollectionGap {
            stratum: sp.stratum,
            gap: (sp.target_n - sp.available_n as f64).ceil() as u64,
        })
        .collect();

    let total: u64 = gaps.iter().map(|g| g.gap).sum();
    let locality_total = |l: Locality| -> u64 {
        gaps.iter()
            .filter(|g| g.stratum.locality == l)
            .map(|g| g.gap)
            .sum()
    };
    GapSummary {
        total,
        capital_total: locality_total(Locality::Capital),
        interior_total: locality_total(Locality::Interior),
        by_region: sum_by(&gaps, |s| s.region),
        by_income: sum_by(&gaps, |s| s.income),
        by_locality: sum_by(&gaps, |s| s.locality),
        gaps,
    }
}

fn sum_by<C: Category>(gaps: &[CollectionGap], f: impl Fn(&Stratum) -> C) -> Vec<(C, u64)> {
    let mut sums: BTreeMap<C, u64> = BTreeMap::new();
    for g in gaps.iter() {
        *sums.entry(f(&g.stratum)).or_insert(0) += g.gap;
    }
    let mut res: Vec<(C, u64)> = sums.into_iter().collect();
    // Stable: ties keep the category order of the map.
    res.sort_by(|a, b| b.1.cmp(&a.1));
    res
}

impl GapSummary {
    /// Gap totals per (income, region), restricted to one locality or
    /// consolidated over both. Only non-zero cells are returned.
    pub fn matrix(&self, locality: Option<Locality>) -> Vec<(IncomeBracket, Region, u64)> {
        let mut cells: BTreeMap<(IncomeBracket, Region), u64> = BTreeMap::new();
        for g in self.gaps.iter() {
            if locality.map(|l| l == g.stratum.locality).unwrap_or(true) {
                *cells.entry((g.stratum.income, g.stratum.region)).or_insert(0) += g.gap;
            }
        }
        cells
            .into_iter()
            .filter(|(_, v)| *v > 0)
            .map(|((i, r), v)| (i, r, v))
            .collect()
    }
}

/// Strata somebody asked for and nobody is available in.
pub fn bottleneck_report(plan: &QuotaPlan) -> BottleneckReport {
    let strata = plan.bottleneck_strata();
    let count = |l: Locality| strata.iter().filter(|s| s.locality == l).count();
    let mut cells: BTreeMap<(IncomeBracket, Region), usize> = BTreeMap::new();
    for s in strata.iter() {
        *cells.entry((s.income, s.region)).or_insert(0) += 1;
    }
    BottleneckReport {
        capital: count(Locality::Capital),
        interior: count(Locality::Interior),
        matrix: cells.into_iter().map(|((i, r), n)| (i, r, n)).collect(),
        strata,
    }
}

/// Counts the members of a sample per (survey, region, locality), largest
/// groups first.
pub fn source_audit(pool: &Pool, members: &BTreeSet<RespondentKey>) -> Vec<SourceAuditRow> {
    let mut groups: BTreeMap<(SurveyId, Option<Region>, Option<Locality>), usize> = BTreeMap::new();
    for key in members.iter() {
        if let Some(r) = pool.get(key) {
            *groups
                .entry((r.survey_id, r.region, r.locality))
                .or_insert(0) += 1;
        }
    }
    let mut res: Vec<SourceAuditRow> = groups
        .into_iter()
        .map(|((survey_id, region, locality), count)| SourceAuditRow {
            survey_id,
            region,
            locality,
            count,
        })
        .collect();
    res.sort_by(|a, b| b.count.cmp(&a.count));
    res
}

/// Percentage share of every value of the stratifying dimensions and of the
/// carried attributes, within a sample.
///
/// Shares are computed over the members where the attribute is known. Values
/// are listed from the most to the least frequent.
pub fn sample_profile(pool: &Pool, members: &BTreeSet<RespondentKey>) -> Vec<ProfileRow> {
    let rows: Vec<&Respondent> = members.iter().filter_map(|k| pool.get(k)).collect();

    let mut attribute_names: Vec<String> = Vec::new();
    for r in rows.iter() {
        for (name, _) in r.attributes.iter() {
            if !attribute_names.contains(name) {
                attribute_names.push(name.clone());
            }
        }
    }

    let mut res: Vec<ProfileRow> = Vec::new();
    for dimension in Dimension::ALL {
        let values: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.category_label(dimension))
            .collect();
        res.extend(shares(dimension.name(), &values));
    }
    for name in attribute_names.iter() {
        let values: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.attribute(name))
            .filter(|v| !v.trim().is_empty())
            .collect();
        res.extend(shares(name, &values));
    }
    res
}

fn shares(attribute: &str, values: &[&str]) -> Vec<ProfileRow> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.iter() {
        *counts.entry(*v).or_insert(0) += 1;
    }
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let total = values.len() as f64;
    counts
        .into_iter()
        .map(|(value, n)| ProfileRow {
            attribute: attribute.to_string(),
            value: value.to_string(),
            share: 100.0 * n as f64 / total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stratum(region: Region, income: IncomeBracket, locality: Locality) -> Stratum {
        Stratum {
            region,
            income,
            locality,
        }
    }

    fn plan() -> QuotaPlan {
        let rows = [
            (stratum(Region::Sudeste, IncomeBracket::Over20000, Locality::Capital), 50.0, 0),
            (stratum(Region::Sudeste, IncomeBracket::Over20000, Locality::Interior), 12.4, 10),
            (stratum(Region::Norte, IncomeBracket::Over20000, Locality::Capital), 3.0, 8),
            (stratum(Region::Norte, IncomeBracket::Under2500, Locality::Interior), 0.0, 0),
            (stratum(Region::Norte, IncomeBracket::Under2500, Locality::Capital), 7.0, 0),
        ];
        QuotaPlan {
            requested_size: 100,
            strata: rows
                .iter()
                .map(|(s, t, a)| StratumPlan {
                    stratum: *s,
                    target_weight: t / 100.0,
                    target_n: *t,
                    available_n: *a,
                    ratio: if *t > 0.0 { *a as f64 / t } else { 1.0 },
                })
                .collect(),
            categories: vec![CategoryFeasibility {
                dimension: Dimension::Region,
                category: "Sudeste",
                weight: 60.0,
                desired_n: 3,
                available_n: 5,
            }],
        }
    }

    fn respondent(id: &str, region: Region, gender: &str) -> Respondent {
        Respondent {
            respondent_id: id.to_string(),
            survey_id: 4,
            region: Some(region),
            income: None,
            locality: Some(Locality::Capital),
            age: Some(30),
            collected_on: None,
            attributes: vec![("genero".to_string(), gender.to_string())],
        }
    }

    #[test]
    fn gaps_are_ceiled_and_aggregated() {
        let summary = collection_gaps(&plan());
        let gaps: Vec<u64> = summary.gaps.iter().map(|g| g.gap).collect();
        assert_eq!(gaps, vec![50, 3, 7]);
        assert_eq!(summary.total, 60);
        assert_eq!(summary.capital_total, 57);
        assert_eq!(summary.interior_total, 3);
        assert_eq!(summary.by_region, vec![(Region::Sudeste, 53), (Region::Norte, 7)]);
        assert_eq!(
            summary.by_income,
            vec![(IncomeBracket::Over20000, 53), (IncomeBracket::Under2500, 7)]
        );
        assert_eq!(
            summary.matrix(Some(Locality::Capital)),
            vec![
                (IncomeBracket::Under2500, Region::Norte, 7),
                (IncomeBracket::Over20000, Region::Sudeste, 50),
            ]
        );
        assert_eq!(
            summary.matrix(None),
            vec![
                (IncomeBracket::Under2500, Region::Norte, 7),
                (IncomeBracket::Over20000, Region::Sudeste, 53),
            ]
        );
    }

    #[test]
    fn bottlenecks_skip_zero_targets() {
        let report = bottleneck_report(&plan());
        assert_eq!(report.strata.len(), 2);
        assert_eq!(report.capital, 2);
        assert_eq!(report.interior, 0);
        assert_eq!(
            report.matrix,
            vec![
                (IncomeBracket::Under2500, Region::Norte, 1),
                (IncomeBracket::Over20000, Region::Sudeste, 1),
            ]
        );
    }

    #[test]
    fn deviation_classification() {
        let pool = Pool::new(vec![
            respondent("a", Region::Sudeste, "F"),
            respondent("b", Region::Sudeste, "M"),
        ])
        .unwrap();
        let forced = ForcedSample {
            members: pool.respondents().iter().map(|r| r.key()).collect(),
            ..ForcedSample::default()
        };
        let rows = deviation_report(&plan(), &pool, &forced);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].realized_n, 2);
        assert_eq!(rows[0].deviation, -1);
        assert_eq!(rows[0].status, Fulfillment::Under);
    }

    #[test]
    fn audit_and_profile() {
        let pool = Pool::new(vec![
            respondent("a", Region::Sudeste, "F"),
            respondent("b", Region::Sudeste, "F"),
            respondent("c", Region::Sul, "M"),
            respondent("d", Region::Sul, " "),
        ])
        .unwrap();
        let members: BTreeSet<RespondentKey> =
            pool.respondents().iter().take(3).map(|r| r.key()).collect();

        let audit = source_audit(&pool, &members);
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].region, Some(Region::Sudeste));
        assert_eq!(audit[0].count, 2);
        assert_eq!(audit[1].count, 1);

        let profile = sample_profile(&pool, &members);
        let gender: Vec<(&str, f64)> = profile
            .iter()
            .filter(|p| p.attribute == "genero")
            .map(|p| (p.value.as_str(), p.share))
            .collect();
        assert_eq!(gender.len(), 2);
        assert_eq!(gender[0].0, "F");
        assert!((gender[0].1 - 200.0 / 3.0).abs() < 1e-9);
        assert!(profile.iter().all(|p| p.attribute != "income"));
        let locality: Vec<&ProfileRow> =
            profile.iter().filter(|p| p.attribute == "locality").collect();
        assert_eq!(locality.len(), 1);
        assert_eq!(locality[0].share, 100.0);
    }
}
