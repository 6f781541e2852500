// ********* Categories ***********

use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use chrono::NaiveDate;

pub type SurveyId = u32;

/// The three stratification dimensions.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Dimension {
    Region,
    Income,
    Locality,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Region, Dimension::Income, Dimension::Locality];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Region => "region",
            Dimension::Income => "income",
            Dimension::Locality => "locality",
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A closed set of values along one dimension.
///
/// The order of `all()` is the canonical order used when a weighting set does
/// not say otherwise (reports, matrices, tie-breaks).
pub trait Category: Copy + Eq + Ord + Hash + Debug + 'static {
    const DIMENSION: Dimension;

    fn all() -> &'static [Self];

    fn label(&self) -> &'static str;

    /// The value of this dimension for a respondent.
    fn of(r: &Respondent) -> Option<Self>;

    /// Parses a label. Surrounding whitespace and ASCII case are ignored.
    fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::all()
            .iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .copied()
    }

    fn position(&self) -> usize {
        Self::all().iter().position(|c| c == self).unwrap_or(usize::MAX)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Region {
    Sudeste,
    Nordeste,
    Sul,
    CentroOeste,
    Norte,
}

impl Category for Region {
    const DIMENSION: Dimension = Dimension::Region;

    fn all() -> &'static [Region] {
        &[
            Region::Sudeste,
            Region::Nordeste,
            Region::Sul,
            Region::CentroOeste,
            Region::Norte,
        ]
    }

    fn label(&self) -> &'static str {
        match self {
            Region::Sudeste => "Sudeste",
            Region::Nordeste => "Nordeste",
            Region::Sul => "Sul",
            Region::CentroOeste => "Centro-Oeste",
            Region::Norte => "Norte",
        }
    }

    fn of(r: &Respondent) -> Option<Region> {
        r.region
    }
}

/// Household income macro-bracket. The declaration order is the income order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum IncomeBracket {
    Under2500,
    From2500To5000,
    From5000To10000,
    From10000To20000,
    Over20000,
}

impl Category for IncomeBracket {
    const DIMENSION: Dimension = Dimension::Income;

    fn all() -> &'static [IncomeBracket] {
        &[
            IncomeBracket::Under2500,
            IncomeBracket::From2500To5000,
            IncomeBracket::From5000To10000,
            IncomeBracket::From10000To20000,
            IncomeBracket::Over20000,
        ]
    }

    fn label(&self) -> &'static str {
        match self {
            IncomeBracket::Under2500 => "1. Menor que R$ 2,5 mil",
            IncomeBracket::From2500To5000 => "2. R$ 2,5 a R$ 5 mil",
            IncomeBracket::From5000To10000 => "3. R$ 5 a R$ 10 mil",
            IncomeBracket::From10000To20000 => "4. R$ 10 a R$ 20 mil",
            IncomeBracket::Over20000 => "5. Acima de R$ 20 mil",
        }
    }

    fn of(r: &Respondent) -> Option<IncomeBracket> {
        r.income
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Locality {
    Capital,
    Interior,
}

impl Category for Locality {
    const DIMENSION: Dimension = Dimension::Locality;

    fn all() -> &'static [Locality] {
        &[Locality::Capital, Locality::Interior]
    }

    fn label(&self) -> &'static str {
        match self {
            Locality::Capital => "Capital",
            Locality::Interior => "Interior",
        }
    }

    fn of(r: &Respondent) -> Option<Locality> {
        r.locality
    }
}

// ********* Input data structures ***********

/// Identity of a respondent across the whole warehouse.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct RespondentKey {
    pub survey_id: SurveyId,
    pub respondent_id: String,
}

/// One standardized survey participant.
///
/// The stratifying attributes are optional: a row with a missing value never
/// matches a stratum, but it can still be drawn by the dimension-free backfill
/// or forced in through the core cohort.
#[derive(PartialEq, Debug, Clone)]
pub struct Respondent {
    pub respondent_id: String,
    pub survey_id: SurveyId,
    pub region: Option<Region>,
    pub income: Option<IncomeBracket>,
    pub locality: Option<Locality>,
    pub age: Option<u32>,
    pub collected_on: Option<NaiveDate>,
    /// Descriptive attributes carried through untouched (gender, purchase intent, ...).
    pub attributes: Vec<(String, String)>,
}

impl Respondent {
    pub fn key(&self) -> RespondentKey {
        RespondentKey {
            survey_id: self.survey_id,
            respondent_id: self.respondent_id.clone(),
        }
    }

    /// The stratum of this respondent, if all three stratifying values are known.
    pub fn stratum(&self) -> Option<Stratum> {
        Some(Stratum {
            region: self.region?,
            income: self.income?,
            locality: self.locality?,
        })
    }

    pub fn category_label(&self, dimension: Dimension) -> Option<&'static str> {
        match dimension {
            Dimension::Region => self.region.map(|c| c.label()),
            Dimension::Income => self.income.map(|c| c.label()),
            Dimension::Locality => self.locality.map(|c| c.label()),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A read-only snapshot of standardized respondents.
///
/// Invariant: no two respondents share the same `(respondent_id, survey_id)`.
#[derive(Debug, Clone)]
pub struct Pool {
    respondents: Vec<Respondent>,
    index: HashMap<RespondentKey, usize>,
}

impl Pool {
    pub fn new(respondents: Vec<Respondent>) -> Result<Pool, SamplingError> {
        let mut index: HashMap<RespondentKey, usize> = HashMap::with_capacity(respondents.len());
        for (idx, r) in respondents.iter().enumerate() {
            if index.insert(r.key(), idx).is_some() {
                return Err(SamplingError::DuplicateRespondent {
                    respondent_id: r.respondent_id.clone(),
                    survey_id: r.survey_id,
                });
            }
        }
        Ok(Pool { respondents, index })
    }

    pub fn respondents(&self) -> &[Respondent] {
        &self.respondents
    }

    pub fn len(&self) -> usize {
        self.respondents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }

    pub fn get(&self, key: &RespondentKey) -> Option<&Respondent> {
        self.index.get(key).map(|idx| &self.respondents[*idx])
    }

    pub fn survey_ids(&self) -> BTreeSet<SurveyId> {
        self.respondents.iter().map(|r| r.survey_id).collect()
    }

    pub(crate) fn at(&self, idx: usize) -> &Respondent {
        &self.respondents[idx]
    }
}

// ********* Configuration **********

/// The accepted distance between the sum of a weighting set and 100.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.1;

/// Percentage weights (0..=100) over the categories of one dimension.
///
/// The order of the entries is significant: the hierarchical allocator visits
/// income brackets, regions and localities in this order.
#[derive(PartialEq, Debug, Clone)]
pub struct Weights<C: Category> {
    entries: Vec<(C, f64)>,
}

impl<C: Category> Weights<C> {
    pub fn new(entries: Vec<(C, f64)>) -> Weights<C> {
        Weights { entries }
    }

    /// Builds a weighting set from textual labels, keeping their order.
    pub fn from_labels(entries: &[(String, f64)]) -> Result<Weights<C>, SamplingError> {
        let mut res: Vec<(C, f64)> = Vec::new();
        for (label, w) in entries.iter() {
            let c = C::from_label(label).ok_or_else(|| SamplingError::UnknownCategory {
                dimension: C::DIMENSION,
                label: label.clone(),
            })?;
            res.push((c, *w));
        }
        Ok(Weights { entries: res })
    }

    pub fn iter(&self) -> impl Iterator<Item = (C, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// The weight of a category, 0 when the category is not listed.
    pub fn weight(&self, c: C) -> f64 {
        self.entries
            .iter()
            .find(|(c2, _)| *c2 == c)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn fraction(&self, c: C) -> f64 {
        self.weight(c) / 100.0
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| *w).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigurationIssue> {
        let dimension = C::DIMENSION;
        if self.entries.is_empty() {
            return Err(ConfigurationIssue::EmptyWeights { dimension });
        }
        let mut seen: BTreeSet<C> = BTreeSet::new();
        for (c, w) in self.entries.iter() {
            if !seen.insert(*c) {
                return Err(ConfigurationIssue::DuplicateCategory {
                    dimension,
                    category: c.label().to_string(),
                });
            }
            if !(0.0..=100.0).contains(w) {
                return Err(ConfigurationIssue::WeightOutOfRange {
                    dimension,
                    category: c.label().to_string(),
                    weight: *w,
                });
            }
        }
        let total = self.total();
        if (total - 100.0).abs() >= WEIGHT_SUM_TOLERANCE {
            return Err(ConfigurationIssue::WeightSum { dimension, total });
        }
        Ok(())
    }
}

impl Default for Weights<Region> {
    fn default() -> Self {
        Weights::new(vec![
            (Region::Sudeste, 30.0),
            (Region::Nordeste, 30.0),
            (Region::Sul, 25.0),
            (Region::CentroOeste, 10.0),
            (Region::Norte, 5.0),
        ])
    }
}

impl Default for Weights<IncomeBracket> {
    fn default() -> Self {
        Weights::new(vec![
            (IncomeBracket::Under2500, 0.0),
            (IncomeBracket::From2500To5000, 30.0),
            (IncomeBracket::From5000To10000, 30.0),
            (IncomeBracket::From10000To20000, 20.0),
            (IncomeBracket::Over20000, 20.0),
        ])
    }
}

impl Default for Weights<Locality> {
    fn default() -> Self {
        Weights::new(vec![(Locality::Capital, 60.0), (Locality::Interior, 40.0)])
    }
}

/// Inclusive age bounds.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }
}

/// Inclusive collection date bounds.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }
}

/// Everything one sampling call needs besides the pool.
#[derive(PartialEq, Debug, Clone)]
pub struct SamplingRequest {
    pub date_range: Option<DateRange>,
    pub age_range: AgeRange,
    /// Surveys whose respondents are always part of the forced sample.
    pub include_surveys: BTreeSet<SurveyId>,
    /// Surveys whose respondents are never eligible. Inclusion wins on conflicts.
    pub exclude_surveys: BTreeSet<SurveyId>,
    pub region_weights: Weights<Region>,
    pub income_weights: Weights<IncomeBracket>,
    pub locality_weights: Weights<Locality>,
    pub requested_size: usize,
    /// Seed of the random draws. A fresh seed is picked for every call when absent.
    pub seed: Option<u64>,
}

impl SamplingRequest {
    pub const DEFAULT_REQUESTED_SIZE: usize = 1200;
    pub const DEFAULT_AGE_RANGE: AgeRange = AgeRange { min: 21, max: 71 };

    /// Surveys listed both as included and excluded.
    pub fn conflicting_surveys(&self) -> BTreeSet<SurveyId> {
        self.include_surveys
            .intersection(&self.exclude_surveys)
            .cloned()
            .collect()
    }

    /// The exclusion set once the included surveys have been removed from it.
    pub fn effective_exclusions(&self) -> BTreeSet<SurveyId> {
        self.exclude_surveys
            .difference(&self.include_surveys)
            .cloned()
            .collect()
    }

    /// Checks the request against the pool it is going to run on.
    pub fn validate(&self, pool: &Pool) -> Result<(), SamplingError> {
        self.region_weights.validate()?;
        self.income_weights.validate()?;
        self.locality_weights.validate()?;
        if self.requested_size == 0 {
            return Err(ConfigurationIssue::RequestedSizeNotPositive.into());
        }
        if self.age_range.min > self.age_range.max {
            return Err(ConfigurationIssue::InvertedAgeRange {
                min: self.age_range.min,
                max: self.age_range.max,
            }
            .into());
        }
        if let Some(dr) = self.date_range {
            if dr.start > dr.end {
                return Err(ConfigurationIssue::InvertedDateRange {
                    start: dr.start,
                    end: dr.end,
                }
                .into());
            }
        }
        let known = pool.survey_ids();
        for sid in self.include_surveys.iter().chain(self.exclude_surveys.iter()) {
            if !known.contains(sid) {
                return Err(ConfigurationIssue::UnknownSurvey { survey_id: *sid }.into());
            }
        }
        Ok(())
    }

    /// A stable textual rendering of the request, used for fingerprinting.
    pub fn canonical_string(&self) -> String {
        fn weights<C: Category>(w: &Weights<C>) -> String {
            w.iter()
                .map(|(c, x)| format!("{}={}", c.label(), x))
                .collect::<Vec<String>>()
                .join(",")
        }
        fn ids(s: &BTreeSet<SurveyId>) -> String {
            s.iter()
                .map(|x| x.to_string())
                .collect::<Vec<String>>()
                .join(",")
        }
        let dates = match self.date_range {
            Some(dr) => format!("{}..{}", dr.start, dr.end),
            None => "*".to_string(),
        };
        let seed = match self.seed {
            Some(s) => s.to_string(),
            None => "*".to_string(),
        };
        format!(
            "dates:{};ages:{}..{};include:{};exclude:{};region:{};income:{};locality:{};size:{};seed:{}",
            dates,
            self.age_range.min,
            self.age_range.max,
            ids(&self.include_surveys),
            ids(&self.exclude_surveys),
            weights(&self.region_weights),
            weights(&self.income_weights),
            weights(&self.locality_weights),
            self.requested_size,
            seed
        )
    }

    /// Hex-encoded SHA-256 digest of the canonical rendering.
    pub fn fingerprint(&self) -> String {
        sha256::digest(self.canonical_string())
    }
}

impl Default for SamplingRequest {
    fn default() -> Self {
        SamplingRequest {
            date_range: None,
            age_range: SamplingRequest::DEFAULT_AGE_RANGE,
            include_surveys: BTreeSet::new(),
            exclude_surveys: BTreeSet::new(),
            region_weights: Weights::default(),
            income_weights: Weights::default(),
            locality_weights: Weights::default(),
            requested_size: SamplingRequest::DEFAULT_REQUESTED_SIZE,
            seed: None,
        }
    }
}

// ******** Output data structures *********

/// One cell of the region × income × locality cross-product.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct Stratum {
    pub region: Region,
    pub income: IncomeBracket,
    pub locality: Locality,
}

impl Display for Stratum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.region.label(),
            self.income.label(),
            self.locality.label()
        )
    }
}

/// Planning data for one stratum.
#[derive(PartialEq, Debug, Clone)]
pub struct StratumPlan {
    pub stratum: Stratum,
    /// Product of the three weight fractions.
    pub target_weight: f64,
    /// `target_weight × requested_size`, kept fractional.
    pub target_n: f64,
    pub available_n: usize,
    /// `available_n / target_n`, or 1.0 when nobody is wanted in this stratum.
    pub ratio: f64,
}

/// Feasibility of a single category, independently of the other two dimensions.
#[derive(PartialEq, Debug, Clone)]
pub struct CategoryFeasibility {
    pub dimension: Dimension,
    pub category: &'static str,
    pub weight: f64,
    pub desired_n: u64,
    pub available_n: usize,
}

/// Output of the quota planner.
#[derive(PartialEq, Debug, Clone)]
pub struct QuotaPlan {
    pub requested_size: usize,
    /// Every stratum of the cross-product, in region, income, locality weight order.
    pub strata: Vec<StratumPlan>,
    /// One row per (dimension, category), in dimension then weight order.
    pub categories: Vec<CategoryFeasibility>,
}

impl QuotaPlan {
    pub fn stratum(&self, s: &Stratum) -> Option<&StratumPlan> {
        self.strata.iter().find(|sp| sp.stratum == *s)
    }

    /// Smallest ratio among the strata somebody asked for, capped at 1.0.
    pub fn min_ratio(&self) -> f64 {
        self.strata
            .iter()
            .filter(|sp| sp.target_n > 0.0)
            .map(|sp| sp.ratio)
            .fold(1.0, f64::min)
    }

    /// Strata with a positive target and nobody available.
    pub fn bottleneck_strata(&self) -> Vec<Stratum> {
        self.strata
            .iter()
            .filter(|sp| sp.target_n > 0.0 && sp.available_n == 0)
            .map(|sp| sp.stratum)
            .collect()
    }
}

/// Result of the quota planner.
#[derive(PartialEq, Debug, Clone)]
pub enum Feasibility {
    /// Nothing survived the base filters and no core cohort is present.
    NoData,
    Planned(QuotaPlan),
}

/// The sample that hits the requested size, built by hierarchical quota filling.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ForcedSample {
    pub members: BTreeSet<RespondentKey>,
    /// Core cohort respondents kept in the sample.
    pub core_kept: usize,
    /// Draws made by the region × locality sub-quotas.
    pub quota_draws: usize,
    /// Draws made to complete an income bracket quota.
    pub bracket_backfill: usize,
    /// Draws made from the whole remaining pool.
    pub global_backfill: usize,
    /// The core cohort alone exceeded the requested size and was subsampled.
    pub core_truncated: bool,
}

impl ForcedSample {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The sample that keeps the stratum proportions, scaled to what is available.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ProportionalSample {
    pub members: BTreeSet<RespondentKey>,
    pub min_ratio: f64,
    /// Number of respondents drawn per stratum, for strata with at least one draw.
    pub stratum_counts: Vec<(Stratum, usize)>,
}

impl ProportionalSample {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Fulfillment {
    /// Fewer respondents than desired.
    Under,
    /// More respondents than desired, compensating a shortfall elsewhere.
    Over,
    Exact,
}

impl Fulfillment {
    pub fn name(&self) -> &'static str {
        match self {
            Fulfillment::Under => "under",
            Fulfillment::Over => "over",
            Fulfillment::Exact => "exact",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct DeviationRow {
    pub dimension: Dimension,
    pub category: &'static str,
    pub desired_n: u64,
    pub available_n: usize,
    pub realized_n: usize,
    pub deviation: i64,
    pub status: Fulfillment,
}

/// "Collect `gap` more respondents in this stratum."
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CollectionGap {
    pub stratum: Stratum,
    pub gap: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct GapSummary {
    pub gaps: Vec<CollectionGap>,
    pub total: u64,
    pub capital_total: u64,
    pub interior_total: u64,
    /// Sums per category, largest first.
    pub by_region: Vec<(Region, u64)>,
    pub by_income: Vec<(IncomeBracket, u64)>,
    pub by_locality: Vec<(Locality, u64)>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BottleneckReport {
    pub strata: Vec<Stratum>,
    pub capital: usize,
    pub interior: usize,
    /// Number of bottleneck strata per (income, region), non-zero cells only.
    pub matrix: Vec<(IncomeBracket, Region, usize)>,
}

impl BottleneckReport {
    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }
}

/// Forced-sample counts grouped by origin.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceAuditRow {
    pub survey_id: SurveyId,
    pub region: Option<Region>,
    pub locality: Option<Locality>,
    pub count: usize,
}

/// Share (in percent) of one attribute value within a sample.
#[derive(PartialEq, Debug, Clone)]
pub struct ProfileRow {
    pub attribute: String,
    pub value: String,
    pub share: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SamplingResponse {
    pub seed: u64,
    pub fingerprint: String,
    pub core_size: usize,
    pub free_size: usize,
    pub plan: QuotaPlan,
    pub forced: ForcedSample,
    pub proportional: ProportionalSample,
    pub deviation: Vec<DeviationRow>,
    pub gaps: GapSummary,
    pub bottlenecks: BottleneckReport,
    pub source_audit: Vec<SourceAuditRow>,
    pub profile: Vec<ProfileRow>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum SamplingOutcome {
    /// Nothing is left once the filters are applied. No allocation was attempted.
    NoData { seed: u64, fingerprint: String },
    Completed(Box<SamplingResponse>),
}

// ******** Errors *********

/// Reasons a request is rejected before any computation.
#[derive(PartialEq, Debug, Clone)]
pub enum ConfigurationIssue {
    WeightSum {
        dimension: Dimension,
        total: f64,
    },
    WeightOutOfRange {
        dimension: Dimension,
        category: String,
        weight: f64,
    },
    DuplicateCategory {
        dimension: Dimension,
        category: String,
    },
    EmptyWeights {
        dimension: Dimension,
    },
    RequestedSizeNotPositive,
    InvertedAgeRange {
        min: u32,
        max: u32,
    },
    InvertedDateRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    UnknownSurvey {
        survey_id: SurveyId,
    },
}

impl Display for ConfigurationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationIssue::WeightSum { dimension, total } => write!(
                f,
                "{} weights sum to {} instead of 100",
                dimension, total
            ),
            ConfigurationIssue::WeightOutOfRange {
                dimension,
                category,
                weight,
            } => write!(
                f,
                "{} weight for {:?} is {}, expected a value between 0 and 100",
                dimension, category, weight
            ),
            ConfigurationIssue::DuplicateCategory {
                dimension,
                category,
            } => write!(f, "{} category {:?} is listed twice", dimension, category),
            ConfigurationIssue::EmptyWeights { dimension } => {
                write!(f, "no {} weights were given", dimension)
            }
            ConfigurationIssue::RequestedSizeNotPositive => {
                write!(f, "the requested sample size must be at least 1")
            }
            ConfigurationIssue::InvertedAgeRange { min, max } => {
                write!(f, "age range {}..{} is empty", min, max)
            }
            ConfigurationIssue::InvertedDateRange { start, end } => {
                write!(f, "date range {}..{} is empty", start, end)
            }
            ConfigurationIssue::UnknownSurvey { survey_id } => {
                write!(f, "survey {} does not appear in the pool", survey_id)
            }
        }
    }
}

/// Errors that prevent a sampling call from running.
#[derive(PartialEq, Debug, Clone)]
pub enum SamplingError {
    Configuration(ConfigurationIssue),
    DuplicateRespondent {
        respondent_id: String,
        survey_id: SurveyId,
    },
    UnknownCategory {
        dimension: Dimension,
        label: String,
    },
}

impl From<ConfigurationIssue> for SamplingError {
    fn from(issue: ConfigurationIssue) -> Self {
        SamplingError::Configuration(issue)
    }
}

impl Error for SamplingError {}

impl Display for SamplingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingError::Configuration(issue) => write!(f, "invalid configuration: {}", issue),
            SamplingError::DuplicateRespondent {
                respondent_id,
                survey_id,
            } => write!(
                f,
                "respondent {:?} of survey {} appears more than once in the pool",
                respondent_id, survey_id
            ),
            SamplingError::UnknownCategory { dimension, label } => {
                write!(f, "unknown {} category {:?}", dimension, label)
            }
        }
    }
}
