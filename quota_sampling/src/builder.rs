use chrono::NaiveDate;
use log::debug;

pub use crate::config::*;
use crate::standardize::{
    age_band, generation_for_age, income_bracket_for_text, locality_for_city, region_for_state,
};

/// Textual fields of a respondent, as found in a standardized or partially
/// standardized table.
///
/// The stratifying values are resolved in order: the standardized label first,
/// then the raw answer through the lookups of [`crate::standardize`].
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RespondentFields {
    pub respondent_id: String,
    pub survey_id: SurveyId,
    /// Standardized region label.
    pub region: Option<String>,
    /// Raw state abbreviation.
    pub state: Option<String>,
    /// Standardized macro bracket, or detailed band label.
    pub income: Option<String>,
    /// Raw income answer.
    pub income_text: Option<String>,
    /// Standardized locality label.
    pub locality: Option<String>,
    /// Raw city name.
    pub city: Option<String>,
    pub age: Option<u32>,
    pub collected_on: Option<NaiveDate>,
    pub attributes: Vec<(String, String)>,
}

/// A builder for assembling a pool.
///
/// ```
/// pub use quota_sampling::builder::PoolBuilder;
/// # use quota_sampling::SamplingError;
///
/// let mut builder = PoolBuilder::new();
/// builder.add_simple("r1", 7, "Sudeste", "2. R$ 2,5 a R$ 5 mil", "Capital", 34)?;
/// builder.add_simple("r2", 7, "Sul", "3. R$ 5 a R$ 10 mil", "Interior", 51)?;
/// let pool = builder.build()?;
/// assert_eq!(pool.len(), 2);
///
/// # Ok::<(), SamplingError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    pub(crate) _respondents: Vec<Respondent>,
}

impl PoolBuilder {
    pub fn new() -> PoolBuilder {
        PoolBuilder {
            _respondents: Vec::new(),
        }
    }

    /// Adds a respondent described by standardized labels.
    ///
    /// Unlike [`PoolBuilder::add_fields`], unknown labels are an error.
    pub fn add_simple(
        &mut self,
        respondent_id: &str,
        survey_id: SurveyId,
        region: &str,
        income: &str,
        locality: &str,
        age: u32,
    ) -> Result<(), SamplingError> {
        self.add_respondent(Respondent {
            respondent_id: respondent_id.to_string(),
            survey_id,
            region: Some(parse_label::<Region>(region)?),
            income: Some(parse_label::<IncomeBracket>(income)?),
            locality: Some(parse_label::<Locality>(locality)?),
            age: Some(age),
            collected_on: None,
            attributes: Vec::new(),
        })
    }

    /// Adds a respondent from raw or standardized fields.
    ///
    /// Values that cannot be resolved are left empty: the respondent is kept
    /// but does not match any stratum. The age band and the generation are
    /// derived from the age when the fields do not carry them.
    pub fn add_fields(&mut self, fields: &RespondentFields) -> Result<(), SamplingError> {
        let region = fields
            .region
            .as_deref()
            .and_then(Region::from_label)
            .or_else(|| fields.state.as_deref().and_then(region_for_state));
        let income = fields
            .income
            .as_deref()
            .and_then(income_bracket_for_text)
            .or_else(|| fields.income_text.as_deref().and_then(income_bracket_for_text));
        let locality = fields
            .locality
            .as_deref()
            .and_then(Locality::from_label)
            .or_else(|| fields.city.as_deref().and_then(locality_for_city));
        if region.is_none() || income.is_none() || locality.is_none() {
            debug!(
                "add_fields: respondent {} of survey {} is incomplete: region: {:?} income: {:?} locality: {:?}",
                fields.respondent_id, fields.survey_id, region, income, locality
            );
        }

        let mut attributes = fields.attributes.clone();
        if let Some(age) = fields.age {
            let has = |name: &str| attributes.iter().any(|(k, _)| k == name);
            let missing_band = !has("faixa_etaria");
            let missing_generation = !has("geracao");
            if missing_band {
                attributes.push(("faixa_etaria".to_string(), age_band(age).label().to_string()));
            }
            if missing_generation {
                attributes.push((
                    "geracao".to_string(),
                    generation_for_age(age).label().to_string(),
                ));
            }
        }

        self.add_respondent(Respondent {
            respondent_id: fields.respondent_id.clone(),
            survey_id: fields.survey_id,
            region,
            income,
            locality,
            age: fields.age,
            collected_on: fields.collected_on,
            attributes,
        })
    }

    pub fn add_respondent(&mut self, respondent: Respondent) -> Result<(), SamplingError> {
        self._respondents.push(respondent);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self._respondents.len()
    }

    pub fn is_empty(&self) -> bool {
        self._respondents.is_empty()
    }

    /// Checks the identities and freezes the pool.
    pub fn build(self) -> Result<Pool, SamplingError> {
        Pool::new(self._respondents)
    }
}

fn parse_label<C: Category>(label: &str) -> Result<C, SamplingError> {
    C::from_label(label).ok_or_else(|| SamplingError::UnknownCategory {
        dimension: C::DIMENSION,
        label: label.to_string(),
    })
}
