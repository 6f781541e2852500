use crate::sample::*;

use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "sampleName")]
    pub sample_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PoolSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeConfig {
    pub start: String,
    pub end: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AgeRangeConfig {
    pub min: u32,
    pub max: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Filters {
    #[serde(rename = "dateRange")]
    pub date_range: Option<DateRangeConfig>,
    #[serde(rename = "ageRange")]
    pub age_range: Option<AgeRangeConfig>,
    /// Collection dates after this day are treated as unknown.
    #[serde(rename = "referenceDate")]
    pub reference_date: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Cohorts {
    #[serde(rename = "includeSurveys", default)]
    pub include_surveys: Vec<SurveyId>,
    #[serde(rename = "excludeSurveys", default)]
    pub exclude_surveys: Vec<SurveyId>,
}

/// Weight maps keep the order of the document.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WeightsConfig {
    pub region: Option<JSMap<String, JSValue>>,
    pub income: Option<JSMap<String, JSValue>>,
    pub locality: Option<JSMap<String, JSValue>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(rename = "poolSources", default)]
    pub pool_sources: Vec<PoolSource>,
    pub filters: Option<Filters>,
    pub cohorts: Option<Cohorts>,
    pub weights: Option<WeightsConfig>,
    #[serde(rename = "requestedSize")]
    pub requested_size: Option<i64>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<u64>,
}

impl SampleConfig {
    pub fn sample_name(&self) -> String {
        self.output_settings
            .as_ref()
            .map(|os| os.sample_name.clone())
            .unwrap_or_else(|| "sample".to_string())
    }

    pub fn output_directory(&self) -> Option<String> {
        self.output_settings
            .as_ref()
            .and_then(|os| os.output_directory.clone())
    }

    pub fn reference_date(&self) -> BSampleResult<Option<NaiveDate>> {
        match self.filters.as_ref().and_then(|f| f.reference_date.as_deref()) {
            Some(s) => Ok(Some(parse_config_date(s)?)),
            None => Ok(None),
        }
    }

    /// Translates the configuration into a library request. Missing sections
    /// take the library defaults.
    pub fn to_request(&self) -> BSampleResult<SamplingRequest> {
        let mut request = SamplingRequest::default();
        if let Some(filters) = &self.filters {
            if let Some(dr) = &filters.date_range {
                request.date_range = Some(DateRange {
                    start: parse_config_date(&dr.start)?,
                    end: parse_config_date(&dr.end)?,
                });
            }
            if let Some(ar) = &filters.age_range {
                request.age_range = AgeRange {
                    min: ar.min,
                    max: ar.max,
                };
            }
        }
        if let Some(cohorts) = &self.cohorts {
            request.include_surveys = cohorts.include_surveys.iter().cloned().collect();
            request.exclude_surveys = cohorts.exclude_surveys.iter().cloned().collect();
        }
        if let Some(weights) = &self.weights {
            if let Some(m) = &weights.region {
                request.region_weights = read_weights(m, Dimension::Region)?;
            }
            if let Some(m) = &weights.income {
                request.income_weights = read_weights(m, Dimension::Income)?;
            }
            if let Some(m) = &weights.locality {
                request.locality_weights = read_weights(m, Dimension::Locality)?;
            }
        }
        if let Some(size) = self.requested_size {
            // Non-positive sizes are rejected by the request validation.
            request.requested_size = if size > 0 { size as usize } else { 0 };
        }
        request.seed = self.random_seed;
        Ok(request)
    }
}

pub fn read_config(path: &str) -> BSampleResult<SampleConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SampleConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> BSampleResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn parse_config_date(s: &str) -> BSampleResult<NaiveDate> {
    let d = parse_date(s).context(InvalidDateSnafu { value: s })?;
    Ok(d)
}

fn read_weights<C: Category>(
    m: &JSMap<String, JSValue>,
    dimension: Dimension,
) -> BSampleResult<Weights<C>> {
    let mut entries: Vec<(String, f64)> = Vec::new();
    for (label, v) in m.iter() {
        let w = v.as_f64().context(InvalidWeightSnafu {
            dimension: dimension.name(),
            category: label.clone(),
        })?;
        entries.push((label.clone(), w));
    }
    let weights = Weights::<C>::from_labels(&entries).context(SamplingSnafu {})?;
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_keeps_weight_order() {
        let js = r#"{
            "outputSettings": {"sampleName": "wave 3", "outputDirectory": "out"},
            "poolSources": [{"provider": "csv", "filePath": "pool.csv"}],
            "filters": {"dateRange": {"start": "2024-01-01", "end": "31/12/2024"}, "ageRange": {"min": 18, "max": 80}},
            "cohorts": {"includeSurveys": [7], "excludeSurveys": [3, 7]},
            "weights": {
                "income": {"5. Acima de R$ 20 mil": 50, "2. R$ 2,5 a R$ 5 mil": 50.0},
                "locality": {"Interior": 40, "Capital": 60}
            },
            "requestedSize": 300,
            "randomSeed": 42
        }"#;
        let config: SampleConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.sample_name(), "wave 3");
        assert_eq!(config.output_directory(), Some("out".to_string()));
        let request = config.to_request().unwrap();
        assert_eq!(request.requested_size, 300);
        assert_eq!(request.seed, Some(42));
        assert_eq!(request.age_range, AgeRange { min: 18, max: 80 });
        assert_eq!(
            request.date_range.map(|dr| dr.end),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
        let incomes: Vec<IncomeBracket> = request.income_weights.iter().map(|(c, _)| c).collect();
        assert_eq!(
            incomes,
            vec![IncomeBracket::Over20000, IncomeBracket::From2500To5000]
        );
        let localities: Vec<Locality> = request.locality_weights.iter().map(|(c, _)| c).collect();
        assert_eq!(localities, vec![Locality::Interior, Locality::Capital]);
        // Not given: library default.
        assert_eq!(request.region_weights, Weights::default());
        assert_eq!(request.exclude_surveys.len(), 2);
    }

    #[test]
    fn reference_date() {
        let config: SampleConfig =
            serde_json::from_str(r#"{"filters": {"referenceDate": "30/06/2024"}}"#).unwrap();
        assert_eq!(
            config.reference_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30)
        );
        assert_eq!(SampleConfig::default().reference_date().unwrap(), None);

        let config: SampleConfig =
            serde_json::from_str(r#"{"filters": {"referenceDate": "soon"}}"#).unwrap();
        assert!(matches!(
            *config.reference_date().unwrap_err(),
            SampleError::InvalidDate { .. }
        ));
    }

    #[test]
    fn minimal_config_and_bad_inputs() {
        let config: SampleConfig = serde_json::from_str(r#"{"requestedSize": -5}"#).unwrap();
        assert!(config.pool_sources.is_empty());
        assert_eq!(config.sample_name(), "sample");
        assert_eq!(config.to_request().unwrap().requested_size, 0);

        let config: SampleConfig =
            serde_json::from_str(r#"{"weights": {"region": {"Atlantis": 100}}}"#).unwrap();
        assert!(matches!(
            *config.to_request().unwrap_err(),
            SampleError::Sampling { .. }
        ));

        let config: SampleConfig =
            serde_json::from_str(r#"{"weights": {"region": {"Sul": "lots"}}}"#).unwrap();
        assert!(matches!(
            *config.to_request().unwrap_err(),
            SampleError::InvalidWeight { .. }
        ));
    }
}
