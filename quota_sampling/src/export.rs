//! Widening of the long-format answers for the members of a sample.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::config::*;
use crate::standardize::ColumnCatalog;

/// One answer of one respondent, as stored in the consolidated answers table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LongAnswer {
    pub respondent_id: String,
    pub survey_id: SurveyId,
    pub question_code: String,
    pub answer_value: String,
}

/// A rectangular table of strings. Missing values are empty strings.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct WideTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WideTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Names of the descriptive columns appended after the answers.
pub const DESCRIPTIVE_COLUMNS: [&str; 5] = [
    "regiao",
    "renda_macro_faixa",
    "localidade",
    "idade_numerica",
    "data_pesquisa",
];

/// Builds one row per sample member: `respondent_id`, `survey_id`, the
/// canonical question codes in sorted order, then the descriptive pool
/// attributes.
///
/// Question codes go through the catalog first. When a respondent answered
/// the same question twice, the first answer is kept. Members without any
/// answer still get a row.
pub fn widen(
    pool: &Pool,
    sample: &BTreeSet<RespondentKey>,
    answers: &[LongAnswer],
    catalog: &ColumnCatalog,
) -> WideTable {
    let mut by_key: HashMap<RespondentKey, BTreeMap<String, String>> = HashMap::new();
    let mut codes: BTreeSet<String> = BTreeSet::new();
    for a in answers.iter() {
        let key = RespondentKey {
            survey_id: a.survey_id,
            respondent_id: a.respondent_id.clone(),
        };
        if !sample.contains(&key) {
            continue;
        }
        let code = catalog.resolve(&a.question_code);
        codes.insert(code.clone());
        by_key
            .entry(key)
            .or_insert_with(BTreeMap::new)
            .entry(code)
            .or_insert_with(|| a.answer_value.clone());
    }

    // Attributes already written as a question code or a descriptive column are skipped.
    let mut attribute_names: Vec<String> = Vec::new();
    for key in sample.iter() {
        if let Some(r) = pool.get(key) {
            for (name, _) in r.attributes.iter() {
                let taken = codes.contains(name)
                    || DESCRIPTIVE_COLUMNS.contains(&name.as_str())
                    || name == "respondent_id"
                    || name == "survey_id";
                if !taken && !attribute_names.contains(name) {
                    attribute_names.push(name.clone());
                }
            }
        }
    }

    let mut columns: Vec<String> = vec!["respondent_id".to_string(), "survey_id".to_string()];
    columns.extend(codes.iter().cloned());
    columns.extend(DESCRIPTIVE_COLUMNS.iter().map(|c| c.to_string()));
    columns.extend(attribute_names.iter().cloned());

    let empty: BTreeMap<String, String> = BTreeMap::new();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(sample.len());
    for key in sample.iter() {
        let mut row: Vec<String> = vec![key.respondent_id.clone(), key.survey_id.to_string()];
        let answered = by_key.get(key).unwrap_or(&empty);
        for code in codes.iter() {
            row.push(answered.get(code).cloned().unwrap_or_default());
        }
        match pool.get(key) {
            Some(r) => {
                row.push(r.region.map(|c| c.label().to_string()).unwrap_or_default());
                row.push(r.income.map(|c| c.label().to_string()).unwrap_or_default());
                row.push(r.locality.map(|c| c.label().to_string()).unwrap_or_default());
                row.push(r.age.map(|a| a.to_string()).unwrap_or_default());
                row.push(r.collected_on.map(|d| d.to_string()).unwrap_or_default());
                for name in attribute_names.iter() {
                    row.push(r.attribute(name).unwrap_or("").to_string());
                }
            }
            None => {
                row.extend(
                    std::iter::repeat(String::new())
                        .take(DESCRIPTIVE_COLUMNS.len() + attribute_names.len()),
                );
            }
        }
        rows.push(row);
    }
    debug!(
        "widen: {} rows, {} question columns",
        rows.len(),
        codes.len()
    );
    WideTable { columns, rows }
}
