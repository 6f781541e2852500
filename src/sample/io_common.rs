use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use quota_sampling::builder::RespondentFields;

use crate::sample::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `DD/MM/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(s, "%d/%m/%Y").ok())
}

/// Spreadsheet serial day number to a date (day 0 is 1899-12-30).
pub fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Spreadsheets often store whole numbers as floats ("34.0").
fn parse_whole_number(s: &str) -> Option<u32> {
    let s = s.trim();
    s.parse::<u32>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| *f >= 0.0 && f.is_finite())
            .map(|f| f.trunc() as u32)
    })
}

const ID_COLUMN: &str = "respondent_id";
const SURVEY_COLUMN: &str = "survey_id";

/// Where each respondent field lives in a pool table.
///
/// Several spellings are accepted per field: the standardized column first,
/// then the raw answer columns.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PoolColumns {
    respondent_id: Option<usize>,
    survey_id: usize,
    region: Option<usize>,
    state: Option<usize>,
    income: Vec<usize>,
    income_text: Option<usize>,
    locality: Option<usize>,
    city: Option<usize>,
    age: Option<usize>,
    date: Option<usize>,
    attributes: Vec<(usize, String)>,
}

impl PoolColumns {
    pub fn from_header(header: &[String], path: &str) -> BSampleResult<PoolColumns> {
        let find = |names: &[&str]| -> Option<usize> {
            names
                .iter()
                .find_map(|n| header.iter().position(|h| h.trim() == *n))
        };
        let survey_id = find(&[SURVEY_COLUMN]).context(MissingColumnSnafu {
            column: SURVEY_COLUMN,
            path,
        })?;
        let mut cols = PoolColumns {
            respondent_id: find(&[ID_COLUMN]),
            survey_id,
            region: find(&["regiao"]),
            state: find(&["estado_original", "Estado", "estado"]),
            income: ["renda_macro_faixa", "renda_faixa_padronizada"]
                .iter()
                .filter_map(|n| find(&[*n]))
                .collect(),
            income_text: find(&["renda_texto_original", "FE2P10"]),
            locality: find(&["localidade"]),
            city: find(&["cidade_original", "FE2P7"]),
            age: find(&["idade_numerica", "FE2P5"]),
            date: find(&["data_pesquisa", "Data"]),
            attributes: Vec::new(),
        };
        let used: Vec<usize> = cols.used();
        cols.attributes = header
            .iter()
            .enumerate()
            .filter(|(idx, _)| !used.contains(idx))
            .map(|(idx, h)| (idx, h.trim().to_string()))
            .filter(|(_, h)| !h.is_empty())
            .collect();
        debug!("PoolColumns::from_header: {:?}", cols);
        Ok(cols)
    }

    fn used(&self) -> Vec<usize> {
        let mut res: Vec<usize> = vec![self.survey_id];
        res.extend(self.income.iter().cloned());
        for o in [
            self.respondent_id,
            self.region,
            self.state,
            self.income_text,
            self.locality,
            self.city,
            self.age,
            self.date,
        ] {
            res.extend(o);
        }
        res
    }

    /// Reads one row. `lineno` is only used for messages and default ids.
    /// Collection dates after `today` are dropped.
    pub fn fields(
        &self,
        row: &[String],
        lineno: usize,
        default_id: &impl Fn(usize) -> String,
        today: NaiveDate,
    ) -> BSampleResult<RespondentFields> {
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "-")
        };

        let survey_s = cell(Some(self.survey_id)).unwrap_or_default();
        let survey_id = parse_whole_number(&survey_s).context(InvalidValueSnafu {
            column: SURVEY_COLUMN,
            value: survey_s.clone(),
            lineno,
        })?;
        let respondent_id = cell(self.respondent_id).unwrap_or_else(|| default_id(lineno));
        let age = cell(self.age).and_then(|s| parse_whole_number(&s));
        // Future collection dates are data entry errors.
        let collected_on = cell(self.date)
            .and_then(|s| parse_date(&s))
            .filter(|d| *d <= today);

        Ok(RespondentFields {
            respondent_id,
            survey_id,
            region: cell(self.region),
            state: cell(self.state),
            income: self.income.iter().find_map(|i| cell(Some(*i))),
            income_text: cell(self.income_text),
            locality: cell(self.locality),
            city: cell(self.city),
            age,
            collected_on,
            attributes: self
                .attributes
                .iter()
                .filter_map(|(i, name)| cell(Some(*i)).map(|v| (name.clone(), v)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dates() {
        let d = NaiveDate::from_ymd_opt(2023, 5, 17);
        assert_eq!(parse_date("2023-05-17"), d);
        assert_eq!(parse_date(" 2023-05-17 14:02:00"), d);
        assert_eq!(parse_date("17/05/2023"), d);
        assert_eq!(parse_date("May 17"), None);
        assert_eq!(excel_serial_date(45063.0), d);
    }

    #[test]
    fn columns_and_fields() {
        let h = header(&[
            "survey_id",
            "respondent_id",
            "Estado",
            "FE2P7",
            "idade_numerica",
            "genero",
            "data_pesquisa",
        ]);
        let cols = PoolColumns::from_header(&h, "pool.csv").unwrap();
        let default_id = make_default_id("dir/pool.csv");
        let row = header(&["12", "", "RJ", "Niterói - RJ", "41.0", "Feminino", "2099-01-01"]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let fields = cols.fields(&row, 3, &default_id, today).unwrap();
        assert_eq!(fields.survey_id, 12);
        assert_eq!(fields.respondent_id, "pool.csv-00000003");
        assert_eq!(fields.state, Some("RJ".to_string()));
        assert_eq!(fields.city, Some("Niterói - RJ".to_string()));
        assert_eq!(fields.age, Some(41));
        assert_eq!(fields.collected_on, None);
        assert_eq!(
            fields.attributes,
            vec![("genero".to_string(), "Feminino".to_string())]
        );

        let bad = header(&["twelve", "a", "", "", "", "", ""]);
        assert!(matches!(
            *cols.fields(&bad, 4, &default_id, today).unwrap_err(),
            SampleError::InvalidValue { lineno: 4, .. }
        ));

        // Only dates after the reference day are dropped.
        let dated = header(&["12", "b", "", "", "", "", "2024-06-30"]);
        let fields = cols.fields(&dated, 5, &default_id, today).unwrap();
        assert_eq!(fields.collected_on, Some(today));
        let day_before = NaiveDate::from_ymd_opt(2024, 6, 29).unwrap();
        let fields = cols.fields(&dated, 5, &default_id, day_before).unwrap();
        assert_eq!(fields.collected_on, None);

        assert!(matches!(
            *PoolColumns::from_header(&header(&["id"]), "x.csv").unwrap_err(),
            SampleError::MissingColumn { .. }
        ));
    }
}
