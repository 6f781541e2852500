// Primitives for reading CSV files.

use std::fs::File;

use crate::sample::io_common::{make_default_id, PoolColumns};
use crate::sample::*;

/// Opens the file and returns the trimmed header with the remaining records.
fn get_records(path: &str) -> BSampleResult<(Vec<String>, csv::StringRecordsIntoIter<File>)> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    let header = records
        .next()
        .context(EmptyCsvSnafu { path })?
        .context(CsvLineParseSnafu { lineno: 1usize })?;
    let header: Vec<String> = header
        .iter()
        .map(|s| s.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    debug!("get_records: {}: header: {:?}", path, header);
    Ok((header, records))
}

pub fn read_pool_csv(path: &str, today: NaiveDate) -> BSampleResult<Vec<RespondentFields>> {
    let default_id = make_default_id(path);
    let (header, records) = get_records(path)?;
    let columns = PoolColumns::from_header(&header, path)?;

    let mut res: Vec<RespondentFields> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let row: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if row.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        let fields = columns.fields(&row, lineno, &default_id, today)?;
        debug!("read_pool_csv: lineno: {:?} fields: {:?}", lineno, fields);
        res.push(fields);
    }
    Ok(res)
}

const ANSWER_COLUMNS: [&str; 4] = ["respondent_id", "survey_id", "question_code", "answer_value"];

/// Reads the long-format consolidated answers.
pub fn read_answers_csv(path: &str) -> BSampleResult<Vec<LongAnswer>> {
    let (header, records) = get_records(path)?;
    let mut idxs: Vec<usize> = Vec::new();
    for column in ANSWER_COLUMNS {
        let idx = header
            .iter()
            .position(|h| h == column)
            .context(MissingColumnSnafu { column, path })?;
        idxs.push(idx);
    }

    let mut res: Vec<LongAnswer> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cell = |i: usize| line.get(idxs[i]).unwrap_or("").trim().to_string();
        let survey_s = cell(1);
        let survey_id = survey_s.parse::<SurveyId>().ok().context(InvalidValueSnafu {
            column: ANSWER_COLUMNS[1],
            value: survey_s.clone(),
            lineno,
        })?;
        res.push(LongAnswer {
            respondent_id: cell(0),
            survey_id,
            question_code: cell(2),
            answer_value: cell(3),
        });
    }
    info!("read_answers_csv: {} answers read from {}", res.len(), path);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn data_file(name: &str) -> String {
        let p: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "data", "basic", name]
            .iter()
            .collect();
        p.display().to_string()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn reads_the_basic_pool() {
        let fields = read_pool_csv(&data_file("pool.csv"), today()).unwrap();
        assert_eq!(fields.len(), 40);
        let first = &fields[0];
        assert_eq!(first.respondent_id, "r01");
        assert_eq!(first.survey_id, 1);
        assert_eq!(first.region, Some("Sudeste".to_string()));
        assert_eq!(first.state, Some("SP".to_string()));
        assert!(first.attributes.iter().any(|(k, _)| k == "genero"));
    }

    #[test]
    fn reads_the_basic_answers() {
        let answers = read_answers_csv(&data_file("answers.csv")).unwrap();
        assert!(!answers.is_empty());
        assert_eq!(answers[0].respondent_id, "r01");
        assert_eq!(answers[0].question_code, "FE2P3");
    }

    #[test]
    fn missing_file() {
        let err = read_pool_csv(&data_file("nothing_here.csv"), today()).unwrap_err();
        assert!(matches!(*err, SampleError::CsvOpen { .. }));
        // The pool is not an answers table.
        let err = read_answers_csv(&data_file("pool.csv")).unwrap_err();
        assert!(matches!(*err, SampleError::MissingColumn { .. }));
    }
}
