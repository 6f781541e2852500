use log::{debug, info, warn};

use quota_sampling::builder::{PoolBuilder, RespondentFields};
use quota_sampling::export::{widen, LongAnswer, WideTable};
use quota_sampling::standardize::ColumnCatalog;
use quota_sampling::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::sample::config_reader::*;
use crate::sample::io_common::parse_date;

mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;

#[derive(Debug, Snafu)]
pub enum SampleError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display(
        "Several worksheets in {path}, the worksheet name must be provided (--excel-worksheet-name)"
    ))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("No data found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Wrong cell type at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error serializing the summary"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("No header line in {path}"))]
    EmptyCsv { path: String },
    #[snafu(display("Error parsing line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Column {column} is missing in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Invalid value {value:?} for column {column} at line {lineno}"))]
    InvalidValue {
        column: String,
        value: String,
        lineno: usize,
    },
    #[snafu(display("Unknown pool provider {provider} (expected csv or xlsx)"))]
    UnknownProvider { provider: String },
    #[snafu(display("Cannot find the directory of the configuration file"))]
    MissingParentDir {},
    #[snafu(display("No pool source: use --input or poolSources in the configuration"))]
    MissingPoolSource {},
    #[snafu(display("Invalid date {value:?}"))]
    InvalidDate { value: String },
    #[snafu(display("Invalid weight for {dimension} category {category}"))]
    InvalidWeight { dimension: String, category: String },
    #[snafu(display("{source}"))]
    Sampling { source: SamplingError },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingCsv { source: csv::Error, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SampleResult<T> = Result<T, SampleError>;

pub type BSampleResult<T> = Result<T, Box<SampleError>>;

fn key_js(k: &RespondentKey) -> JSValue {
    json!({"surveyId": k.survey_id, "respondentId": k.respondent_id})
}

fn stratum_js(s: &Stratum) -> JSValue {
    json!({
        "region": s.region.label(),
        "income": s.income.label(),
        "locality": s.locality.label(),
    })
}

fn plan_to_json(plan: &QuotaPlan) -> (Vec<JSValue>, Vec<JSValue>) {
    let feasibility: Vec<JSValue> = plan
        .categories
        .iter()
        .map(|c| {
            json!({
                "dimension": c.dimension.name(),
                "category": c.category,
                "weight": c.weight,
                "desiredN": c.desired_n,
                "availableN": c.available_n,
            })
        })
        .collect();
    // Strata nobody asked for and nobody lives in carry no information.
    let strata: Vec<JSValue> = plan
        .strata
        .iter()
        .filter(|sp| sp.target_n > 0.0 || sp.available_n > 0)
        .map(|sp| {
            json!({
                "stratum": stratum_js(&sp.stratum),
                "targetWeight": sp.target_weight,
                "targetN": sp.target_n,
                "availableN": sp.available_n,
                "ratio": sp.ratio,
            })
        })
        .collect();
    (feasibility, strata)
}

fn reports_to_json(r: &SamplingResponse) -> JSValue {
    let deviation: Vec<JSValue> = r
        .deviation
        .iter()
        .map(|d| {
            json!({
                "dimension": d.dimension.name(),
                "category": d.category,
                "desiredN": d.desired_n,
                "availableN": d.available_n,
                "realizedN": d.realized_n,
                "deviation": d.deviation,
                "status": d.status.name(),
            })
        })
        .collect();

    let gaps = &r.gaps;
    let gap_rows: Vec<JSValue> = gaps
        .gaps
        .iter()
        .map(|g| json!({"stratum": stratum_js(&g.stratum), "gap": g.gap}))
        .collect();
    let matrix = |locality: Option<Locality>| -> Vec<JSValue> {
        gaps.matrix(locality)
            .iter()
            .map(|(i, reg, n)| json!({"income": i.label(), "region": reg.label(), "gap": n}))
            .collect()
    };

    let bottlenecks = &r.bottlenecks;
    let source_audit: Vec<JSValue> = r
        .source_audit
        .iter()
        .map(|row| {
            json!({
                "surveyId": row.survey_id,
                "region": row.region.map(|c| c.label()),
                "locality": row.locality.map(|c| c.label()),
                "count": row.count,
            })
        })
        .collect();
    let profile: Vec<JSValue> = r
        .profile
        .iter()
        .map(|p| json!({"attribute": p.attribute, "value": p.value, "share": p.share}))
        .collect();

    json!({
        "deviation": deviation,
        "collectionGaps": {
            "gaps": gap_rows,
            "total": gaps.total,
            "capitalTotal": gaps.capital_total,
            "interiorTotal": gaps.interior_total,
            "byRegion": gaps.by_region.iter().map(|(c, n)| json!({"category": c.label(), "gap": n})).collect::<Vec<JSValue>>(),
            "byIncome": gaps.by_income.iter().map(|(c, n)| json!({"category": c.label(), "gap": n})).collect::<Vec<JSValue>>(),
            "byLocality": gaps.by_locality.iter().map(|(c, n)| json!({"category": c.label(), "gap": n})).collect::<Vec<JSValue>>(),
            "capitalMatrix": matrix(Some(Locality::Capital)),
            "interiorMatrix": matrix(Some(Locality::Interior)),
            "matrix": matrix(None),
        },
        "bottlenecks": {
            "strata": bottlenecks.strata.iter().map(stratum_js).collect::<Vec<JSValue>>(),
            "capital": bottlenecks.capital,
            "interior": bottlenecks.interior,
            "matrix": bottlenecks.matrix.iter().map(|(i, reg, n)| json!({"income": i.label(), "region": reg.label(), "count": n})).collect::<Vec<JSValue>>(),
        },
        "sourceAudit": source_audit,
        "profile": profile,
    })
}

fn build_summary_js(
    config: &SampleConfig,
    request: &SamplingRequest,
    pool: &Pool,
    outcome: &SamplingOutcome,
    today: NaiveDate,
) -> JSValue {
    match outcome {
        SamplingOutcome::NoData { seed, fingerprint } => json!({
            "config": {
                "sampleName": config.sample_name(),
                "requestedSize": request.requested_size,
                "seed": seed,
                "fingerprint": fingerprint,
                "referenceDate": today.to_string(),
            },
            "status": "noData",
            "pool": {"total": pool.len(), "core": 0, "free": 0},
        }),
        SamplingOutcome::Completed(r) => {
            let (feasibility, strata) = plan_to_json(&r.plan);
            let forced = &r.forced;
            let proportional = &r.proportional;
            let mut js = json!({
                "config": {
                    "sampleName": config.sample_name(),
                    "requestedSize": request.requested_size,
                    "seed": r.seed,
                    "fingerprint": r.fingerprint,
                    "referenceDate": today.to_string(),
                },
                "status": "completed",
                "pool": {"total": pool.len(), "core": r.core_size, "free": r.free_size},
                "feasibility": feasibility,
                "strata": strata,
                "forcedSample": {
                    "size": forced.len(),
                    "coreKept": forced.core_kept,
                    "coreTruncated": forced.core_truncated,
                    "quotaDraws": forced.quota_draws,
                    "bracketBackfill": forced.bracket_backfill,
                    "globalBackfill": forced.global_backfill,
                    "members": forced.members.iter().map(key_js).collect::<Vec<JSValue>>(),
                },
                "proportionalSample": {
                    "size": proportional.len(),
                    "minRatio": proportional.min_ratio,
                    "strata": proportional.stratum_counts.iter().map(|(s, n)| json!({"stratum": stratum_js(s), "count": n})).collect::<Vec<JSValue>>(),
                    "members": proportional.members.iter().map(key_js).collect::<Vec<JSValue>>(),
                },
            });
            if let (Some(obj), JSValue::Object(reports)) = (js.as_object_mut(), reports_to_json(r))
            {
                obj.extend(reports);
            }
            js
        }
    }
}

/// The day after which collection dates are treated as unknown: the command
/// line, then the configuration, then the day recorded in the reference
/// summary, and only then the current day.
fn reference_date(
    args: &Args,
    config: &SampleConfig,
    reference: Option<&JSValue>,
) -> BSampleResult<NaiveDate> {
    if let Some(s) = &args.reference_date {
        return parse_config_date(s);
    }
    if let Some(d) = config.reference_date()? {
        return Ok(d);
    }
    if let Some(s) = reference.and_then(|js| js["config"]["referenceDate"].as_str()) {
        debug!("reference_date: taken from the reference summary: {}", s);
        return parse_config_date(s);
    }
    let today = Local::now().date_naive();
    info!("No reference date given, using today: {}", today);
    Ok(today)
}

/// Resolves the pool sources: the command line wins over the configuration.
fn pool_sources(args: &Args, config: &SampleConfig, root: &Path) -> Vec<PoolSource> {
    if let Some(input) = &args.input {
        return vec![PoolSource {
            provider: args.input_type.clone().unwrap_or_else(|| "csv".to_string()),
            file_path: input.clone(),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
        }];
    }
    config
        .pool_sources
        .iter()
        .map(|ps| {
            let p: PathBuf = [root, Path::new(ps.file_path.as_str())].iter().collect();
            PoolSource {
                file_path: p.as_path().display().to_string(),
                ..ps.clone()
            }
        })
        .collect()
}

fn read_pool_source(ps: &PoolSource, today: NaiveDate) -> BSampleResult<Vec<RespondentFields>> {
    info!("Attempting to read pool file {:?}", ps.file_path);
    match ps.provider.as_str() {
        "csv" => io_csv::read_pool_csv(&ps.file_path, today),
        "xlsx" | "excel" => {
            io_excel::read_pool_excel(&ps.file_path, ps.excel_worksheet_name.as_deref(), today)
        }
        x => Err(Box::new(SampleError::UnknownProvider {
            provider: x.to_string(),
        })),
    }
}

/// Reads and merges the pool files. Collection dates after `today` count as unknown.
pub fn read_pool(sources: &[PoolSource], today: NaiveDate) -> BSampleResult<Pool> {
    if sources.is_empty() {
        return Err(Box::new(SampleError::MissingPoolSource {}));
    }
    let mut builder = PoolBuilder::new();
    for ps in sources.iter() {
        let fields = read_pool_source(ps, today)?;
        info!("Read {} respondents from {}", fields.len(), ps.file_path);
        for f in fields.iter() {
            builder.add_fields(f).context(SamplingSnafu {})?;
        }
    }
    let pool = builder.build().context(SamplingSnafu {})?;
    Ok(pool)
}

fn compare_with_reference(reference: &str, computed: &str) -> SampleResult<()> {
    if reference != computed {
        warn!("Found differences with the reference summary");
        print_diff(reference, computed, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

fn write_summary(
    args: &Args,
    config: &SampleConfig,
    root: &Path,
    pretty_js: &str,
) -> BSampleResult<()> {
    let out_path: Option<String> = match (args.out.as_deref(), config.output_directory()) {
        (Some("stdout"), _) => None,
        (Some(p), _) => Some(p.to_string()),
        (None, Some(dir)) => {
            let dir_p: PathBuf = [root, Path::new(dir.as_str())].iter().collect();
            fs::create_dir_all(&dir_p).context(WritingOutputSnafu {
                path: dir_p.display().to_string(),
            })?;
            let p = dir_p.join(format!("{}_summary.json", config.sample_name()));
            Some(p.display().to_string())
        }
        (None, None) => None,
    };
    match out_path {
        Some(p) => {
            info!("Writing summary to {}", p);
            fs::write(&p, pretty_js).context(WritingOutputSnafu { path: p.clone() })?;
        }
        None => println!("{}", pretty_js),
    }
    Ok(())
}

fn write_table(path: &Path, table: &WideTable) -> BSampleResult<()> {
    let path_s = path.display().to_string();
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu {
        path: path_s.clone(),
    })?;
    wtr.write_record(&table.columns).context(WritingCsvSnafu {
        path: path_s.clone(),
    })?;
    for row in table.rows.iter() {
        wtr.write_record(row).context(WritingCsvSnafu {
            path: path_s.clone(),
        })?;
    }
    wtr.flush().context(WritingOutputSnafu { path: path_s })?;
    Ok(())
}

fn export_samples(
    pool: &Pool,
    response: &SamplingResponse,
    answers_path: &str,
    export_dir: &str,
) -> BSampleResult<Vec<PathBuf>> {
    let answers: Vec<LongAnswer> = io_csv::read_answers_csv(answers_path)?;
    let catalog = ColumnCatalog::default();
    fs::create_dir_all(export_dir).context(WritingOutputSnafu { path: export_dir })?;

    let mut written: Vec<PathBuf> = Vec::new();
    let samples: [(&str, &BTreeSet<RespondentKey>); 2] = [
        ("forced_sample", &response.forced.members),
        ("proportional_sample", &response.proportional.members),
    ];
    for (name, members) in samples {
        if members.is_empty() {
            warn!("export_samples: {} is empty, nothing written", name);
            continue;
        }
        let table = widen(pool, members, &answers, &catalog);
        let p = Path::new(export_dir).join(format!("{}_{}.csv", name, members.len()));
        write_table(&p, &table)?;
        info!("Wrote {} rows to {}", table.len(), p.display());
        written.push(p);
    }
    Ok(written)
}

/// Runs the complete pipeline for a command line invocation and returns the
/// summary.
pub fn run_sampling_cli(args: &Args) -> BSampleResult<JSValue> {
    let (config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => (SampleConfig::default(), PathBuf::new()),
    };
    info!("config: {:?}", config);

    let mut request = config.to_request()?;
    if let Some(size) = args.size {
        request.requested_size = size;
    }
    if let Some(seed) = args.seed {
        request.seed = Some(seed);
    }

    // The reference summary, if provided for comparison
    let reference = match &args.reference {
        Some(reference_path) => Some(read_summary(reference_path)?),
        None => None,
    };
    let today = reference_date(args, &config, reference.as_ref())?;

    let sources = pool_sources(args, &config, &root);
    let pool = read_pool(&sources, today)?;
    debug!("run_sampling_cli: pool of {} respondents", pool.len());

    let outcome = run_sampling(&pool, &request).context(SamplingSnafu {})?;
    let summary = build_summary_js(&config, &request, &pool, &outcome, today);
    let pretty_js = serde_json::to_string_pretty(&summary).context(SerializingJsonSnafu {})?;
    write_summary(args, &config, &root, &pretty_js)?;

    if let Some(reference) = &reference {
        let pretty_reference =
            serde_json::to_string_pretty(reference).context(SerializingJsonSnafu {})?;
        compare_with_reference(&pretty_reference, &pretty_js)?;
    }

    match (&args.answers, &args.export_dir, &outcome) {
        (Some(answers), Some(export_dir), SamplingOutcome::Completed(response)) => {
            export_samples(&pool, response, answers, export_dir)?;
        }
        (Some(_), Some(_), SamplingOutcome::NoData { .. }) => {
            warn!("No sample to export");
        }
        (Some(_), None, _) | (None, Some(_), _) => {
            warn!("Both --answers and --export-dir are needed to export the samples");
        }
        (None, None, _) => {}
    }

    Ok(summary)
}
