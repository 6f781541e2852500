use clap::Parser;

/// This program draws quota-constrained samples from a pool of survey respondents.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the sample: pool sources, filters, cohorts,
    /// weights and requested size. For more information about the file format, read the documentation
    /// of the quota_sampling::manual module.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing a summary in JSON format. If provided, qsample will
    /// check that the computed summary matches the reference. Only meaningful with a fixed seed.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the pool of respondents is read from this file. Setting this option
    /// overrides the pool sources of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use. It may be omitted
    /// if the workbook has a single worksheet.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (positive integer) Overrides the requested sample size of the configuration.
    #[clap(short, long, value_parser)]
    pub size: Option<usize>,

    /// (integer) Overrides the random seed of the configuration. Without any seed, a fresh one is
    /// picked and reported in the summary.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// (date, YYYY-MM-DD or DD/MM/YYYY) Collection dates after this day are treated as unknown.
    /// Defaults to the referenceDate of the configuration, then to the one recorded in the
    /// --reference summary, then to the current day.
    #[clap(long, value_parser)]
    pub reference_date: Option<String>,

    /// (file path) The long-format answers (respondent_id, survey_id, question_code, answer_value)
    /// used to export the samples. Requires --export-dir.
    #[clap(long, value_parser)]
    pub answers: Option<String>,

    /// (directory) Where the widened samples are written as forced_sample_<N>.csv and
    /// proportional_sample_<N>.csv. Requires --answers.
    #[clap(long, value_parser)]
    pub export_dir: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
