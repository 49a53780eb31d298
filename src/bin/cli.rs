use std::path::{Path, PathBuf};

use admissions::cookbook::kpis_by_province;
use admissions::prelude::*;
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "adcli", version)]
#[command(about = "Admissions Analytics CLI - filter and aggregate hospital admission records", long_about = None)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    filters: FilterArgs,

    /// Output format (defaults to the configured one)
    #[arg(long, value_enum, global = true)]
    format: Option<FormatOpt>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show summary statistics for the loaded records
    Stats,
    /// List admissions matching the filters
    List {
        /// Limit number of rows shown
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Total admissions, average stay, readmission rate and sex distribution
    Kpis,
    /// Admissions per month
    Monthly,
    /// Admissions per month split by sex
    Series,
    /// Admissions per diagnosis chapter
    Chapters,
    /// Most frequent primary diagnosis codes
    TopDiagnoses {
        /// Number of codes (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Admissions per province
    Provinces {
        /// Show the KPI summary of every province
        #[arg(long)]
        detailed: bool,
    },
    /// Length-of-stay histogram
    Stays,
    /// Readmission rate and its change against the preceding period
    Readmission {
        /// Window length in days (defaults to the configured period)
        #[arg(long)]
        period_days: Option<u32>,
    },
    /// Every dashboard view at once
    Dashboard {
        /// Number of top diagnoses
        #[arg(long)]
        top: Option<usize>,
        /// Readmission window length in days
        #[arg(long)]
        period_days: Option<u32>,
    },
    /// Write synthetic admissions to a CSV file
    Generate {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show the effective configuration
    Config {
        /// Save it to the default configuration path (or --config)
        #[arg(long)]
        write: bool,
    },
    /// Query a view endpoint of the admissions API directly
    #[cfg(feature = "remote")]
    Remote {
        /// Endpoint to query
        #[arg(value_enum)]
        endpoint: EndpointOpt,
        /// Row limit sent with the request
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "ADMISSIONS_CONFIG")]
    config: Option<PathBuf>,
    /// Load admissions from a CSV file
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,
    /// Load admissions from the API at this base URL
    #[arg(long, global = true, conflicts_with = "data")]
    remote_url: Option<String>,
    /// Number of synthetic admissions to generate
    #[arg(long, global = true)]
    count: Option<usize>,
    /// Seed of the synthetic generator
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Skip malformed rows instead of failing
    #[arg(long, global = true)]
    skip_invalid: bool,
    /// Checks applied to ingested records
    #[arg(long, value_enum, global = true)]
    validation: Option<ValidationOpt>,
    /// Worker threads for parallel work
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Hide progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Args)]
struct FilterArgs {
    /// First admission date (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Last admission date (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Province (repeatable)
    #[arg(long, global = true)]
    province: Vec<String>,
    /// Municipality (repeatable)
    #[arg(long, global = true)]
    municipality: Vec<String>,
    /// Sex: Masculino, Femenino or Desconocido (repeatable)
    #[arg(long, global = true, value_parser = parse_sex)]
    sex: Vec<Sex>,
    /// Age group: 0-17, 18-25, 26-40, 41-65 or 66+ (repeatable)
    #[arg(long, global = true, value_parser = parse_age_group)]
    age_group: Vec<AgeGroup>,
    /// Diagnosis chapter fragment, e.g. F30-F39 (repeatable)
    #[arg(long, global = true)]
    diagnosis: Vec<String>,
    #[arg(long, global = true)]
    severity_min: Option<u8>,
    #[arg(long, global = true)]
    severity_max: Option<u8>,
    #[arg(long, global = true)]
    stay_min: Option<u32>,
    #[arg(long, global = true)]
    stay_max: Option<u32>,
    /// Free-text search over code, chapter and municipality
    #[arg(short = 'q', long, global = true)]
    search: Option<String>,
    /// How the search combines with the other filters
    #[arg(long, value_enum, global = true)]
    search_precedence: Option<PrecedenceOpt>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatOpt {
    Table,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ValidationOpt {
    None,
    Basic,
    Standard,
    Strict,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PrecedenceOpt {
    Conjunctive,
    Replace,
}

#[cfg(feature = "remote")]
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum EndpointOpt {
    Admissions,
    Kpis,
    Timeseries,
    TimeseriesExtended,
    DiagnosisByChapter,
    TopDiagnoses,
    ProvinceData,
    LengthOfStayBuckets,
    ReadmissionRateExtended,
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| format!("'{value}' is not a YYYY-MM-DD date"))
}

fn parse_sex(value: &str) -> std::result::Result<Sex, String> {
    Sex::from_code(value).map_err(|e| e.user_message())
}

fn parse_age_group(value: &str) -> std::result::Result<AgeGroup, String> {
    AgeGroup::from_code(value).map_err(|e| e.user_message())
}

impl FilterArgs {
    fn to_filter_spec(&self, default_precedence: SearchPrecedence) -> FilterSpec {
        let date_range = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some(DateRange::new(from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX))),
        };
        let severity_range = match (self.severity_min, self.severity_max) {
            (None, None) => None,
            (min, max) => Some(InclusiveRange::new(
                min.unwrap_or(AdmissionRecord::MIN_SEVERITY),
                max.unwrap_or(AdmissionRecord::MAX_SEVERITY),
            )),
        };
        let length_of_stay_range = match (self.stay_min, self.stay_max) {
            (None, None) => None,
            (min, max) => Some(InclusiveRange::new(min.unwrap_or(0), max.unwrap_or(u32::MAX))),
        };

        FilterSpec {
            date_range,
            provinces: self.province.clone(),
            municipalities: self.municipality.clone(),
            sexes: self.sex.clone(),
            age_groups: self.age_group.clone(),
            diagnosis_groups: self.diagnosis.clone(),
            severity_range,
            length_of_stay_range,
            search_query: self.search.clone(),
            search_precedence: match self.search_precedence {
                Some(PrecedenceOpt::Conjunctive) => SearchPrecedence::Conjunctive,
                Some(PrecedenceOpt::Replace) => SearchPrecedence::Replace,
                None => default_precedence,
            },
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        match err.downcast_ref::<AdmissionsError>() {
            Some(e) => eprintln!("Error: {}", e.user_message()),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli.source)?;

    #[cfg(feature = "parallel")]
    if let Some(threads) = config.parallel_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the worker thread pool")?;
    }

    let format = match cli.format {
        Some(FormatOpt::Json) => OutputFormat::Json,
        Some(FormatOpt::Table) => OutputFormat::Table,
        None => config.output_format,
    };
    let filters = cli.filters.to_filter_spec(config.search_precedence);

    match &cli.command {
        Commands::Generate { output } => return cmd_generate(&config, output),
        Commands::Config { write } => return cmd_config(&config, cli.source.config.clone(), *write),
        #[cfg(feature = "remote")]
        Commands::Remote { endpoint, limit } => return cmd_remote(&config, *endpoint, &filters, *limit),
        _ => {}
    }

    let dataset = AdmissionDataset::from_config(&config)?;
    let analytics = dataset.analytics();

    match cli.command {
        Commands::Stats => {
            let stats = dataset.statistics();
            match format {
                OutputFormat::Json => print_json(&StatsView::from(&stats))?,
                OutputFormat::Table => stats.print_summary(),
            }
        }
        Commands::List { limit } => {
            let matches = dataset.filter(&filters);
            match format {
                OutputFormat::Json => print_json(&matches.iter().take(limit).collect::<Vec<_>>())?,
                OutputFormat::Table => {
                    for record in matches.iter().take(limit) {
                        println!(
                            "{} | {} | {} / {} | {} | {} | {} | {} days | readmitted: {} | severity {}",
                            record.id,
                            record.admission_date,
                            record.province,
                            record.municipality,
                            record.sex,
                            record.age_group,
                            record.primary_diagnosis_code,
                            record.length_of_stay,
                            if record.readmitted_within_30_days { "yes" } else { "no" },
                            record.severity_score
                        );
                    }
                    println!("Total matches: {}", matches.len());
                }
            }
        }
        Commands::Kpis => emit(format, &analytics.kpis(&filters), print_kpis)?,
        Commands::Monthly => emit(format, analytics.monthly_counts(&filters).as_slice(), print_monthly)?,
        Commands::Series => emit(format, analytics.time_series(&filters).as_slice(), print_series)?,
        Commands::Chapters => emit(format, analytics.diagnosis_by_chapter(&filters).as_slice(), print_diagnoses)?,
        Commands::TopDiagnoses { limit } => {
            let limit = limit.unwrap_or(config.top_diagnoses_limit);
            emit(format, analytics.top_diagnoses(&filters, limit).as_slice(), print_diagnoses)?
        }
        Commands::Provinces { detailed: false } => {
            emit(format, analytics.province_distribution(&filters).as_slice(), print_provinces)?
        }
        Commands::Provinces { detailed: true } => {
            let rows: Vec<ProvinceKpis> = kpis_by_province(&dataset, &filters)
                .into_iter()
                .map(|(province, kpis)| ProvinceKpis { province, kpis })
                .collect();
            emit(format, rows.as_slice(), print_province_kpis)?
        }
        Commands::Stays => emit(format, analytics.length_of_stay_buckets(&filters).as_slice(), print_stays)?,
        Commands::Readmission { period_days } => {
            let comparison = PeriodComparison::days(period_days.unwrap_or(config.readmission_period_days));
            emit(format, &analytics.readmission_rate(&filters, &comparison), print_readmission)?
        }
        Commands::Dashboard { top, period_days } => {
            let options = SnapshotOptions {
                top_diagnoses_limit: top.unwrap_or(config.top_diagnoses_limit),
                comparison: PeriodComparison::days(period_days.unwrap_or(config.readmission_period_days)),
            };
            emit(format, &analytics.snapshot(&filters, &options), print_dashboard)?
        }
        Commands::Generate { .. } | Commands::Config { .. } => unreachable!("handled before loading"),
        #[cfg(feature = "remote")]
        Commands::Remote { .. } => unreachable!("handled before loading"),
    }

    Ok(())
}

/// Configuration file (or defaults), then environment, then command-line flags
fn resolve_config(args: &SourceArgs) -> anyhow::Result<AdmissionsConfig> {
    let mut config = match &args.config {
        Some(path) => AdmissionsConfig::from_file(path)?.with_env_overrides(),
        None => AdmissionsConfig::load(),
    };

    if let Some(path) = &args.data {
        config.source = SourceConfig::Csv { path: path.clone() };
    } else if let Some(base_url) = &args.remote_url {
        let timeout_seconds = match &config.source {
            SourceConfig::Remote { timeout_seconds, .. } => *timeout_seconds,
            _ => 30,
        };
        config.source = SourceConfig::Remote {
            base_url: base_url.clone(),
            timeout_seconds,
        };
    } else if args.count.is_some() || args.seed.is_some() {
        let (count, seed) = match &config.source {
            SourceConfig::Generated { count, seed } => (*count, *seed),
            _ => (admissions::generator::DEFAULT_RECORD_COUNT, None),
        };
        config.source = SourceConfig::Generated {
            count: args.count.unwrap_or(count),
            seed: args.seed.or(seed),
        };
    }

    if args.skip_invalid {
        config.skip_invalid_records = true;
    }
    if let Some(level) = args.validation {
        config.validation_level = match level {
            ValidationOpt::None => ValidationLevel::None,
            ValidationOpt::Basic => ValidationLevel::Basic,
            ValidationOpt::Standard => ValidationLevel::Standard,
            ValidationOpt::Strict => ValidationLevel::Strict,
        };
    }
    if args.threads.is_some() {
        config.parallel_threads = args.threads;
    }
    if args.no_progress {
        config.enable_progress_bar = false;
    }

    Ok(config)
}

fn cmd_generate(config: &AdmissionsConfig, output: &Path) -> anyhow::Result<()> {
    let (count, seed) = match &config.source {
        SourceConfig::Generated { count, seed } => (*count, *seed),
        _ => (admissions::generator::DEFAULT_RECORD_COUNT, None),
    };
    let records = AdmissionGenerator::new().count(count).seed(seed).generate();
    admissions::reader::write_csv(&records, output)?;
    println!("Wrote {} admissions to {}", records.len(), output.display());
    Ok(())
}

fn cmd_config(config: &AdmissionsConfig, explicit_path: Option<PathBuf>, write: bool) -> anyhow::Result<()> {
    if write {
        let path = explicit_path
            .or_else(AdmissionsConfig::default_config_path)
            .context("no configuration directory available; pass --config <PATH>")?;
        config.save(&path)?;
        println!("Saved configuration to {}", path.display());
    } else {
        print!("{}", config.to_toml_string()?);
    }
    Ok(())
}

#[cfg(feature = "remote")]
fn cmd_remote(
    config: &AdmissionsConfig,
    endpoint: EndpointOpt,
    filters: &FilterSpec,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let (base_url, timeout_seconds) = match &config.source {
        SourceConfig::Remote { base_url, timeout_seconds } => (base_url.clone(), *timeout_seconds),
        _ => anyhow::bail!("the remote command needs --remote-url or a remote source in the configuration"),
    };
    let endpoint = match endpoint {
        EndpointOpt::Admissions => ViewEndpoint::Admissions,
        EndpointOpt::Kpis => ViewEndpoint::Kpis,
        EndpointOpt::Timeseries => ViewEndpoint::TimeSeries,
        EndpointOpt::TimeseriesExtended => ViewEndpoint::TimeSeriesExtended,
        EndpointOpt::DiagnosisByChapter => ViewEndpoint::DiagnosisByChapter,
        EndpointOpt::TopDiagnoses => ViewEndpoint::TopDiagnoses,
        EndpointOpt::ProvinceData => ViewEndpoint::ProvinceData,
        EndpointOpt::LengthOfStayBuckets => ViewEndpoint::LengthOfStayBuckets,
        EndpointOpt::ReadmissionRateExtended => ViewEndpoint::ReadmissionRateExtended,
    };

    let source = RemoteSource::new(base_url, timeout_seconds)?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let body: serde_json::Value = runtime.block_on(source.fetch_view(endpoint, filters, limit))?;
    print_json(&body)
}

/// Serializable form of the dataset statistics
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsView {
    total_admissions: usize,
    first_admission: Option<NaiveDate>,
    last_admission: Option<NaiveDate>,
    provinces: usize,
    municipalities: usize,
    chapters: usize,
    diagnosis_codes: usize,
    sex_distribution: SexDistribution,
    readmissions: usize,
}

impl From<&DatasetStatistics> for StatsView {
    fn from(stats: &DatasetStatistics) -> Self {
        Self {
            total_admissions: stats.total_admissions,
            first_admission: stats.first_admission,
            last_admission: stats.last_admission,
            provinces: stats.provinces_represented,
            municipalities: stats.municipalities_represented,
            chapters: stats.chapters_represented,
            diagnosis_codes: stats.unique_diagnosis_codes,
            sex_distribution: SexDistribution {
                male: stats.male,
                female: stats.female,
                unknown: stats.unknown_sex,
            },
            readmissions: stats.readmissions,
        }
    }
}

#[derive(Serialize)]
struct ProvinceKpis {
    province: String,
    #[serde(flatten)]
    kpis: KpiSummary,
}

fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T, table: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            table(value);
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_kpis(kpis: &KpiSummary) {
    println!("Total Admissions: {}", kpis.total_admissions);
    println!("Average Stay: {} days", kpis.average_stay);
    println!("Readmission Rate: {}%", kpis.readmission_rate);
    println!(
        "Sex: Masculino {} | Femenino {} | Desconocido {}",
        kpis.sex_distribution.male, kpis.sex_distribution.female, kpis.sex_distribution.unknown
    );
}

fn print_monthly(points: &[TimeSeriesPoint]) {
    for point in points {
        println!("{:<8} {:>6}", point.date, point.count);
    }
}

fn print_series(points: &[MonthlySeriesPoint]) {
    println!("{:<8} {:>6} {:>6} {:>6} {:>6}", "month", "total", "male", "female", "unknown");
    for point in points {
        println!(
            "{:<8} {:>6} {:>6} {:>6} {:>6}",
            point.month, point.total, point.male, point.female, point.unknown
        );
    }
}

fn print_diagnoses(rows: &[DiagnosisCount]) {
    println!("{:<10} {:>6} {:>6} {:>6} {:>6}", "diagnosis", "count", "male", "female", "unknown");
    for row in rows {
        println!(
            "{:<10} {:>6} {:>6} {:>6} {:>6}",
            row.label, row.count, row.male, row.female, row.unknown
        );
    }
}

fn print_provinces(rows: &[ProvinceCount]) {
    for row in rows {
        println!("{:<12} {:>6}", row.province, row.count);
    }
}

fn print_province_kpis(rows: &[ProvinceKpis]) {
    println!("{:<12} {:>6} {:>9} {:>12}", "province", "count", "avg stay", "readmitted %");
    for row in rows {
        println!(
            "{:<12} {:>6} {:>9} {:>12}",
            row.province, row.kpis.total_admissions, row.kpis.average_stay, row.kpis.readmission_rate
        );
    }
}

fn print_stays(buckets: &[StayBucket]) {
    for bucket in buckets {
        println!("{:<11} {:>6}", bucket.label, bucket.count);
    }
    if let Some(first) = buckets.first() {
        println!("Mean stay: {} days, median stay: {} days", first.mean, first.median);
    }
}

fn print_readmission(rate: &ReadmissionRate) {
    println!("Readmission Rate: {}% ({} of {})", rate.rate, rate.readmissions, rate.total);
    println!("Change vs previous period: {:+} points", rate.delta_pct);
}

fn print_dashboard(snapshot: &DashboardSnapshot) {
    println!("=== KPIs ===");
    print_kpis(&snapshot.kpis);
    println!("\n=== Admissions by Month ===");
    print_series(&snapshot.time_series);
    println!("\n=== Diagnosis Chapters ===");
    print_diagnoses(&snapshot.diagnosis_by_chapter);
    println!("\n=== Top Diagnoses ===");
    print_diagnoses(&snapshot.top_diagnoses);
    println!("\n=== Provinces ===");
    print_provinces(&snapshot.provinces);
    println!("\n=== Length of Stay ===");
    print_stays(&snapshot.length_of_stay);
    println!("\n=== Readmissions ===");
    print_readmission(&snapshot.readmission);
}
