/*!
 * # Admissions Analytics Library
 *
 * Filtering and aggregation engine for psychiatric hospital admission records.
 *
 * ## Features
 *
 * - **Facet Filters**: date range, province, municipality, sex, age group,
 *   diagnosis chapter, severity and stay ranges, free-text search
 * - **Dashboard Views**: KPIs, monthly series, diagnosis rankings, province
 *   distribution, stay histogram, readmission rate with period delta
 * - **Pluggable Sources**: synthetic generator, CSV files, or the admissions
 *   HTTP API (`remote` feature), selected once from configuration
 * - **Parallel Snapshots**: every dashboard view computed at once with the
 *   `parallel` feature
 *
 * ## Quick Start
 *
 * ```no_run
 * use admissions::prelude::*;
 *
 * # fn main() -> Result<()> {
 * let dataset = AdmissionDataset::from_source(&GeneratedSource::new(500, Some(7)))?;
 *
 * let filters = FilterSpec::new()
 *     .province("Madrid")
 *     .sex(Sex::Female)
 *     .stay_between(1, 14);
 *
 * let kpis = dataset.analytics().kpis(&filters);
 * println!(
 *     "{} admissions, average stay {} days, {}% readmitted",
 *     kpis.total_admissions, kpis.average_stay, kpis.readmission_rate
 * );
 * # Ok(())
 * # }
 * ```
 *
 * ## Loading Data
 *
 * ```no_run
 * # use admissions::prelude::*;
 * # fn main() -> Result<()> {
 * // From a CSV file, skipping malformed rows
 * let reader = AdmissionReader::new().with_skip_invalid_records(true);
 * let dataset = AdmissionDataset::from_source(&CsvSource::new("data/admissions.csv").with_reader(reader))?;
 *
 * // Or from whatever the configuration selects
 * let config = AdmissionsConfig::load();
 * let dataset = AdmissionDataset::from_config(&config)?;
 * # Ok(())
 * # }
 * ```
 *
 * ## Dashboard Snapshot
 *
 * ```no_run
 * # use admissions::prelude::*;
 * # fn main() -> Result<()> {
 * # let dataset = AdmissionDataset::from_source(&GeneratedSource::new(500, None))?;
 * let filters = FilterSpec::new().search("F32");
 * let snapshot = dataset.analytics().snapshot(&filters, &SnapshotOptions::default());
 * println!("{}", serde_json::to_string_pretty(&snapshot)?);
 * # Ok(())
 * # }
 * ```
 *
 * ## Configuration
 *
 * ```no_run
 * # use admissions::prelude::*;
 * let config = ConfigBuilder::new()
 *     .csv_source("data/admissions.csv")
 *     .validation_level(ValidationLevel::Strict)
 *     .search_precedence(SearchPrecedence::Replace)
 *     .readmission_period_days(90)
 *     .build();
 * ```
 */

// Re-export error types from root
pub use error::{AdmissionsError, ErrorContext, Result};

// Public modules
pub mod analytics;
pub mod config;
pub mod data_types;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod generator;
pub mod reader;
pub mod schema;
pub mod source;
pub mod views;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use admissions::prelude::*;
/// ```
pub mod prelude {
    pub use crate::analytics::{AdmissionAnalytics, PeriodComparison, SnapshotOptions};
    pub use crate::config::{AdmissionsConfig, ConfigBuilder, OutputFormat, SourceConfig, ValidationLevel};
    pub use crate::data_types::*;
    pub use crate::dataset::{AdmissionDataset, DatasetStatistics};
    pub use crate::error::{AdmissionsError, Result};
    pub use crate::filter::{DateRange, FilterSpec, InclusiveRange, SearchPrecedence};
    pub use crate::generator::AdmissionGenerator;
    pub use crate::reader::AdmissionReader;
    pub use crate::source::{CsvSource, GeneratedSource, InMemorySource, RecordSource, ViewEndpoint};
    #[cfg(feature = "remote")]
    pub use crate::source::RemoteSource;
    pub use crate::views::*;
}

/// Common recipes built on the analytics engine
pub mod cookbook {
    use crate::prelude::*;

    /// KPI summary of every province present after filtering, largest first
    ///
    /// # Example
    /// ```no_run
    /// # use admissions::prelude::*;
    /// # use admissions::cookbook::kpis_by_province;
    /// # fn main() -> Result<()> {
    /// # let dataset = AdmissionDataset::from_source(&GeneratedSource::new(500, None))?;
    /// for (province, kpis) in kpis_by_province(&dataset, &FilterSpec::new()) {
    ///     println!("{province}: {} admissions", kpis.total_admissions);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn kpis_by_province(dataset: &AdmissionDataset, filters: &FilterSpec) -> Vec<(String, KpiSummary)> {
        let analytics = dataset.analytics();
        analytics
            .province_distribution(filters)
            .into_iter()
            .map(|row| {
                let scoped = FilterSpec {
                    provinces: vec![row.province.clone()],
                    ..filters.clone()
                };
                let kpis = analytics.kpis(&scoped);
                (row.province, kpis)
            })
            .collect()
    }

    /// Records whose code, chapter or municipality contains `query`, ignoring case
    pub fn search<'a>(dataset: &'a AdmissionDataset, query: &str) -> Vec<&'a AdmissionRecord> {
        dataset.filter(&FilterSpec::new().search(query))
    }
}
