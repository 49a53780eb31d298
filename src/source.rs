/*!
 * Record sources
 *
 * A [`RecordSource`] supplies the initial admission records once at startup.
 * The source is chosen from configuration by [`from_config`] and injected into
 * the dataset; nothing else in the crate knows where records came from.
 *
 * With the `remote` feature, [`RemoteSource`] talks to the admissions HTTP API.
 * Its view endpoints can also be queried directly so server-side aggregates
 * can be compared against local ones.
 */

use std::path::{Path, PathBuf};

use crate::config::{AdmissionsConfig, SourceConfig};
use crate::data_types::AdmissionRecord;
use crate::generator::AdmissionGenerator;
use crate::reader::AdmissionReader;
use crate::Result;

#[cfg(feature = "remote")]
use crate::{filter::FilterSpec, AdmissionsError};

/// Supplier of the initial record set
pub trait RecordSource: Send + Sync {
    /// Human-readable description used in log output
    fn name(&self) -> String;

    /// Load every record
    fn load(&self) -> Result<Vec<AdmissionRecord>>;
}

/// Records owned by the caller
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<AdmissionRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<AdmissionRecord>) -> Self {
        Self { records }
    }
}

impl RecordSource for InMemorySource {
    fn name(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }

    fn load(&self) -> Result<Vec<AdmissionRecord>> {
        Ok(self.records.clone())
    }
}

/// Synthetic records from [`AdmissionGenerator`]
#[derive(Debug, Clone, Default)]
pub struct GeneratedSource {
    generator: AdmissionGenerator,
    count: usize,
    seed: Option<u64>,
}

impl GeneratedSource {
    pub fn new(count: usize, seed: Option<u64>) -> Self {
        Self {
            generator: AdmissionGenerator::new().count(count).seed(seed),
            count,
            seed,
        }
    }
}

impl RecordSource for GeneratedSource {
    fn name(&self) -> String {
        match self.seed {
            Some(seed) => format!("{} generated records (seed {})", self.count, seed),
            None => format!("{} generated records", self.count),
        }
    }

    fn load(&self) -> Result<Vec<AdmissionRecord>> {
        Ok(self.generator.generate())
    }
}

/// Records from an admissions CSV file
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    reader: AdmissionReader,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: AdmissionReader::new(),
        }
    }

    /// Use a configured reader instead of the default one
    pub fn with_reader(mut self, reader: AdmissionReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvSource {
    fn name(&self) -> String {
        format!("CSV file {}", self.path.display())
    }

    fn load(&self) -> Result<Vec<AdmissionRecord>> {
        self.reader.load_csv(&self.path)
    }
}

/// Endpoints of the admissions HTTP API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewEndpoint {
    Admissions,
    Kpis,
    TimeSeries,
    TimeSeriesExtended,
    DiagnosisByChapter,
    TopDiagnoses,
    ProvinceData,
    LengthOfStayBuckets,
    ReadmissionRateExtended,
}

impl ViewEndpoint {
    pub const ALL: [ViewEndpoint; 9] = [
        ViewEndpoint::Admissions,
        ViewEndpoint::Kpis,
        ViewEndpoint::TimeSeries,
        ViewEndpoint::TimeSeriesExtended,
        ViewEndpoint::DiagnosisByChapter,
        ViewEndpoint::TopDiagnoses,
        ViewEndpoint::ProvinceData,
        ViewEndpoint::LengthOfStayBuckets,
        ViewEndpoint::ReadmissionRateExtended,
    ];

    /// Path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            ViewEndpoint::Admissions => "admissions",
            ViewEndpoint::Kpis => "kpis",
            ViewEndpoint::TimeSeries => "timeseries",
            ViewEndpoint::TimeSeriesExtended => "timeseries-extended",
            ViewEndpoint::DiagnosisByChapter => "diagnosis-by-chapter",
            ViewEndpoint::TopDiagnoses => "top-diagnoses",
            ViewEndpoint::ProvinceData => "province-data",
            ViewEndpoint::LengthOfStayBuckets => "length-of-stay-buckets",
            ViewEndpoint::ReadmissionRateExtended => "readmission-rate-extended",
        }
    }

    /// Full URL of this endpoint under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// Client of the admissions HTTP API
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct RemoteSource {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl RemoteSource {
    /// Create a client for the API at `base_url`
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .user_agent(concat!("admissions/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdmissionsError::Custom {
                message: format!("Failed to create HTTP client: {}", e),
                suggestion: Some("Check your network configuration".to_string()),
            })?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the admissions matching `filters`
    pub async fn fetch_admissions(&self, filters: &FilterSpec) -> Result<Vec<AdmissionRecord>> {
        self.fetch_view(ViewEndpoint::Admissions, filters, None).await
    }

    /// Fetch any view endpoint and decode its JSON body
    ///
    /// `limit` is only sent when given; the API reads it on `top-diagnoses`.
    pub async fn fetch_view<T>(&self, endpoint: ViewEndpoint, filters: &FilterSpec, limit: Option<usize>) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = endpoint.url(&self.base_url);
        let mut params = filters.to_query_pairs();
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        log::debug!("GET {} with {} query parameters", url, params.len());
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| remote_error(&url, e, "Check the URL and your network connection"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdmissionsError::Remote {
                message: format!("HTTP error {}", status),
                url,
                status: Some(status.as_u16()),
                suggestion: Some("Check that the admissions API is running and the base URL is correct".to_string()),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| remote_error(&url, e, "The API returned a body in an unexpected shape"))
    }
}

#[cfg(feature = "remote")]
fn remote_error(url: &str, err: reqwest::Error, suggestion: &str) -> AdmissionsError {
    AdmissionsError::Remote {
        message: err.to_string(),
        url: url.to_string(),
        status: err.status().map(|s| s.as_u16()),
        suggestion: Some(suggestion.to_string()),
    }
}

#[cfg(feature = "remote")]
impl RecordSource for RemoteSource {
    fn name(&self) -> String {
        format!("admissions API at {}", self.base_url)
    }

    fn load(&self) -> Result<Vec<AdmissionRecord>> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.fetch_admissions(&FilterSpec::default()))
    }
}

/// Build the record source selected by `config`
pub fn from_config(config: &AdmissionsConfig) -> Result<Box<dyn RecordSource>> {
    let source: Box<dyn RecordSource> = match &config.source {
        SourceConfig::Generated { count, seed } => Box::new(GeneratedSource::new(*count, *seed)),
        SourceConfig::Csv { path } => {
            Box::new(CsvSource::new(path).with_reader(AdmissionReader::from_config(config)))
        }
        #[cfg(feature = "remote")]
        SourceConfig::Remote { base_url, timeout_seconds } => {
            Box::new(RemoteSource::new(base_url.clone(), *timeout_seconds)?)
        }
        #[cfg(not(feature = "remote"))]
        SourceConfig::Remote { .. } => return Err(crate::AdmissionsError::feature_required("remote")),
    };

    log::info!("Using record source: {}", source.name());
    Ok(source)
}
