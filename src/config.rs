/*!
 * Configuration support for the admissions library
 *
 * Provides runtime configuration options for customizing library behavior,
 * including which record source is injected at startup.
 */

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::filter::SearchPrecedence;

/// Configuration for the admissions library and the `adcli` binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionsConfig {
    /// Whether to show progress bars during long operations
    #[serde(default = "default_enable_progress_bar")]
    pub enable_progress_bar: bool,

    /// Number of threads for parallel operations (None = use all available)
    #[serde(default)]
    pub parallel_threads: Option<usize>,

    /// Validation level for ingested records
    #[serde(default)]
    pub validation_level: ValidationLevel,

    /// Whether to skip invalid records during ingestion
    #[serde(default)]
    pub skip_invalid_records: bool,

    /// How the free-text search combines with the facet filters
    #[serde(default)]
    pub search_precedence: SearchPrecedence,

    /// Number of rows in the top diagnoses view
    #[serde(default = "default_top_diagnoses_limit")]
    pub top_diagnoses_limit: usize,

    /// Length in days of the windows compared by the readmission delta
    #[serde(default = "default_readmission_period_days")]
    pub readmission_period_days: u32,

    /// Default output format of the CLI
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Where records are loaded from
    #[serde(default)]
    pub source: SourceConfig,
}

/// Validation level for ingested records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    /// No validation, fastest loading
    None,
    /// Identifier and required text fields
    Basic,
    /// Basic plus severity range and date order (recommended)
    #[default]
    Standard,
    /// Standard plus length of stay consistent with the dates
    Strict,
}

impl ValidationLevel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "none" => Some(ValidationLevel::None),
            "basic" => Some(ValidationLevel::Basic),
            "standard" => Some(ValidationLevel::Standard),
            "strict" => Some(ValidationLevel::Strict),
            _ => None,
        }
    }
}

/// Record source selected at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic records from the built-in generator
    Generated {
        #[serde(default = "default_generated_count")]
        count: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Records from an admissions CSV file
    Csv { path: PathBuf },
    /// Records from the admissions HTTP API
    Remote {
        base_url: String,
        #[serde(default = "default_timeout_seconds")]
        timeout_seconds: u64,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Generated {
            count: default_generated_count(),
            seed: None,
        }
    }
}

/// Output format of the command-line front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Default for AdmissionsConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: default_enable_progress_bar(),
            parallel_threads: None,
            validation_level: ValidationLevel::Standard,
            skip_invalid_records: false,
            search_precedence: SearchPrecedence::default(),
            top_diagnoses_limit: default_top_diagnoses_limit(),
            readmission_period_days: default_readmission_period_days(),
            output_format: OutputFormat::default(),
            source: SourceConfig::default(),
        }
    }
}

// Default value functions for serde
fn default_enable_progress_bar() -> bool {
    true
}

fn default_top_diagnoses_limit() -> usize {
    10
}

fn default_readmission_period_days() -> u32 {
    30
}

fn default_generated_count() -> usize {
    crate::generator::DEFAULT_RECORD_COUNT
}

fn default_timeout_seconds() -> u64 {
    30
}

impl AdmissionsConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables on top of the defaults
    ///
    /// Supported environment variables:
    /// - `ADMISSIONS_PROGRESS_BAR`: "true" or "false"
    /// - `ADMISSIONS_PARALLEL_THREADS`: number or "auto"
    /// - `ADMISSIONS_VALIDATION_LEVEL`: "none", "basic", "standard", or "strict"
    /// - `ADMISSIONS_SKIP_INVALID`: "true" or "false"
    /// - `ADMISSIONS_SEARCH_PRECEDENCE`: "conjunctive" or "replace"
    /// - `ADMISSIONS_TOP_LIMIT`: number
    /// - `ADMISSIONS_READMISSION_PERIOD_DAYS`: number
    /// - `ADMISSIONS_CSV`: path of a CSV file to load
    /// - `ADMISSIONS_REMOTE_URL`: base URL of the admissions API
    /// - `ADMISSIONS_SEED`: seed of the synthetic generator
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `ADMISSIONS_*` environment variables to this configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("ADMISSIONS_PROGRESS_BAR") {
            self.enable_progress_bar = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("ADMISSIONS_PARALLEL_THREADS") {
            self.parallel_threads = match val.to_lowercase().as_str() {
                "auto" | "0" => None,
                num => num.parse().ok(),
            };
        }

        if let Ok(val) = std::env::var("ADMISSIONS_VALIDATION_LEVEL") {
            self.validation_level = ValidationLevel::from_name(&val).unwrap_or_default();
        }

        if let Ok(val) = std::env::var("ADMISSIONS_SKIP_INVALID") {
            self.skip_invalid_records = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("ADMISSIONS_SEARCH_PRECEDENCE") {
            if let Some(precedence) = SearchPrecedence::from_name(&val) {
                self.search_precedence = precedence;
            }
        }

        if let Ok(val) = std::env::var("ADMISSIONS_TOP_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.top_diagnoses_limit = limit;
            }
        }

        if let Ok(val) = std::env::var("ADMISSIONS_READMISSION_PERIOD_DAYS") {
            if let Ok(days) = val.parse() {
                self.readmission_period_days = days;
            }
        }

        if let Ok(val) = std::env::var("ADMISSIONS_CSV") {
            self.source = SourceConfig::Csv { path: PathBuf::from(val) };
        } else if let Ok(val) = std::env::var("ADMISSIONS_REMOTE_URL") {
            self.source = SourceConfig::Remote {
                base_url: val,
                timeout_seconds: default_timeout_seconds(),
            };
        } else if let Ok(val) = std::env::var("ADMISSIONS_SEED") {
            if let SourceConfig::Generated { seed, .. } = &mut self.source {
                *seed = val.parse().ok();
            }
        }

        self
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::AdmissionsError::file_not_found_with_suggestion(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::AdmissionsError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                suggestion: Some("Check that the file is valid TOML format".to_string()),
            })
    }

    /// Serialize configuration to TOML text
    pub fn to_toml_string(&self) -> crate::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::AdmissionsError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                suggestion: None,
            })
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let contents = self.to_toml_string()?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/admissions/config.toml` on Linux
    /// or `%APPDATA%\admissions\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "admissions")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Environment variables
    /// 2. Default config file (if exists)
    /// 3. Built-in defaults
    pub fn load() -> Self {
        let base = match Self::default_config_path() {
            Some(config_path) if config_path.exists() => match Self::from_file(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring config file {}: {}", config_path.display(), e);
                    Self::default()
                }
            },
            _ => Self::default(),
        };

        base.with_env_overrides()
    }
}

/// Builder for customizing configuration
#[derive(Default)]
pub struct ConfigBuilder {
    config: AdmissionsConfig,
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: AdmissionsConfig::default(),
        }
    }

    /// Set progress bar enabled
    pub fn progress_bar(mut self, enabled: bool) -> Self {
        self.config.enable_progress_bar = enabled;
        self
    }

    /// Set number of parallel threads
    pub fn parallel_threads(mut self, threads: Option<usize>) -> Self {
        self.config.parallel_threads = threads;
        self
    }

    /// Set validation level
    pub fn validation_level(mut self, level: ValidationLevel) -> Self {
        self.config.validation_level = level;
        self
    }

    /// Set skip invalid records
    pub fn skip_invalid_records(mut self, skip: bool) -> Self {
        self.config.skip_invalid_records = skip;
        self
    }

    /// Set search precedence
    pub fn search_precedence(mut self, precedence: SearchPrecedence) -> Self {
        self.config.search_precedence = precedence;
        self
    }

    /// Set the top diagnoses limit
    pub fn top_diagnoses_limit(mut self, limit: usize) -> Self {
        self.config.top_diagnoses_limit = limit;
        self
    }

    /// Set the readmission comparison period
    pub fn readmission_period_days(mut self, days: u32) -> Self {
        self.config.readmission_period_days = days;
        self
    }

    /// Load records from a CSV file
    pub fn csv_source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.source = SourceConfig::Csv { path: path.as_ref().to_path_buf() };
        self
    }

    /// Load synthetic records
    pub fn generated_source(mut self, count: usize, seed: Option<u64>) -> Self {
        self.config.source = SourceConfig::Generated { count, seed };
        self
    }

    /// Load records from the admissions API
    pub fn remote_source(mut self, base_url: impl Into<String>) -> Self {
        self.config.source = SourceConfig::Remote {
            base_url: base_url.into(),
            timeout_seconds: default_timeout_seconds(),
        };
        self
    }

    /// Set the CLI output format
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Build the configuration
    pub fn build(self) -> AdmissionsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AdmissionsConfig::default();
        assert!(config.enable_progress_bar);
        assert_eq!(config.validation_level, ValidationLevel::Standard);
        assert_eq!(config.search_precedence, SearchPrecedence::Conjunctive);
        assert_eq!(config.top_diagnoses_limit, 10);
        assert_eq!(config.readmission_period_days, 30);
        assert!(matches!(config.source, SourceConfig::Generated { count: 500, seed: None }));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .progress_bar(false)
            .parallel_threads(Some(4))
            .validation_level(ValidationLevel::Strict)
            .skip_invalid_records(true)
            .search_precedence(SearchPrecedence::Replace)
            .csv_source("admissions.csv")
            .build();

        assert!(!config.enable_progress_bar);
        assert_eq!(config.parallel_threads, Some(4));
        assert_eq!(config.validation_level, ValidationLevel::Strict);
        assert!(config.skip_invalid_records);
        assert_eq!(config.search_precedence, SearchPrecedence::Replace);
        assert_eq!(config.source, SourceConfig::Csv { path: PathBuf::from("admissions.csv") });
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AdmissionsConfig::from_toml_str(
            r#"
            search_precedence = "replace"
            readmission_period_days = 90

            [source]
            kind = "remote"
            base_url = "https://example.org/api"
            "#,
        )
        .unwrap();

        assert_eq!(config.search_precedence, SearchPrecedence::Replace);
        assert_eq!(config.readmission_period_days, 90);
        assert_eq!(config.top_diagnoses_limit, 10);
        assert_eq!(
            config.source,
            SourceConfig::Remote { base_url: "https://example.org/api".to_string(), timeout_seconds: 30 }
        );
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConfigBuilder::new()
            .generated_source(50, Some(7))
            .output_format(OutputFormat::Json)
            .build();

        config.save(&path).unwrap();
        assert_eq!(AdmissionsConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = AdmissionsConfig::from_toml_str("top_diagnoses_limit = \"ten\"").unwrap_err();
        assert!(matches!(err, crate::AdmissionsError::Configuration { .. }));
    }
}
