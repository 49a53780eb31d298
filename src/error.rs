/*!
 * Error handling for the admissions analytics library
 *
 * Provides detailed error types with context, suggestions, and recovery guidance.
 * The aggregation engine itself never fails on well-formed input; every variant
 * here comes from ingestion, configuration, or the record sources.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Admissions library result type
pub type Result<T> = std::result::Result<T, AdmissionsError>;

/// Error types with context and suggestions
#[derive(Error, Debug)]
pub enum AdmissionsError {
    /// File I/O errors with context
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },

    /// CSV parsing errors with location information
    #[error("CSV parsing error at line {line:?}: {message}")]
    CsvParse {
        message: String,
        line: Option<usize>,
        column: Option<String>,
        context: ErrorContext,
    },

    /// A record that cannot be admitted into a dataset
    #[error("Invalid record {}: {message}", record_id.as_deref().unwrap_or("<unknown>"))]
    InvalidRecord {
        record_id: Option<String>,
        field: Option<String>,
        value: Option<String>,
        message: String,
        context: ErrorContext,
    },

    /// Two records share one identifier
    #[error("Duplicate record identifier '{record_id}'")]
    DuplicateRecord {
        record_id: String,
        first_index: usize,
        second_index: usize,
    },

    /// File not found with suggestions
    #[error("File not found: {path}")]
    FileNotFound {
        path: PathBuf,
        suggestion: String,
    },

    /// Unknown enumeration code (sex, age group) with valid options
    #[error("Invalid {kind} code '{code}'")]
    InvalidCode {
        kind: String,
        code: String,
        valid_options: Vec<String>,
    },

    /// Schema mismatch with details
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        message: String,
        expected_columns: Option<usize>,
        found_columns: Option<usize>,
        mismatched_column: Option<(usize, String, String)>,
    },

    /// Date parsing errors with format hints
    #[error("Date parsing error: {message}")]
    DateParse {
        message: String,
        value: String,
        expected_format: String,
    },

    /// Malformed filter query parameter
    #[error("Invalid query parameter '{parameter}': {message}")]
    InvalidQuery {
        parameter: String,
        value: String,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// JSON (de)serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Remote record source errors
    #[error("Remote source error ({url}): {message}")]
    Remote {
        message: String,
        url: String,
        status: Option<u16>,
        suggestion: Option<String>,
    },

    /// Feature not enabled error
    #[error("Feature '{feature}' is not enabled")]
    FeatureNotEnabled {
        feature: String,
        enable_instruction: String,
    },

    /// Generic errors with custom message
    #[error("{message}")]
    Custom {
        message: String,
        suggestion: Option<String>,
    },
}

/// Error context providing additional information
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line_number: Option<usize>,
    pub column_name: Option<String>,
    pub record_id: Option<String>,
}

impl AdmissionsError {
    /// Create a file not found error with helpful suggestion
    pub fn file_not_found_with_suggestion(path: PathBuf) -> Self {
        let suggestion = if path.extension().map(|ext| ext == "csv").unwrap_or(false) {
            format!(
                "Check if the admissions file exists at '{}'. You can create a synthetic one with \
                `adcli generate --output {}`",
                path.display(),
                path.display()
            )
        } else if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
            format!(
                "Check if the configuration file exists at '{}'. Run `adcli config --write` to create one \
                with the default settings.",
                path.display()
            )
        } else {
            format!(
                "Check if the file exists at '{}'. Make sure the path is correct and you have read permissions.",
                path.display()
            )
        };

        Self::FileNotFound { path, suggestion }
    }

    /// Create an invalid record error for a field of a known record
    pub fn invalid_field(
        record_id: Option<&str>,
        field: &str,
        value: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRecord {
            record_id: record_id.map(str::to_string),
            field: Some(field.to_string()),
            value: value.map(str::to_string),
            message: message.into(),
            context: ErrorContext {
                column_name: Some(field.to_string()),
                record_id: record_id.map(str::to_string),
                ..Default::default()
            },
        }
    }

    /// Create an invalid sex code error with valid options
    pub fn invalid_sex(code: &str) -> Self {
        Self::InvalidCode {
            kind: "sex".to_string(),
            code: code.to_string(),
            valid_options: vec![
                "Masculino (male)".to_string(),
                "Femenino (female)".to_string(),
                "Desconocido (unknown)".to_string(),
            ],
        }
    }

    /// Create an invalid age group error with valid options
    pub fn invalid_age_group(code: &str) -> Self {
        Self::InvalidCode {
            kind: "age group".to_string(),
            code: code.to_string(),
            valid_options: crate::data_types::AgeGroup::ALL
                .iter()
                .map(|group| group.as_code().to_string())
                .collect(),
        }
    }

    /// Create a schema mismatch error with detailed information
    pub fn schema_mismatch_detailed(
        expected_columns: usize,
        found_columns: usize,
        mismatched_column: Option<(usize, String, String)>,
    ) -> Self {
        let message = if let Some((index, expected, found)) = &mismatched_column {
            format!(
                "Column {} mismatch: expected '{}', found '{}'",
                index, expected, found
            )
        } else {
            format!(
                "Expected {} columns, found {}",
                expected_columns, found_columns
            )
        };

        Self::SchemaMismatch {
            message,
            expected_columns: Some(expected_columns),
            found_columns: Some(found_columns),
            mismatched_column,
        }
    }

    /// Create a date parsing error with format information
    pub fn date_parse_with_format(value: &str, expected_format: &str) -> Self {
        Self::DateParse {
            message: format!("Cannot parse '{}' as date", value),
            value: value.to_string(),
            expected_format: expected_format.to_string(),
        }
    }

    /// Create an invalid query parameter error
    pub fn invalid_query(parameter: &str, value: &str, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            parameter: parameter.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Create a feature not enabled error
    pub fn feature_required(feature: &str) -> Self {
        let enable_instruction = match feature {
            "remote" => "Add 'admissions = { version = \"0.1\", features = [\"remote\"] }' to your Cargo.toml",
            "progress" => "Add 'admissions = { version = \"0.1\", features = [\"progress\"] }' to your Cargo.toml",
            _ => "Enable the required feature in your Cargo.toml",
        };

        Self::FeatureNotEnabled {
            feature: feature.to_string(),
            enable_instruction: enable_instruction.to_string(),
        }
    }

    /// Attach the file and line an ingestion error was found at
    pub fn at_location(mut self, path: Option<&std::path::Path>, line: usize) -> Self {
        match &mut self {
            Self::InvalidRecord { context, .. } | Self::CsvParse { context, .. } => {
                context.file_path = path.map(|p| p.to_path_buf());
                context.line_number = Some(line);
            }
            _ => {}
        }
        self
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::InvalidRecord { field, value, context, .. } => {
                let mut message = self.to_string();
                if let Some(field) = field {
                    message.push_str(&format!("\n\nField: {}", field));
                }
                if let Some(value) = value {
                    message.push_str(&format!(" (value '{}')", value));
                }
                if let Some(line) = context.line_number {
                    message.push_str(&format!("\nLine: {}", line));
                }
                message.push_str("\n\nSuggestion: fix the row or load with skip_invalid_records enabled");
                message
            }
            Self::DuplicateRecord { first_index, second_index, .. } => {
                format!("{}\n\nFirst seen at row {}, repeated at row {}", self, first_index + 1, second_index + 1)
            }
            Self::InvalidCode { valid_options, .. } => {
                format!("{}\n\nValid options: {}", self, valid_options.join(", "))
            }
            Self::DateParse { expected_format, .. } => {
                format!("{}\n\nExpected format: {}", self, expected_format)
            }
            Self::FeatureNotEnabled { enable_instruction, .. } => {
                format!("{}\n\nTo enable: {}", self, enable_instruction)
            }
            Self::Configuration { suggestion: Some(sug), .. }
            | Self::Remote { suggestion: Some(sug), .. }
            | Self::Custom { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for AdmissionsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            context: ErrorContext::default(),
        }
    }
}

impl From<csv::Error> for AdmissionsError {
    fn from(err: csv::Error) -> Self {
        let (line, message) = match err.position() {
            Some(pos) => (Some(pos.line() as usize), err.to_string()),
            None => (None, err.to_string()),
        };

        Self::CsvParse {
            message,
            line,
            column: None,
            context: ErrorContext::default(),
        }
    }
}

impl From<serde_json::Error> for AdmissionsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_record_names_the_record() {
        let err = AdmissionsError::invalid_field(Some("ADM-7"), "length_of_stay", Some("abc"), "not a number");
        assert!(err.to_string().contains("ADM-7"));
        let message = err.user_message();
        assert!(message.contains("length_of_stay"));
        assert!(message.contains("abc"));
    }

    #[test]
    fn test_at_location_sets_line() {
        let err = AdmissionsError::invalid_field(None, "sex", None, "missing")
            .at_location(Some(std::path::Path::new("data.csv")), 12);
        match err {
            AdmissionsError::InvalidRecord { context, .. } => {
                assert_eq!(context.line_number, Some(12));
                assert_eq!(context.file_path, Some(PathBuf::from("data.csv")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_age_group_lists_bands() {
        let message = AdmissionsError::invalid_age_group("17-99").user_message();
        assert!(message.contains("0-17"));
        assert!(message.contains("66+"));
    }
}
