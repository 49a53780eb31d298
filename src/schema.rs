/*!
 * Schema definitions for admission data files
 *
 * Column layout of the admissions CSV file. The names match the field names
 * of the admissions API so one file can be produced from an API dump.
 */

use crate::{AdmissionsError, Result};

/// Admissions CSV file schema
pub struct AdmissionSchema;

impl AdmissionSchema {
    pub const ID: usize = 0;
    pub const ADMISSION_DATE: usize = 1;
    pub const DISCHARGE_DATE: usize = 2;
    pub const PROVINCE: usize = 3;
    pub const MUNICIPALITY: usize = 4;
    pub const SEX: usize = 5;
    pub const AGE_GROUP: usize = 6;
    pub const PRIMARY_DIAGNOSIS_CODE: usize = 7;
    pub const DIAGNOSIS_CHAPTER: usize = 8;
    pub const LENGTH_OF_STAY: usize = 9;
    pub const READMISSION_30D: usize = 10;
    pub const SEVERITY_SCORE: usize = 11;

    /// Date format used by both date columns
    pub const DATE_FORMAT: &'static str = "%Y-%m-%d";

    /// Get all column names in the exact order they appear in the CSV file
    pub fn column_names() -> Vec<&'static str> {
        vec![
            "id",
            "admission_date",
            "discharge_date",
            "province",
            "municipality",
            "sex",
            "age_group",
            "primary_diagnosis_code",
            "diagnosis_chapter",
            "length_of_stay",
            "readmission_30d",
            "severity_score",
        ]
    }

    /// Number of columns in the file
    pub fn column_count() -> usize {
        Self::column_names().len()
    }

    /// Name of the column at `index`
    pub fn column_name(index: usize) -> Option<&'static str> {
        Self::column_names().get(index).copied()
    }

    /// Validate that headers match the expected schema
    ///
    /// Header names are compared case-insensitively with surrounding whitespace
    /// ignored, so files exported by spreadsheets still load.
    pub fn validate_headers(headers: &[String]) -> Result<()> {
        let expected = Self::column_names();

        if headers.len() != expected.len() {
            return Err(AdmissionsError::schema_mismatch_detailed(
                expected.len(),
                headers.len(),
                None,
            ));
        }

        for (i, (header, expected_header)) in headers.iter().zip(expected.iter()).enumerate() {
            if !header.trim().eq_ignore_ascii_case(expected_header) {
                return Err(AdmissionsError::schema_mismatch_detailed(
                    expected.len(),
                    headers.len(),
                    Some((i, expected_header.to_string(), header.clone())),
                ));
            }
        }

        Ok(())
    }

    /// Parse the readmission flag column
    pub fn parse_flag(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "si" | "sí" | "s" => Some(true),
            "false" | "0" | "no" | "n" => Some(false),
            _ => None,
        }
    }
}
