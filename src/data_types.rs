/*!
 * Data type definitions for admission records
 *
 * This module contains type-safe representations of a hospital admission and
 * its coded fields, plus the validation applied when records are ingested.
 */

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use chrono::NaiveDate;

use crate::{AdmissionsError, Result};
use crate::config::ValidationLevel;

/// Recorded sex of the admitted patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Unknown];

    /// Parse a sex label. Accepts the dashboard labels and English names, case-insensitive.
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim().to_lowercase().as_str() {
            "masculino" | "male" | "m" | "hombre" => Ok(Sex::Male),
            "femenino" | "female" | "f" | "mujer" => Ok(Sex::Female),
            "desconocido" | "unknown" | "u" | "" => Ok(Sex::Unknown),
            _ => Err(AdmissionsError::invalid_sex(code)),
        }
    }

    /// Dashboard label used on the wire
    pub fn as_code(&self) -> &'static str {
        match self {
            Sex::Male => "Masculino",
            Sex::Female => "Femenino",
            Sex::Unknown => "Desconocido",
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

impl Serialize for Sex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

impl<'de> Deserialize<'de> for Sex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Sex::from_code(&code).map_err(serde::de::Error::custom)
    }
}

/// Fixed age bands used by the admission registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeGroup {
    Under18,
    From18To25,
    From26To40,
    From41To65,
    Over65,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Under18,
        AgeGroup::From18To25,
        AgeGroup::From26To40,
        AgeGroup::From41To65,
        AgeGroup::Over65,
    ];

    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "0-17" => Ok(AgeGroup::Under18),
            "18-25" => Ok(AgeGroup::From18To25),
            "26-40" => Ok(AgeGroup::From26To40),
            "41-65" => Ok(AgeGroup::From41To65),
            "66+" => Ok(AgeGroup::Over65),
            _ => Err(AdmissionsError::invalid_age_group(code)),
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            AgeGroup::Under18 => "0-17",
            AgeGroup::From18To25 => "18-25",
            AgeGroup::From26To40 => "26-40",
            AgeGroup::From41To65 => "41-65",
            AgeGroup::Over65 => "66+",
        }
    }
}

impl std::fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

impl Serialize for AgeGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

impl<'de> Deserialize<'de> for AgeGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        AgeGroup::from_code(&code).map_err(serde::de::Error::custom)
    }
}

/// One hospital admission
///
/// Records are immutable once loaded. Field names match the admissions API
/// and the CSV column names in [`crate::schema::AdmissionSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub id: String,
    pub admission_date: NaiveDate,
    pub discharge_date: NaiveDate,
    pub province: String,
    pub municipality: String,
    pub sex: Sex,
    pub age_group: AgeGroup,
    pub primary_diagnosis_code: String,
    /// Chapter text, e.g. `F30-F39: Trastornos del estado de ánimo`
    pub diagnosis_chapter: String,
    pub length_of_stay: u32,
    #[serde(rename = "readmission_30d")]
    pub readmitted_within_30_days: bool,
    pub severity_score: u8,
}

impl AdmissionRecord {
    pub const MIN_SEVERITY: u8 = 1;
    pub const MAX_SEVERITY: u8 = 10;

    /// Year-month key of the admission date (`YYYY-MM`)
    pub fn admission_month(&self) -> String {
        self.admission_date.format("%Y-%m").to_string()
    }

    /// Days between admission and discharge
    pub fn days_between_dates(&self) -> i64 {
        (self.discharge_date - self.admission_date).num_days()
    }

    /// Case-insensitive free-text match against code, chapter and municipality.
    /// `query_lower` must already be lowercase.
    pub fn matches_search(&self, query_lower: &str) -> bool {
        self.primary_diagnosis_code.to_lowercase().contains(query_lower)
            || self.diagnosis_chapter.to_lowercase().contains(query_lower)
            || self.municipality.to_lowercase().contains(query_lower)
    }

    /// Check the record against the given validation level
    ///
    /// - `None`: accept everything
    /// - `Basic`: identifier and required text fields are present
    /// - `Standard`: plus severity within 1-10 and discharge not before admission
    /// - `Strict`: plus length of stay equal to the date difference
    pub fn validate(&self, level: ValidationLevel) -> Result<()> {
        if level == ValidationLevel::None {
            return Ok(());
        }

        let id = Some(self.id.as_str());
        if self.id.trim().is_empty() {
            return Err(AdmissionsError::invalid_field(None, "id", None, "identifier cannot be empty"));
        }
        for (field, value) in [
            ("province", &self.province),
            ("municipality", &self.municipality),
            ("primary_diagnosis_code", &self.primary_diagnosis_code),
            ("diagnosis_chapter", &self.diagnosis_chapter),
        ] {
            if value.trim().is_empty() {
                return Err(AdmissionsError::invalid_field(id, field, None, "required field is empty"));
            }
        }

        if level == ValidationLevel::Basic {
            return Ok(());
        }

        if !(Self::MIN_SEVERITY..=Self::MAX_SEVERITY).contains(&self.severity_score) {
            return Err(AdmissionsError::invalid_field(
                id,
                "severity_score",
                Some(&self.severity_score.to_string()),
                format!("severity must be between {} and {}", Self::MIN_SEVERITY, Self::MAX_SEVERITY),
            ));
        }
        if self.discharge_date < self.admission_date {
            return Err(AdmissionsError::invalid_field(
                id,
                "discharge_date",
                Some(&self.discharge_date.to_string()),
                format!("discharge precedes admission on {}", self.admission_date),
            ));
        }

        if level == ValidationLevel::Strict && self.days_between_dates() != i64::from(self.length_of_stay) {
            return Err(AdmissionsError::invalid_field(
                id,
                "length_of_stay",
                Some(&self.length_of_stay.to_string()),
                format!("dates span {} days", self.days_between_dates()),
            ));
        }

        Ok(())
    }
}

/// Text before the first `:` of a chapter, or the whole text without one
pub fn chapter_label(chapter: &str) -> &str {
    chapter.split(':').next().unwrap_or(chapter)
}
