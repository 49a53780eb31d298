/*!
 * Synthetic admission generator
 *
 * Produces a plausible psychiatric admissions dataset covering ten Spanish
 * provinces and the ten F-chapters of ICD-10 over 2023 and 2024. With a seed
 * the output is fully reproducible, which the tests and benchmarks rely on.
 */

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data_types::{AdmissionRecord, AgeGroup, Sex};

/// Records produced when no count is configured
pub const DEFAULT_RECORD_COUNT: usize = 500;

/// Provinces with their municipalities
pub const PROVINCES: [(&str, &[&str]); 10] = [
    ("Madrid", &["Madrid", "Móstoles", "Alcalá de Henares", "Fuenlabrada"]),
    ("Barcelona", &["Barcelona", "Hospitalet", "Badalona", "Terrassa"]),
    ("Valencia", &["Valencia", "Gandía", "Torrent", "Paterna"]),
    ("Sevilla", &["Sevilla", "Dos Hermanas", "Alcalá de Guadaíra"]),
    ("Zaragoza", &["Zaragoza", "Calatayud", "Utebo"]),
    ("Málaga", &["Málaga", "Marbella", "Vélez-Málaga"]),
    ("Murcia", &["Murcia", "Cartagena", "Lorca"]),
    ("Palma", &["Palma", "Calvià", "Manacor"]),
    ("Las Palmas", &["Las Palmas", "Telde", "Arucas"]),
    ("Bilbao", &["Bilbao", "Barakaldo", "Getxo"]),
];

/// Diagnosis chapters with the codes drawn for each
pub const DIAGNOSIS_CHAPTERS: [(&str, &[&str]); 10] = [
    ("F00-F09: Trastornos mentales orgánicos", &["F00", "F01", "F02", "F03", "F05"]),
    (
        "F10-F19: Trastornos por uso de sustancias",
        &["F10.2", "F11.2", "F12.2", "F13.2", "F14.2", "F15.2"],
    ),
    (
        "F20-F29: Esquizofrenia y trastornos psicóticos",
        &["F20.0", "F20.1", "F20.2", "F25.0", "F25.1"],
    ),
    (
        "F30-F39: Trastornos del estado de ánimo",
        &["F31.0", "F31.3", "F32.0", "F32.1", "F32.2", "F33.0", "F33.2"],
    ),
    ("F40-F48: Trastornos de ansiedad", &["F40.0", "F41.0", "F41.1", "F42.0", "F43.1"]),
    ("F50-F59: Trastornos de la conducta alimentaria", &["F50.0", "F50.1", "F50.2"]),
    ("F60-F69: Trastornos de la personalidad", &["F60.0", "F60.3", "F60.31"]),
    ("F70-F79: Retraso mental", &["F70", "F71", "F72"]),
    ("F80-F89: Trastornos del desarrollo", &["F84.0", "F84.5"]),
    ("F90-F98: Trastornos de inicio en la infancia", &["F90.0", "F91.0", "F98.0"]),
];

const READMISSION_PROBABILITY: f64 = 0.15;
const MAX_GENERATED_STAY: u32 = 30;

/// Seedable generator of synthetic admissions
#[derive(Debug, Clone)]
pub struct AdmissionGenerator {
    count: usize,
    seed: Option<u64>,
    first_date: NaiveDate,
    last_date: NaiveDate,
}

impl Default for AdmissionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionGenerator {
    pub fn new() -> Self {
        Self {
            count: DEFAULT_RECORD_COUNT,
            seed: None,
            first_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            last_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Fix the RNG seed; without one every run differs
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Restrict admission dates to `first..=last`
    pub fn date_span(mut self, first: NaiveDate, last: NaiveDate) -> Self {
        self.first_date = first.min(last);
        self.last_date = first.max(last);
        self
    }

    /// Generate the records, most recent admission first
    pub fn generate(&self) -> Vec<AdmissionRecord> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let span_days = (self.last_date - self.first_date).num_days();

        let mut records: Vec<AdmissionRecord> = (0..self.count)
            .map(|i| {
                let (province, municipalities) = PROVINCES[rng.random_range(0..PROVINCES.len())];
                let municipality = municipalities[rng.random_range(0..municipalities.len())];
                let sex = Sex::ALL[rng.random_range(0..Sex::ALL.len())];
                let age_group = AgeGroup::ALL[rng.random_range(0..AgeGroup::ALL.len())];
                let (chapter, codes) = DIAGNOSIS_CHAPTERS[rng.random_range(0..DIAGNOSIS_CHAPTERS.len())];
                let code = codes[rng.random_range(0..codes.len())];

                let admission_date = self.first_date + Duration::days(rng.random_range(0..=span_days));
                let length_of_stay = rng.random_range(1..=MAX_GENERATED_STAY);

                AdmissionRecord {
                    id: format!("ADM-{}", i + 1),
                    admission_date,
                    discharge_date: admission_date + Duration::days(i64::from(length_of_stay)),
                    province: province.to_string(),
                    municipality: municipality.to_string(),
                    sex,
                    age_group,
                    primary_diagnosis_code: code.to_string(),
                    diagnosis_chapter: chapter.to_string(),
                    length_of_stay,
                    readmitted_within_30_days: rng.random_bool(READMISSION_PROBABILITY),
                    severity_score: rng.random_range(AdmissionRecord::MIN_SEVERITY..=AdmissionRecord::MAX_SEVERITY),
                }
            })
            .collect();

        records.sort_by(|a, b| b.admission_date.cmp(&a.admission_date));
        log::debug!("Generated {} synthetic admissions (seed {:?})", records.len(), self.seed);
        records
    }
}

/// Shorthand for `AdmissionGenerator::new().count(count).seed(seed).generate()`
pub fn generate(count: usize, seed: Option<u64>) -> Vec<AdmissionRecord> {
    AdmissionGenerator::new().count(count).seed(seed).generate()
}
