/*!
 * Loaded admission dataset
 *
 * Wraps the record set supplied by a [`RecordSource`] with an identifier index
 * and entry points into the analytics engine. Records are read-only once the
 * dataset is built.
 */

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::analytics::AdmissionAnalytics;
use crate::config::AdmissionsConfig;
use crate::data_types::{AdmissionRecord, Sex};
use crate::filter::FilterSpec;
use crate::source::{self, RecordSource};
use crate::views::percentage;
use crate::{AdmissionsError, Result};

/// Immutable collection of admissions with an identifier index
///
/// # Example
/// ```no_run
/// # use admissions::prelude::*;
/// let source = GeneratedSource::new(500, Some(42));
/// let dataset = AdmissionDataset::from_source(&source)?;
/// let kpis = dataset.analytics().kpis(&FilterSpec::new().province("Madrid"));
/// println!("{} admissions in Madrid", kpis.total_admissions);
/// # Ok::<(), admissions::AdmissionsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionDataset {
    records: Vec<AdmissionRecord>,
    id_index: HashMap<String, usize>,
}

impl AdmissionDataset {
    /// Build a dataset, rejecting duplicate identifiers
    pub fn new(records: Vec<AdmissionRecord>) -> Result<Self> {
        let id_index = build_id_index(&records)?;
        Ok(Self { records, id_index })
    }

    /// Load every record from `source`
    pub fn from_source(source: &dyn RecordSource) -> Result<Self> {
        let records = source.load()?;
        log::debug!("Indexing {} records from {}", records.len(), source.name());
        Self::new(records)
    }

    /// Load from the source selected by `config`
    pub fn from_config(config: &AdmissionsConfig) -> Result<Self> {
        let source = source::from_config(config)?;
        Self::from_source(source.as_ref())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in load order
    pub fn records(&self) -> &[AdmissionRecord] {
        &self.records
    }

    /// Look up one admission by identifier
    pub fn get_by_id(&self, id: &str) -> Option<&AdmissionRecord> {
        self.id_index.get(id).and_then(|&idx| self.records.get(idx))
    }

    /// Analytics engine over this dataset
    pub fn analytics(&self) -> AdmissionAnalytics<'_> {
        AdmissionAnalytics::new(&self.records)
    }

    /// Records matching `filters`, in load order
    pub fn filter(&self, filters: &FilterSpec) -> Vec<&AdmissionRecord> {
        self.analytics().filter(filters)
    }

    pub fn statistics(&self) -> DatasetStatistics {
        DatasetStatistics::from_records(&self.records)
    }
}

fn build_id_index(records: &[AdmissionRecord]) -> Result<HashMap<String, usize>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let index: HashMap<String, usize> = records
            .par_iter()
            .enumerate()
            .map(|(idx, record)| (record.id.clone(), idx))
            .collect();

        if index.len() == records.len() {
            return Ok(index);
        }
    }

    // Sequential scan; also reports the first colliding pair
    sequential_id_index(records)
}

fn sequential_id_index(records: &[AdmissionRecord]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        if let Some(first_index) = index.insert(record.id.clone(), idx) {
            return Err(AdmissionsError::DuplicateRecord {
                record_id: record.id.clone(),
                first_index,
                second_index: idx,
            });
        }
    }
    Ok(index)
}

/// Dataset statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStatistics {
    pub total_admissions: usize,
    pub first_admission: Option<NaiveDate>,
    pub last_admission: Option<NaiveDate>,
    pub provinces_represented: usize,
    pub municipalities_represented: usize,
    pub chapters_represented: usize,
    pub unique_diagnosis_codes: usize,
    pub male: usize,
    pub female: usize,
    pub unknown_sex: usize,
    pub readmissions: usize,
}

impl DatasetStatistics {
    /// Calculate statistics from a record set
    pub fn from_records(records: &[AdmissionRecord]) -> Self {
        let mut stats = Self {
            total_admissions: records.len(),
            ..Default::default()
        };

        let mut provinces = HashSet::new();
        let mut municipalities = HashSet::new();
        let mut chapters = HashSet::new();
        let mut codes = HashSet::new();

        for record in records {
            match record.sex {
                Sex::Male => stats.male += 1,
                Sex::Female => stats.female += 1,
                Sex::Unknown => stats.unknown_sex += 1,
            }
            if record.readmitted_within_30_days {
                stats.readmissions += 1;
            }

            stats.first_admission = Some(stats.first_admission.map_or(record.admission_date, |d| d.min(record.admission_date)));
            stats.last_admission = Some(stats.last_admission.map_or(record.admission_date, |d| d.max(record.admission_date)));

            provinces.insert(record.province.as_str());
            municipalities.insert((record.province.as_str(), record.municipality.as_str()));
            chapters.insert(record.diagnosis_chapter.as_str());
            codes.insert(record.primary_diagnosis_code.as_str());
        }

        stats.provinces_represented = provinces.len();
        stats.municipalities_represented = municipalities.len();
        stats.chapters_represented = chapters.len();
        stats.unique_diagnosis_codes = codes.len();
        stats
    }

    /// Print a formatted summary of the statistics
    pub fn print_summary(&self) {
        println!("=== Admissions Dataset Statistics ===");
        println!("Total Admissions: {}", self.total_admissions);
        if let (Some(first), Some(last)) = (self.first_admission, self.last_admission) {
            println!("Admission Dates: {} to {}", first, last);
        }
        println!("  Male: {} ({:.1}%)", self.male, percentage(self.male, self.total_admissions));
        println!("  Female: {} ({:.1}%)", self.female, percentage(self.female, self.total_admissions));
        println!("  Unknown: {} ({:.1}%)", self.unknown_sex, percentage(self.unknown_sex, self.total_admissions));
        println!(
            "Readmissions within 30 days: {} ({:.1}%)",
            self.readmissions,
            percentage(self.readmissions, self.total_admissions)
        );
        println!("Provinces Represented: {}", self.provinces_represented);
        println!("Municipalities Represented: {}", self.municipalities_represented);
        println!("Diagnosis Chapters: {}", self.chapters_represented);
        println!("Unique Diagnosis Codes: {}", self.unique_diagnosis_codes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::test_support::record;
    use crate::source::InMemorySource;

    #[test]
    fn test_duplicate_ids_rejected() {
        let records = vec![
            record("A", "2024-01-01", 1, Sex::Male, "F30-F39: x", "Madrid"),
            record("B", "2024-01-02", 1, Sex::Male, "F30-F39: x", "Madrid"),
            record("A", "2024-01-03", 1, Sex::Male, "F30-F39: x", "Madrid"),
        ];
        match AdmissionDataset::new(records) {
            Err(AdmissionsError::DuplicateRecord { record_id, first_index, second_index }) => {
                assert_eq!(record_id, "A");
                assert_eq!((first_index, second_index), (0, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_and_filter() {
        let source = InMemorySource::new(vec![
            record("A", "2024-01-01", 1, Sex::Male, "F30-F39: x", "Madrid"),
            record("B", "2024-01-02", 4, Sex::Female, "F40-F48: y", "Sevilla"),
        ]);
        let dataset = AdmissionDataset::from_source(&source).unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(!dataset.is_empty());
        assert_eq!(dataset.get_by_id("B").map(|r| r.province.as_str()), Some("Sevilla"));
        assert!(dataset.get_by_id("C").is_none());

        let sevilla = dataset.filter(&FilterSpec::new().province("Sevilla"));
        assert_eq!(sevilla.len(), 1);
        assert_eq!(dataset.analytics().kpis(&FilterSpec::new()).total_admissions, 2);
    }

    #[test]
    fn test_statistics() {
        let mut records = vec![
            record("A", "2024-03-01", 1, Sex::Male, "F30-F39: x", "Madrid"),
            record("B", "2023-05-02", 4, Sex::Female, "F40-F48: y", "Sevilla"),
            record("C", "2024-01-09", 4, Sex::Unknown, "F40-F48: y", "Sevilla"),
        ];
        records[2].readmitted_within_30_days = true;
        let stats = AdmissionDataset::new(records).unwrap().statistics();
        assert_eq!(stats.total_admissions, 3);
        assert_eq!(stats.first_admission, NaiveDate::from_ymd_opt(2023, 5, 2));
        assert_eq!(stats.last_admission, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(stats.provinces_represented, 2);
        assert_eq!(stats.chapters_represented, 2);
        assert_eq!((stats.male, stats.female, stats.unknown_sex), (1, 1, 1));
        assert_eq!(stats.readmissions, 1);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = AdmissionDataset::new(Vec::new()).unwrap();
        assert!(dataset.is_empty());
        let stats = dataset.statistics();
        assert_eq!(stats, DatasetStatistics::default());
    }
}
