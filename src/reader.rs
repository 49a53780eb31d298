/*!
 * CSV reader and writer for admission data files
 *
 * Reads admissions CSV files into [`AdmissionRecord`]s with header checks,
 * per-row validation, and an optional progress bar. A malformed row either
 * aborts the load with an error naming the record and line, or is skipped
 * with a warning when `skip_invalid_records` is set.
 */

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{AdmissionsConfig, ValidationLevel};
use crate::data_types::{AdmissionRecord, AgeGroup, Sex};
use crate::schema::AdmissionSchema;
use crate::{AdmissionsError, Result};

/// Number of skipped rows reported individually before going quiet
const MAX_REPORTED_SKIPS: usize = 10;

/// Admissions CSV reader
#[derive(Debug, Clone)]
pub struct AdmissionReader {
    /// Whether to validate CSV headers against the expected schema
    validate_headers: bool,
    /// Whether to skip invalid records (true) or fail on the first one (false)
    skip_invalid_records: bool,
    /// Checks applied to every parsed record
    validation_level: ValidationLevel,
    /// Whether to show a progress bar; ignored without the `progress` feature
    show_progress_bar: bool,
}

impl Default for AdmissionReader {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionReader {
    /// Create a reader with header validation, standard record validation and no skipping
    pub fn new() -> Self {
        Self {
            validate_headers: true,
            skip_invalid_records: false,
            validation_level: ValidationLevel::Standard,
            show_progress_bar: cfg!(feature = "progress"),
        }
    }

    /// Create a reader following the ingestion settings of `config`
    pub fn from_config(config: &AdmissionsConfig) -> Self {
        Self::new()
            .with_skip_invalid_records(config.skip_invalid_records)
            .with_validation_level(config.validation_level)
            .with_progress_bar(config.enable_progress_bar)
    }

    /// Enable or disable header validation
    pub fn with_header_validation(mut self, validate: bool) -> Self {
        self.validate_headers = validate;
        self
    }

    /// Enable or disable skipping invalid records
    pub fn with_skip_invalid_records(mut self, skip: bool) -> Self {
        self.skip_invalid_records = skip;
        self
    }

    pub fn with_validation_level(mut self, level: ValidationLevel) -> Self {
        self.validation_level = level;
        self
    }

    /// Enable or disable the progress bar
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress_bar = show;
        self
    }

    /// Load every admission from a CSV file
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<Vec<AdmissionRecord>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AdmissionsError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        self.read_inner(file, Some(path), Some(file_size))
    }

    /// Load every admission from any CSV byte stream
    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<AdmissionRecord>> {
        self.read_inner(reader, None, None)
    }

    fn read_inner<R: Read>(&self, source: R, origin: Option<&Path>, total_bytes: Option<u64>) -> Result<Vec<AdmissionRecord>> {
        let start_time = Instant::now();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(source);

        if self.validate_headers {
            let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
            AdmissionSchema::validate_headers(&headers)?;
        }

        #[cfg(feature = "progress")]
        let progress_bar = match total_bytes {
            Some(total) if self.show_progress_bar => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .map(|style| style.progress_chars("#>-"))
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                Some(pb)
            }
            _ => None,
        };
        #[cfg(not(feature = "progress"))]
        let _ = total_bytes;

        let mut records = Vec::new();
        let mut invalid_count = 0usize;
        let mut row = StringRecord::new();

        loop {
            let line = reader.position().line() as usize;
            let outcome = match reader.read_record(&mut row) {
                Ok(false) => break,
                Ok(true) => {
                    let line = row.position().map(|p| p.line() as usize).unwrap_or(line);
                    self.parse_record(&row).map_err(|e| e.at_location(origin, line))
                }
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => Err(AdmissionsError::from(e).at_location(origin, line)),
            };

            match outcome {
                Ok(record) => records.push(record),
                Err(e) if self.skip_invalid_records => {
                    invalid_count += 1;
                    if invalid_count <= MAX_REPORTED_SKIPS {
                        log::warn!("Skipping invalid record: {}", e);
                    }
                }
                Err(e) => return Err(e),
            }

            #[cfg(feature = "progress")]
            if let Some(ref pb) = progress_bar {
                pb.set_position(reader.position().byte());
            }
        }

        #[cfg(feature = "progress")]
        if let Some(pb) = progress_bar {
            pb.finish_with_message("Loading complete");
        }

        let elapsed = start_time.elapsed();
        log::info!(
            "Loaded {} admissions from {} in {:.2}s",
            records.len(),
            origin.map(|p| p.display().to_string()).unwrap_or_else(|| "stream".to_string()),
            elapsed.as_secs_f64()
        );
        if invalid_count > 0 {
            log::warn!("Skipped {} invalid records", invalid_count);
        }

        Ok(records)
    }

    /// Parse one CSV row into a record and validate it
    fn parse_record(&self, row: &StringRecord) -> Result<AdmissionRecord> {
        let id = field(row, AdmissionSchema::ID);
        if id.is_empty() {
            return Err(AdmissionsError::invalid_field(None, "id", None, "identifier cannot be empty"));
        }
        let record_id = Some(id);

        let sex_code = field(row, AdmissionSchema::SEX);
        let sex = Sex::from_code(sex_code).map_err(|_| {
            AdmissionsError::invalid_field(record_id, "sex", Some(sex_code), "expected Masculino, Femenino or Desconocido")
        })?;

        let age_code = required_field(row, AdmissionSchema::AGE_GROUP, id)?;
        let age_group = AgeGroup::from_code(age_code).map_err(|_| {
            AdmissionsError::invalid_field(record_id, "age_group", Some(age_code), "expected 0-17, 18-25, 26-40, 41-65 or 66+")
        })?;

        let stay = required_field(row, AdmissionSchema::LENGTH_OF_STAY, id)?;
        let length_of_stay = stay.parse::<u32>().map_err(|_| {
            AdmissionsError::invalid_field(record_id, "length_of_stay", Some(stay), "expected a whole number of days")
        })?;

        let flag = required_field(row, AdmissionSchema::READMISSION_30D, id)?;
        let readmitted_within_30_days = AdmissionSchema::parse_flag(flag).ok_or_else(|| {
            AdmissionsError::invalid_field(record_id, "readmission_30d", Some(flag), "expected true or false")
        })?;

        let severity = required_field(row, AdmissionSchema::SEVERITY_SCORE, id)?;
        let severity_score = severity.parse::<u8>().map_err(|_| {
            AdmissionsError::invalid_field(record_id, "severity_score", Some(severity), "expected an integer score")
        })?;

        let record = AdmissionRecord {
            id: id.to_string(),
            admission_date: date_field(row, AdmissionSchema::ADMISSION_DATE, id)?,
            discharge_date: date_field(row, AdmissionSchema::DISCHARGE_DATE, id)?,
            province: required_field(row, AdmissionSchema::PROVINCE, id)?.to_string(),
            municipality: required_field(row, AdmissionSchema::MUNICIPALITY, id)?.to_string(),
            sex,
            age_group,
            primary_diagnosis_code: required_field(row, AdmissionSchema::PRIMARY_DIAGNOSIS_CODE, id)?.to_string(),
            diagnosis_chapter: required_field(row, AdmissionSchema::DIAGNOSIS_CHAPTER, id)?.to_string(),
            length_of_stay,
            readmitted_within_30_days,
            severity_score,
        };

        record.validate(self.validation_level)?;
        Ok(record)
    }
}

fn field(row: &StringRecord, index: usize) -> &str {
    row.get(index).map(str::trim).unwrap_or("")
}

fn required_field<'r>(row: &'r StringRecord, index: usize, record_id: &str) -> Result<&'r str> {
    match field(row, index) {
        "" => Err(AdmissionsError::invalid_field(
            Some(record_id),
            AdmissionSchema::column_name(index).unwrap_or("unknown"),
            None,
            "required field is empty",
        )),
        value => Ok(value),
    }
}

fn date_field(row: &StringRecord, index: usize, record_id: &str) -> Result<NaiveDate> {
    let value = required_field(row, index, record_id)?;
    NaiveDate::parse_from_str(value, AdmissionSchema::DATE_FORMAT).map_err(|_| {
        AdmissionsError::invalid_field(
            Some(record_id),
            AdmissionSchema::column_name(index).unwrap_or("date"),
            Some(value),
            "expected a YYYY-MM-DD date",
        )
    })
}

/// Write records to a CSV file with the standard header
pub fn write_csv<P: AsRef<Path>>(records: &[AdmissionRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_to(records, File::create(path)?)?;
    log::info!("Wrote {} admissions to {}", records.len(), path.display());
    Ok(())
}

/// Write records as CSV to any writer; the header is written even for no records
pub fn write_to<W: Write>(records: &[AdmissionRecord], writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(AdmissionSchema::column_names())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,admission_date,discharge_date,province,municipality,sex,age_group,\
        primary_diagnosis_code,diagnosis_chapter,length_of_stay,readmission_30d,severity_score";

    fn csv_with(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text
    }

    fn quiet() -> AdmissionReader {
        AdmissionReader::new().with_progress_bar(false)
    }

    const GOOD: &str = "ADM-1,2024-01-05,2024-01-07,Madrid,Móstoles,Masculino,18-25,F32.1,\
        \"F30-F39: Trastornos del estado de ánimo\",2,false,4";

    #[test]
    fn test_reads_valid_rows() {
        let text = csv_with(&[GOOD, "ADM-2,2024-02-01,2024-02-01,Bilbao,Getxo,female,66+,F41.1,F40-F48: Ansiedad,0,true,10"]);
        let records = quiet().read_from(text.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].municipality, "Móstoles");
        assert_eq!(records[0].diagnosis_chapter, "F30-F39: Trastornos del estado de ánimo");
        assert_eq!(records[1].sex, Sex::Female);
        assert_eq!(records[1].age_group, AgeGroup::Over65);
        assert!(records[1].readmitted_within_30_days);
        assert_eq!(records[1].length_of_stay, 0);
    }

    #[test]
    fn test_bad_row_names_record_and_line() {
        let text = csv_with(&[GOOD, "ADM-2,2024-02-01,2024-02-03,Bilbao,Getxo,X,66+,F41.1,F40-F48: x,2,true,3"]);
        let err = quiet().read_from(text.as_bytes()).unwrap_err();
        match err {
            AdmissionsError::InvalidRecord { record_id, field, context, .. } => {
                assert_eq!(record_id.as_deref(), Some("ADM-2"));
                assert_eq!(field.as_deref(), Some("sex"));
                assert_eq!(context.line_number, Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_skip_invalid_records() {
        let text = csv_with(&[
            "ADM-0,not-a-date,2024-01-07,Madrid,Madrid,Masculino,18-25,F32.1,F30-F39: x,2,false,4",
            GOOD,
            "ADM-9,2024-01-05,2024-01-07,Madrid",
            "ADM-3,2024-01-05,2024-01-07,Madrid,Madrid,Masculino,18-25,F32.1,F30-F39: x,2,false,11",
        ]);
        let records = quiet().with_skip_invalid_records(true).read_from(text.as_bytes()).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["ADM-1"]);
    }

    #[test]
    fn test_validation_level_controls_checks() {
        // stay disagrees with the dates
        let row = "ADM-5,2024-01-05,2024-01-07,Madrid,Madrid,Masculino,18-25,F32.1,F30-F39: x,9,false,4";
        let text = csv_with(&[row]);
        assert!(quiet().read_from(text.as_bytes()).is_ok());
        assert!(quiet().with_validation_level(ValidationLevel::Strict).read_from(text.as_bytes()).is_err());
    }

    #[test]
    fn test_header_validation() {
        let text = "id,date\nADM-1,2024-01-01\n";
        assert!(matches!(
            quiet().read_from(text.as_bytes()),
            Err(AdmissionsError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_file_suggests_generate() {
        let err = quiet().load_csv("/definitely/not/here/admissions.csv").unwrap_err();
        assert!(matches!(err, AdmissionsError::FileNotFound { .. }));
        assert!(err.user_message().contains("adcli generate"));
    }

    #[test]
    fn test_written_csv_reads_back() {
        let records = crate::generator::generate(25, Some(5));
        let mut buffer = Vec::new();
        write_to(&records, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("id,admission_date,"));

        let parsed = quiet()
            .with_validation_level(ValidationLevel::Strict)
            .read_from(text.as_bytes())
            .unwrap();
        assert_eq!(parsed, records);

        let mut empty = Vec::new();
        write_to(&[], &mut empty).unwrap();
        assert!(quiet().read_from(empty.as_slice()).unwrap().is_empty());
    }
}
