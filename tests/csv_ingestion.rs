/*!
 * End-to-end ingestion: CSV files and configuration-selected sources
 */

use std::fs;

use admissions::prelude::*;
use admissions::reader::write_csv;
use tempfile::TempDir;

const HEADER: &str = "id,admission_date,discharge_date,province,municipality,sex,age_group,primary_diagnosis_code,diagnosis_chapter,length_of_stay,readmission_30d,severity_score";

#[test]
fn test_generated_file_loads_into_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("admissions.csv");
    let records = admissions::generator::generate(120, Some(8));
    write_csv(&records, &path).unwrap();

    let source = CsvSource::new(&path).with_reader(AdmissionReader::new().with_progress_bar(false));
    let dataset = AdmissionDataset::from_source(&source).unwrap();
    assert_eq!(dataset.len(), 120);
    assert_eq!(dataset.records(), records.as_slice());
    assert_eq!(dataset.get_by_id("ADM-7"), records.iter().find(|r| r.id == "ADM-7"));
}

#[test]
fn test_malformed_rows_fail_or_skip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("admissions.csv");
    let contents = format!(
        "{HEADER}\n\
         ADM-1,2024-05-01,2024-05-04,Madrid,Getafe,Femenino,26-40,F32.1,F30-F39: Ánimo,3,false,5\n\
         ADM-2,2024-05-02,2024-05-04,Madrid,Getafe,Femenino,26-40,F32.1,F30-F39: Ánimo,two,false,5\n\
         ADM-3,2024-05-03,2024-05-05,Madrid,Getafe,Masculino,41-65,F20.0,F20-F29: Psicosis,2,true,7\n"
    );
    fs::write(&path, contents).unwrap();

    let strict = AdmissionReader::new().with_progress_bar(false);
    match strict.load_csv(&path) {
        Err(AdmissionsError::InvalidRecord { record_id, field, context, .. }) => {
            assert_eq!(record_id.as_deref(), Some("ADM-2"));
            assert_eq!(field.as_deref(), Some("length_of_stay"));
            assert_eq!(context.line_number, Some(3));
            assert_eq!(context.file_path.as_deref(), Some(path.as_path()));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let lenient = strict.with_skip_invalid_records(true);
    let records = lenient.load_csv(&path).unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["ADM-1", "ADM-3"]);
}

#[test]
fn test_duplicate_ids_in_file_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("admissions.csv");
    let row = "ADM-1,2024-05-01,2024-05-04,Madrid,Getafe,Femenino,26-40,F32.1,F30-F39: Ánimo,3,false,5";
    fs::write(&path, format!("{HEADER}\n{row}\n{row}\n")).unwrap();

    let source = CsvSource::new(&path).with_reader(AdmissionReader::new().with_progress_bar(false));
    assert!(matches!(
        AdmissionDataset::from_source(&source),
        Err(AdmissionsError::DuplicateRecord { .. })
    ));
}

#[test]
fn test_config_file_selects_csv_source() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = temp_dir.path().join("admissions.csv");
    write_csv(&admissions::generator::generate(60, Some(12)), &data_path).unwrap();

    let config_path = temp_dir.path().join("admissions.toml");
    let toml = format!(
        "enable_progress_bar = false\n\
         validation_level = \"strict\"\n\
         search_precedence = \"replace\"\n\
         \n\
         [source]\n\
         kind = \"csv\"\n\
         path = \"{}\"\n",
        data_path.display()
    );
    fs::write(&config_path, toml).unwrap();

    let config = AdmissionsConfig::from_file(&config_path).unwrap();
    assert_eq!(config.validation_level, ValidationLevel::Strict);
    assert_eq!(config.search_precedence, SearchPrecedence::Replace);
    assert_eq!(config.top_diagnoses_limit, 10);

    let dataset = AdmissionDataset::from_config(&config).unwrap();
    assert_eq!(dataset.len(), 60);
}

#[test]
fn test_saved_config_reloads() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("conf").join("admissions.toml");
    let config = ConfigBuilder::new()
        .generated_source(75, Some(3))
        .readmission_period_days(60)
        .output_format(OutputFormat::Json)
        .build();
    config.save(&config_path).unwrap();

    let reloaded = AdmissionsConfig::from_file(&config_path).unwrap();
    assert_eq!(reloaded, config);
    assert_eq!(AdmissionDataset::from_config(&reloaded).unwrap().len(), 75);
}
