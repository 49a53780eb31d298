use admissions::prelude::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::OnceLock;
use tempfile::TempDir;

// Generated once and shared by every benchmark
static RECORDS: OnceLock<Vec<AdmissionRecord>> = OnceLock::new();

fn records() -> &'static [AdmissionRecord] {
    RECORDS.get_or_init(|| admissions::generator::generate(50_000, Some(2024)))
}

fn busy_filter() -> FilterSpec {
    FilterSpec::new()
        .province("Madrid")
        .province("Sevilla")
        .sex(Sex::Female)
        .diagnosis_group("F30-F39")
        .stay_between(2, 20)
        .search("f3")
}

fn benchmark_filtering(c: &mut Criterion) {
    let analytics = AdmissionAnalytics::new(records());
    let mut group = c.benchmark_group("filtering");

    group.bench_function("unconstrained", |b| {
        let filters = FilterSpec::new();
        b.iter(|| analytics.filter(black_box(&filters)).len())
    });

    group.bench_function("all_dimensions", |b| {
        let filters = busy_filter();
        b.iter(|| analytics.filter(black_box(&filters)).len())
    });

    group.finish();
}

fn benchmark_views(c: &mut Criterion) {
    let analytics = AdmissionAnalytics::new(records());
    let filters = FilterSpec::new().age_group(AgeGroup::From26To40);
    let mut group = c.benchmark_group("views");

    group.bench_function("kpis", |b| b.iter(|| analytics.kpis(black_box(&filters))));
    group.bench_function("time_series", |b| b.iter(|| analytics.time_series(black_box(&filters))));
    group.bench_function("top_diagnoses", |b| b.iter(|| analytics.top_diagnoses(black_box(&filters), 10)));
    group.bench_function("length_of_stay_buckets", |b| {
        b.iter(|| analytics.length_of_stay_buckets(black_box(&filters)))
    });
    group.bench_function("readmission_rate", |b| {
        let comparison = PeriodComparison::default();
        b.iter(|| analytics.readmission_rate(black_box(&filters), &comparison))
    });

    group.finish();
}

fn benchmark_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    group.sample_size(20);

    for size in [1_000usize, 10_000, 50_000] {
        let analytics = AdmissionAnalytics::new(&records()[..size]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let filters = FilterSpec::new();
            let options = SnapshotOptions::default();
            b.iter(|| analytics.snapshot(black_box(&filters), &options))
        });
    }

    group.finish();
}

fn benchmark_csv_loading(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("admissions.csv");
    admissions::reader::write_csv(&records()[..10_000], &path).expect("Failed to write CSV");

    let reader = AdmissionReader::new().with_progress_bar(false);
    let mut group = c.benchmark_group("csv_loading");
    group.sample_size(10);
    group.bench_function("10k_rows", |b| {
        b.iter(|| reader.load_csv(black_box(&path)).expect("Failed to load CSV").len())
    });
    group.finish();
}

fn benchmark_dataset_indexing(c: &mut Criterion) {
    c.bench_function("dataset_index_50k", |b| {
        b.iter(|| AdmissionDataset::new(black_box(records().to_vec())).expect("unique ids").len())
    });
}

criterion_group!(
    benches,
    benchmark_filtering,
    benchmark_views,
    benchmark_snapshot,
    benchmark_csv_loading,
    benchmark_dataset_indexing
);
criterion_main!(benches);
