/*!
 * Filtering and aggregation engine for admission records
 *
 * Every view first applies a [`FilterSpec`] to the full record set and then
 * reduces the survivors. All operations are pure: the records are borrowed
 * immutably, nothing is cached, and empty results degrade to zero values.
 */

use std::collections::HashMap;
use std::time::Instant;

use chrono::{Days, NaiveDate};

use crate::data_types::{chapter_label, AdmissionRecord};
use crate::filter::{DateRange, FilterSpec};
use crate::views::*;

/// Default number of rows in the top diagnoses view
pub const DEFAULT_TOP_DIAGNOSES: usize = 10;

/// Window length used by the readmission delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodComparison {
    pub period_days: u32,
}

impl Default for PeriodComparison {
    fn default() -> Self {
        Self { period_days: 30 }
    }
}

impl PeriodComparison {
    pub fn days(period_days: u32) -> Self {
        Self { period_days }
    }

    /// Current window ending at `end` and the equal window right before it
    ///
    /// Both windows are clipped at [`NaiveDate::MIN`]. The prior window is
    /// `None` when the current one already starts there.
    pub fn windows_ending(&self, end: NaiveDate) -> (DateRange, Option<DateRange>) {
        let span = Days::new(u64::from(self.period_days.max(1)) - 1);
        let current_start = end.checked_sub_days(span).unwrap_or(NaiveDate::MIN);
        let prior = current_start.pred_opt().map(|prior_end| {
            let prior_start = prior_end.checked_sub_days(span).unwrap_or(NaiveDate::MIN);
            DateRange::new(prior_start, prior_end)
        });
        (DateRange::new(current_start, end), prior)
    }
}

/// Options for [`AdmissionAnalytics::snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub top_diagnoses_limit: usize,
    pub comparison: PeriodComparison,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            top_diagnoses_limit: DEFAULT_TOP_DIAGNOSES,
            comparison: PeriodComparison::default(),
        }
    }
}

/// Analytics engine over an immutable slice of admissions
#[derive(Debug, Clone, Copy)]
pub struct AdmissionAnalytics<'a> {
    records: &'a [AdmissionRecord],
}

impl<'a> AdmissionAnalytics<'a> {
    /// Create a new analytics engine over `records`
    pub fn new(records: &'a [AdmissionRecord]) -> Self {
        Self { records }
    }

    /// Number of records the engine sees before filtering
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Records satisfying `filters`, in input order
    pub fn filter(&self, filters: &FilterSpec) -> Vec<&'a AdmissionRecord> {
        let predicate = filters.predicate();
        self.records.iter().filter(|record| predicate(record)).collect()
    }

    /// Count, average stay, readmission rate and sex distribution
    pub fn kpis(&self, filters: &FilterSpec) -> KpiSummary {
        summarize_kpis(&self.filter(filters))
    }

    /// Admissions per `YYYY-MM`, ascending
    pub fn monthly_counts(&self, filters: &FilterSpec) -> Vec<TimeSeriesPoint> {
        monthly_series(&self.filter(filters))
            .into_iter()
            .map(|point| TimeSeriesPoint { date: point.month, count: point.total })
            .collect()
    }

    /// Admissions per `YYYY-MM` split by sex, ascending; months without admissions are absent
    pub fn time_series(&self, filters: &FilterSpec) -> Vec<MonthlySeriesPoint> {
        monthly_series(&self.filter(filters))
    }

    /// Admissions per diagnosis chapter, most frequent first
    pub fn diagnosis_by_chapter(&self, filters: &FilterSpec) -> Vec<DiagnosisCount> {
        let filtered = self.filter(filters);
        let mut rows: Vec<DiagnosisCount> = tally_by_sex(&filtered, |r| r.diagnosis_chapter.as_str())
            .into_iter()
            .map(|(chapter, counts)| {
                DiagnosisCount::from_distribution(chapter_label(chapter).to_string(), counts)
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }

    /// The `limit` most frequent primary diagnosis codes
    pub fn top_diagnoses(&self, filters: &FilterSpec, limit: usize) -> Vec<DiagnosisCount> {
        let filtered = self.filter(filters);
        let mut rows: Vec<DiagnosisCount> = tally_by_sex(&filtered, |r| r.primary_diagnosis_code.as_str())
            .into_iter()
            .map(|(code, counts)| DiagnosisCount::from_distribution(code.to_string(), counts))
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows.truncate(limit);
        rows
    }

    /// Admissions per province, most frequent first
    pub fn province_distribution(&self, filters: &FilterSpec) -> Vec<ProvinceCount> {
        let filtered = self.filter(filters);
        let mut rows: Vec<ProvinceCount> = tally_by_sex(&filtered, |r| r.province.as_str())
            .into_iter()
            .map(|(province, counts)| ProvinceCount { province: province.to_string(), count: counts.total() })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }

    /// Stay histogram over [`STAY_BANDS`] with the set-wide mean and median on every row
    pub fn length_of_stay_buckets(&self, filters: &FilterSpec) -> Vec<StayBucket> {
        let filtered = self.filter(filters);
        let mut stays: Vec<u32> = filtered.iter().map(|r| r.length_of_stay).collect();
        stays.sort_unstable();

        let mean = if stays.is_empty() {
            0.0
        } else {
            round_one_decimal(stays.iter().map(|&s| f64::from(s)).sum::<f64>() / stays.len() as f64)
        };
        // lower middle on even counts
        let median = if stays.is_empty() { 0 } else { stays[(stays.len() - 1) / 2] };

        STAY_BANDS
            .iter()
            .map(|band| StayBucket {
                label: band.label.to_string(),
                count: stays.iter().filter(|&&s| band.contains(s)).count(),
                mean,
                median,
            })
            .collect()
    }

    /// Readmission rate of the filtered set and its change against the prior period
    ///
    /// The current window is `comparison.period_days` long and ends at the
    /// latest filtered admission. The prior window is the same length and
    /// ends the day before. Both windows keep every other constraint of
    /// `filters`. The delta is zero when either window has no admissions.
    pub fn readmission_rate(&self, filters: &FilterSpec, comparison: &PeriodComparison) -> ReadmissionRate {
        let filtered = self.filter(filters);
        let total = filtered.len();
        let readmissions = count_readmissions(&filtered);

        let delta_pct = match filtered.iter().map(|r| r.admission_date).max() {
            Some(end) => {
                let (current, prior) = comparison.windows_ending(end);
                let current_set = self.filter_window(filters, current);
                let prior_set = prior.map(|window| self.filter_window(filters, window)).unwrap_or_default();
                if current_set.is_empty() || prior_set.is_empty() {
                    0.0
                } else {
                    let current_rate = percentage(count_readmissions(&current_set), current_set.len());
                    let prior_rate = percentage(count_readmissions(&prior_set), prior_set.len());
                    round_one_decimal(current_rate - prior_rate)
                }
            }
            _ => 0.0,
        };

        ReadmissionRate {
            rate: round_one_decimal(percentage(readmissions, total)),
            delta_pct,
            total,
            readmissions,
        }
    }

    /// Records passing `filters` with the date range swapped for `window`
    ///
    /// The window also bounds the result directly, since an active search
    /// under [`SearchPrecedence::Replace`](crate::filter::SearchPrecedence::Replace)
    /// skips the date facet.
    fn filter_window(&self, filters: &FilterSpec, window: DateRange) -> Vec<&'a AdmissionRecord> {
        self.filter(&filters.with_date_range(Some(window)))
            .into_iter()
            .filter(|record| window.contains(record.admission_date))
            .collect()
    }

    /// Every dashboard view for one filter
    ///
    /// With the `parallel` feature the seven views are computed concurrently;
    /// each runs its own pass over the shared, read-only records.
    pub fn snapshot(&self, filters: &FilterSpec, options: &SnapshotOptions) -> DashboardSnapshot {
        let started = Instant::now();

        #[cfg(feature = "parallel")]
        let snapshot = {
            let mut snapshot = DashboardSnapshot::default();
            let DashboardSnapshot {
                kpis,
                time_series,
                diagnosis_by_chapter,
                top_diagnoses,
                provinces,
                length_of_stay,
                readmission,
            } = &mut snapshot;

            rayon::scope(|s| {
                s.spawn(|_| *kpis = self.kpis(filters));
                s.spawn(|_| *time_series = self.time_series(filters));
                s.spawn(|_| *diagnosis_by_chapter = self.diagnosis_by_chapter(filters));
                s.spawn(|_| *top_diagnoses = self.top_diagnoses(filters, options.top_diagnoses_limit));
                s.spawn(|_| *provinces = self.province_distribution(filters));
                s.spawn(|_| *length_of_stay = self.length_of_stay_buckets(filters));
                s.spawn(|_| *readmission = self.readmission_rate(filters, &options.comparison));
            });
            snapshot
        };

        #[cfg(not(feature = "parallel"))]
        let snapshot = DashboardSnapshot {
            kpis: self.kpis(filters),
            time_series: self.time_series(filters),
            diagnosis_by_chapter: self.diagnosis_by_chapter(filters),
            top_diagnoses: self.top_diagnoses(filters, options.top_diagnoses_limit),
            provinces: self.province_distribution(filters),
            length_of_stay: self.length_of_stay_buckets(filters),
            readmission: self.readmission_rate(filters, &options.comparison),
        };

        log::debug!(
            "Computed dashboard snapshot over {} of {} records in {:?}",
            snapshot.kpis.total_admissions,
            self.records.len(),
            started.elapsed()
        );
        snapshot
    }
}

fn count_readmissions(records: &[&AdmissionRecord]) -> usize {
    records.iter().filter(|r| r.readmitted_within_30_days).count()
}

fn summarize_kpis(records: &[&AdmissionRecord]) -> KpiSummary {
    let total_admissions = records.len();
    let mut sex_distribution = SexDistribution::default();
    let mut total_stay = 0u64;

    for record in records {
        sex_distribution.record(record.sex);
        total_stay += u64::from(record.length_of_stay);
    }

    let average_stay = if total_admissions == 0 {
        0.0
    } else {
        total_stay as f64 / total_admissions as f64
    };

    KpiSummary {
        total_admissions,
        average_stay: round_one_decimal(average_stay),
        readmission_rate: round_one_decimal(percentage(count_readmissions(records), total_admissions)),
        sex_distribution,
    }
}

fn monthly_series(records: &[&AdmissionRecord]) -> Vec<MonthlySeriesPoint> {
    let months: Vec<String> = records.iter().map(|r| r.admission_month()).collect();
    let mut points: Vec<MonthlySeriesPoint> = tally_by_sex_keys(records, &months)
        .into_iter()
        .map(|(month, counts)| MonthlySeriesPoint {
            month: month.to_string(),
            total: counts.total(),
            male: counts.male,
            female: counts.female,
            unknown: counts.unknown,
        })
        .collect();
    points.sort_by(|a, b| a.month.cmp(&b.month));
    points
}

/// Group by a borrowed key, keeping first-appearance order so stable sorts break ties by input order
fn tally_by_sex<'r, F>(records: &[&'r AdmissionRecord], key: F) -> Vec<(&'r str, SexDistribution)>
where
    F: Fn(&'r AdmissionRecord) -> &'r str,
{
    let mut index: HashMap<&'r str, usize> = HashMap::new();
    let mut groups: Vec<(&'r str, SexDistribution)> = Vec::new();

    for &record in records {
        let label = key(record);
        let slot = *index.entry(label).or_insert_with(|| {
            groups.push((label, SexDistribution::default()));
            groups.len() - 1
        });
        groups[slot].1.record(record.sex);
    }

    groups
}

/// Same as [`tally_by_sex`] for keys computed ahead of time, `keys[i]` belonging to `records[i]`
fn tally_by_sex_keys<'k>(records: &[&AdmissionRecord], keys: &'k [String]) -> Vec<(&'k str, SexDistribution)> {
    let mut index: HashMap<&'k str, usize> = HashMap::new();
    let mut groups: Vec<(&'k str, SexDistribution)> = Vec::new();

    for (record, label) in records.iter().zip(keys) {
        let slot = *index.entry(label.as_str()).or_insert_with(|| {
            groups.push((label.as_str(), SexDistribution::default()));
            groups.len() - 1
        });
        groups[slot].1.record(record.sex);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::test_support::record;
    use crate::data_types::Sex;
    use crate::filter::SearchPrecedence;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn two_record_example() -> Vec<AdmissionRecord> {
        vec![
            record("A", "2024-01-05", 2, Sex::Male, "F10-F19: x", "Madrid"),
            record("B", "2024-01-20", 40, Sex::Female, "F10-F19: x", "Madrid"),
        ]
    }

    fn sample() -> Vec<AdmissionRecord> {
        let mut records = vec![
            record("1", "2024-03-02", 1, Sex::Male, "F30-F39: Ánimo", "Sevilla"),
            record("2", "2024-01-15", 5, Sex::Female, "F20-F29: Psicosis", "Madrid"),
            record("3", "2024-03-20", 9, Sex::Unknown, "F30-F39: Ánimo", "Madrid"),
            record("4", "2023-12-31", 20, Sex::Female, "F40-F48: Ansiedad", "Bilbao"),
            record("5", "2024-01-01", 3, Sex::Male, "F20-F29: Psicosis", "Sevilla"),
            record("6", "2024-03-11", 35, Sex::Female, "F30-F39: Ánimo", "Madrid"),
        ];
        records[1].readmitted_within_30_days = true;
        records[5].readmitted_within_30_days = true;
        records[0].primary_diagnosis_code = "F32.1".to_string();
        records[2].primary_diagnosis_code = "F32.1".to_string();
        records[5].primary_diagnosis_code = "F33.0".to_string();
        records
    }

    #[test]
    fn test_two_record_example() {
        let records = two_record_example();
        let analytics = AdmissionAnalytics::new(&records);
        let none = FilterSpec::new();

        let kpis = analytics.kpis(&none);
        assert_eq!(kpis.total_admissions, 2);
        assert_eq!(kpis.average_stay, 21.0);

        let buckets = analytics.length_of_stay_buckets(&none);
        assert_eq!(buckets.len(), 6);
        let by_label: HashMap<&str, &StayBucket> = buckets.iter().map(|b| (b.label.as_str(), b)).collect();
        assert_eq!(by_label["2-3 días"].count, 1);
        assert_eq!(by_label["31+ días"].count, 1);
        assert_eq!(by_label["0-1 días"].count, 0);
        for bucket in &buckets {
            assert_eq!(bucket.mean, 21.0);
            assert_eq!(bucket.median, 2);
        }
    }

    #[test]
    fn test_kpis() {
        let records = sample();
        let kpis = AdmissionAnalytics::new(&records).kpis(&FilterSpec::new());
        assert_eq!(kpis.total_admissions, 6);
        // (1+5+9+20+3+35) / 6 = 12.1666
        assert_eq!(kpis.average_stay, 12.2);
        // 2 / 6
        assert_eq!(kpis.readmission_rate, 33.3);
        assert_eq!(kpis.sex_distribution, SexDistribution { male: 2, female: 3, unknown: 1 });
    }

    #[test]
    fn test_empty_filtered_set_is_all_zero() {
        let records = sample();
        let analytics = AdmissionAnalytics::new(&records);
        let nothing = FilterSpec::new().province("Lugo");

        let kpis = analytics.kpis(&nothing);
        assert_eq!(kpis, KpiSummary::default());
        assert!(!kpis.average_stay.is_nan());
        assert!(analytics.time_series(&nothing).is_empty());
        assert!(analytics.diagnosis_by_chapter(&nothing).is_empty());
        assert!(analytics.top_diagnoses(&nothing, 10).is_empty());
        assert!(analytics.province_distribution(&nothing).is_empty());

        let buckets = analytics.length_of_stay_buckets(&nothing);
        assert_eq!(buckets.len(), 6);
        assert!(buckets.iter().all(|b| b.count == 0 && b.mean == 0.0 && b.median == 0));

        let readmission = analytics.readmission_rate(&nothing, &PeriodComparison::default());
        assert_eq!(readmission, ReadmissionRate::default());
    }

    #[test]
    fn test_time_series_sorted_without_zero_fill() {
        let records = sample();
        let series = AdmissionAnalytics::new(&records).time_series(&FilterSpec::new());
        let months: Vec<&str> = series.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2023-12", "2024-01", "2024-03"]);
        assert_eq!(series[2].total, 3);
        assert_eq!((series[2].male, series[2].female, series[2].unknown), (1, 1, 1));

        let counts = AdmissionAnalytics::new(&records).monthly_counts(&FilterSpec::new());
        assert_eq!(counts[1], TimeSeriesPoint { date: "2024-01".to_string(), count: 2 });
    }

    #[test]
    fn test_diagnosis_by_chapter_labels_and_order() {
        let records = sample();
        let rows = AdmissionAnalytics::new(&records).diagnosis_by_chapter(&FilterSpec::new());
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        // F30 has 3, F20 has 2, F40 has 1
        assert_eq!(labels, vec!["F30-F39", "F20-F29", "F40-F48"]);
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[0].male + rows[0].female + rows[0].unknown, 3);
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        let records = vec![
            record("1", "2024-01-01", 1, Sex::Male, "F90-F98: b", "Zaragoza"),
            record("2", "2024-01-01", 1, Sex::Male, "F00-F09: a", "Murcia"),
            record("3", "2024-01-01", 1, Sex::Male, "F00-F09: a", "Palma"),
            record("4", "2024-01-01", 1, Sex::Male, "F90-F98: b", "Murcia"),
        ];
        let analytics = AdmissionAnalytics::new(&records);
        let chapters = analytics.diagnosis_by_chapter(&FilterSpec::new());
        assert_eq!(chapters[0].label, "F90-F98");
        assert_eq!(chapters[1].label, "F00-F09");

        let provinces = analytics.province_distribution(&FilterSpec::new());
        let names: Vec<&str> = provinces.iter().map(|p| p.province.as_str()).collect();
        assert_eq!(names, vec!["Murcia", "Zaragoza", "Palma"]);
    }

    #[test]
    fn test_top_diagnoses_truncates() {
        let records = sample();
        let analytics = AdmissionAnalytics::new(&records);
        let top = analytics.top_diagnoses(&FilterSpec::new(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "F32.1");
        assert_eq!(top[0].count, 2);
        assert!(top[0].count >= top[1].count);
        assert!(analytics.top_diagnoses(&FilterSpec::new(), 0).is_empty());
    }

    #[test]
    fn test_median_lower_middle() {
        let records = sample();
        // stays sorted: 1 3 5 9 20 35 -> lower middle is 5
        let buckets = AdmissionAnalytics::new(&records).length_of_stay_buckets(&FilterSpec::new());
        assert_eq!(buckets[0].median, 5);
        assert_eq!(buckets[0].mean, 12.2);
        let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_readmission_rate_without_readmissions_is_zero() {
        let records = two_record_example();
        let rate = AdmissionAnalytics::new(&records).readmission_rate(&FilterSpec::new(), &PeriodComparison::default());
        assert_eq!(rate.rate, 0.0);
        assert_eq!(rate.delta_pct, 0.0);
        assert_eq!(rate.total, 2);
        assert_eq!(rate.readmissions, 0);
    }

    #[test]
    fn test_readmission_delta_compares_adjacent_windows() {
        let mut records = vec![
            // prior window: 2024-01-02 ..= 2024-01-31, 1 of 2 readmitted
            record("p1", "2024-01-10", 2, Sex::Male, "F30-F39: x", "Madrid"),
            record("p2", "2024-01-20", 2, Sex::Male, "F30-F39: x", "Madrid"),
            // current window: 2024-02-01 ..= 2024-03-01, 1 of 4 readmitted
            record("c1", "2024-02-01", 2, Sex::Male, "F30-F39: x", "Madrid"),
            record("c2", "2024-02-10", 2, Sex::Male, "F30-F39: x", "Madrid"),
            record("c3", "2024-02-20", 2, Sex::Male, "F30-F39: x", "Madrid"),
            record("c4", "2024-03-01", 2, Sex::Male, "F30-F39: x", "Madrid"),
        ];
        records[0].readmitted_within_30_days = true;
        records[2].readmitted_within_30_days = true;

        let analytics = AdmissionAnalytics::new(&records);
        let rate = analytics.readmission_rate(&FilterSpec::new(), &PeriodComparison::days(30));
        assert_eq!(rate.total, 6);
        assert_eq!(rate.readmissions, 2);
        assert_eq!(rate.rate, 33.3);
        // 25% now against 50% before
        assert_eq!(rate.delta_pct, -25.0);

        let ranged = FilterSpec::new().date_range(date("2024-02-01"), date("2024-03-01"));
        let rate = analytics.readmission_rate(&ranged, &PeriodComparison::days(30));
        assert_eq!(rate.total, 4);
        assert_eq!(rate.rate, 25.0);
        assert_eq!(rate.delta_pct, -25.0);

        // no admissions before the current window
        let short = analytics.readmission_rate(&FilterSpec::new(), &PeriodComparison::days(365));
        assert_eq!(short.delta_pct, 0.0);
    }

    #[test]
    fn test_period_windows() {
        let (current, prior) = PeriodComparison::days(7).windows_ending(date("2024-03-10"));
        let prior = prior.unwrap();
        assert_eq!(current, DateRange::new(date("2024-03-04"), date("2024-03-10")));
        assert_eq!(prior, DateRange::new(date("2024-02-26"), date("2024-03-03")));
        assert_eq!(current.len_days(), 7);
        assert_eq!(prior.len_days(), 7);

        let (current, prior) = PeriodComparison::days(1).windows_ending(date("2024-03-10"));
        assert_eq!(current, DateRange::new(date("2024-03-10"), date("2024-03-10")));
        assert_eq!(prior, Some(DateRange::new(date("2024-03-09"), date("2024-03-09"))));
    }

    #[test]
    fn test_period_windows_clip_at_earliest_date() {
        let (current, prior) = PeriodComparison::days(u32::MAX).windows_ending(date("2024-12-31"));
        assert_eq!(current, DateRange::new(NaiveDate::MIN, date("2024-12-31")));
        assert_eq!(prior, None);

        let (current, prior) = PeriodComparison::days(3).windows_ending(NaiveDate::MIN);
        assert_eq!(current, DateRange::new(NaiveDate::MIN, NaiveDate::MIN));
        assert_eq!(prior, None);
    }

    #[test]
    fn test_readmission_rate_with_huge_period() {
        let records = crate::generator::generate(2000, Some(17));
        let analytics = AdmissionAnalytics::new(&records);
        let rate = analytics.readmission_rate(&FilterSpec::new(), &PeriodComparison::days(u32::MAX));
        assert_eq!(rate.total, 2000);
        assert_eq!(rate.delta_pct, 0.0);
        assert_eq!(rate.rate, round_one_decimal(percentage(rate.readmissions, 2000)));
    }

    #[test]
    fn test_readmission_delta_under_replace_precedence() {
        let mut records = vec![
            // prior window: 2024-11-02 ..= 2024-12-01, none readmitted
            record("p1", "2024-11-10", 2, Sex::Male, "F30-F39: x", "Madrid"),
            record("p2", "2024-11-20", 2, Sex::Female, "F30-F39: x", "Sevilla"),
            // current window: 2024-12-02 ..= 2024-12-31, both readmitted
            record("c1", "2024-12-10", 2, Sex::Male, "F30-F39: x", "Madrid"),
            record("c2", "2024-12-31", 2, Sex::Female, "F30-F39: x", "Sevilla"),
            // outside both windows, also matches the search
            record("o1", "2024-06-01", 2, Sex::Male, "F30-F39: x", "Bilbao"),
        ];
        records[2].readmitted_within_30_days = true;
        records[3].readmitted_within_30_days = true;
        let analytics = AdmissionAnalytics::new(&records);
        let comparison = PeriodComparison::days(30);

        let conjunctive = FilterSpec::new().province("Madrid").province("Sevilla").search("f3");
        let replace = conjunctive.clone().with_search_precedence(SearchPrecedence::Replace);

        let and_rate = analytics.readmission_rate(&conjunctive, &comparison);
        assert_eq!(and_rate.total, 4);
        assert_eq!(and_rate.delta_pct, 100.0);

        // the facets are ignored, the windows still apply
        let replace_rate = analytics.readmission_rate(&replace, &comparison);
        assert_eq!(replace_rate.total, 5);
        assert_eq!(replace_rate.delta_pct, 100.0);

        // a date facet under Replace does not collapse the two windows either
        let ranged = replace.clone().date_range(date("2024-12-01"), date("2024-12-31"));
        assert_eq!(analytics.readmission_rate(&ranged, &comparison).delta_pct, 100.0);
    }

    #[test]
    fn test_search_precedence_flows_through_views() {
        let records = sample();
        let analytics = AdmissionAnalytics::new(&records);
        let spec = FilterSpec::new().province("Bilbao").search("ánimo");
        assert_eq!(analytics.kpis(&spec).total_admissions, 0);
        let replaced = spec.with_search_precedence(SearchPrecedence::Replace);
        assert_eq!(analytics.kpis(&replaced).total_admissions, 3);
    }

    #[test]
    fn test_snapshot_matches_individual_views() {
        let records = sample();
        let analytics = AdmissionAnalytics::new(&records);
        let spec = FilterSpec::new().sex(Sex::Female);
        let options = SnapshotOptions { top_diagnoses_limit: 3, ..Default::default() };
        let snapshot = analytics.snapshot(&spec, &options);

        assert_eq!(snapshot.kpis, analytics.kpis(&spec));
        assert_eq!(snapshot.time_series, analytics.time_series(&spec));
        assert_eq!(snapshot.diagnosis_by_chapter, analytics.diagnosis_by_chapter(&spec));
        assert_eq!(snapshot.top_diagnoses, analytics.top_diagnoses(&spec, 3));
        assert_eq!(snapshot.provinces, analytics.province_distribution(&spec));
        assert_eq!(snapshot.length_of_stay, analytics.length_of_stay_buckets(&spec));
        assert_eq!(snapshot.readmission, analytics.readmission_rate(&spec, &options.comparison));
    }
}
