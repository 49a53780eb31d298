/*!
 * Derived view structures produced by the aggregation engine
 *
 * Views are plain data, rebuilt on every call. Their JSON shape matches what
 * the dashboard presentation layer consumes.
 */

use serde::{Deserialize, Serialize};

use crate::data_types::Sex;

/// Round to one decimal, halves toward positive infinity
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// `100 * part / whole`, zero when `whole` is zero
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Raw admission counts per sex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SexDistribution {
    #[serde(rename = "Masculino")]
    pub male: usize,
    #[serde(rename = "Femenino")]
    pub female: usize,
    #[serde(rename = "Desconocido")]
    pub unknown: usize,
}

impl SexDistribution {
    pub fn record(&mut self, sex: Sex) {
        match sex {
            Sex::Male => self.male += 1,
            Sex::Female => self.female += 1,
            Sex::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.male + self.female + self.unknown
    }
}

/// Headline metrics of a filtered record set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_admissions: usize,
    pub average_stay: f64,
    pub readmission_rate: f64,
    pub sex_distribution: SexDistribution,
}

/// Admissions in one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// `YYYY-MM`
    pub date: String,
    pub count: usize,
}

/// Admissions in one month, split by sex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySeriesPoint {
    /// `YYYY-MM`
    #[serde(rename = "date")]
    pub month: String,
    pub total: usize,
    pub male: usize,
    pub female: usize,
    pub unknown: usize,
}

/// Admissions for one diagnosis chapter or code, split by sex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisCount {
    #[serde(rename = "diagnosis")]
    pub label: String,
    pub count: usize,
    pub male: usize,
    pub female: usize,
    pub unknown: usize,
}

impl DiagnosisCount {
    pub(crate) fn from_distribution(label: String, counts: SexDistribution) -> Self {
        Self {
            label,
            count: counts.total(),
            male: counts.male,
            female: counts.female,
            unknown: counts.unknown,
        }
    }
}

/// Admissions in one province
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceCount {
    pub province: String,
    pub count: usize,
}

/// A fixed length-of-stay band, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayBand {
    pub label: &'static str,
    pub min: u32,
    /// `None` for the open-ended last band
    pub max: Option<u32>,
}

impl StayBand {
    pub fn contains(&self, stay: u32) -> bool {
        stay >= self.min && self.max.map_or(true, |max| stay <= max)
    }
}

/// The six stay bands, non-overlapping and covering every stay
pub const STAY_BANDS: [StayBand; 6] = [
    StayBand { label: "0-1 días", min: 0, max: Some(1) },
    StayBand { label: "2-3 días", min: 2, max: Some(3) },
    StayBand { label: "4-7 días", min: 4, max: Some(7) },
    StayBand { label: "8-14 días", min: 8, max: Some(14) },
    StayBand { label: "15-30 días", min: 15, max: Some(30) },
    StayBand { label: "31+ días", min: 31, max: None },
];

/// One histogram row of the stay distribution
///
/// `mean` and `median` describe the whole filtered set, not the band; every
/// row carries the same two values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayBucket {
    #[serde(rename = "bucket")]
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub median: u32,
}

/// Readmission rate with the change against the preceding period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadmissionRate {
    pub rate: f64,
    /// Percentage points, current window minus prior window
    pub delta_pct: f64,
    pub total: usize,
    pub readmissions: usize,
}

/// Every dashboard view for one filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub kpis: KpiSummary,
    pub time_series: Vec<MonthlySeriesPoint>,
    pub diagnosis_by_chapter: Vec<DiagnosisCount>,
    pub top_diagnoses: Vec<DiagnosisCount>,
    pub provinces: Vec<ProvinceCount>,
    pub length_of_stay: Vec<StayBucket>,
    pub readmission: ReadmissionRate,
}
