/*!
 * Facet filters for admission records
 *
 * A [`FilterSpec`] is a set of independently optional constraints. Absent
 * fields and empty sets impose no constraint; active constraints combine with
 * logical AND. The free-text search combines according to [`SearchPrecedence`].
 */

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data_types::{AdmissionRecord, AgeGroup, Sex};
use crate::schema::AdmissionSchema;
use crate::{AdmissionsError, Result};

/// How an active search query combines with the facet filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchPrecedence {
    /// The search is one more ANDed constraint
    #[default]
    Conjunctive,
    /// An active search alone decides; facet results are discarded
    Replace,
}

impl SearchPrecedence {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "conjunctive" | "and" => Some(SearchPrecedence::Conjunctive),
            "replace" | "override" => Some(SearchPrecedence::Replace),
            _ => None,
        }
    }
}

/// Inclusive range of dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Whether `date` lies within the bounds. A reversed range contains nothing.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Number of days covered, zero for a reversed range
    pub fn len_days(&self) -> i64 {
        ((self.to - self.from).num_days() + 1).max(0)
    }
}

/// Inclusive numeric range `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusiveRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> InclusiveRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the bounds. A range with `min > max` contains nothing.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Multi-dimensional facet filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    pub provinces: Vec<String>,
    pub municipalities: Vec<String>,
    pub sexes: Vec<Sex>,
    pub age_groups: Vec<AgeGroup>,
    /// Accepted chapter fragments, matched by containment
    pub diagnosis_groups: Vec<String>,
    pub severity_range: Option<InclusiveRange<u8>>,
    pub length_of_stay_range: Option<InclusiveRange<u32>>,
    pub search_query: Option<String>,
    pub search_precedence: SearchPrecedence,
}

impl FilterSpec {
    /// A filter with every dimension absent
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(from, to));
        self
    }

    pub fn province(mut self, province: impl Into<String>) -> Self {
        self.provinces.push(province.into());
        self
    }

    pub fn municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipalities.push(municipality.into());
        self
    }

    pub fn sex(mut self, sex: Sex) -> Self {
        self.sexes.push(sex);
        self
    }

    pub fn age_group(mut self, age_group: AgeGroup) -> Self {
        self.age_groups.push(age_group);
        self
    }

    pub fn diagnosis_group(mut self, fragment: impl Into<String>) -> Self {
        self.diagnosis_groups.push(fragment.into());
        self
    }

    pub fn severity_between(mut self, min: u8, max: u8) -> Self {
        self.severity_range = Some(InclusiveRange::new(min, max));
        self
    }

    pub fn stay_between(mut self, min: u32, max: u32) -> Self {
        self.length_of_stay_range = Some(InclusiveRange::new(min, max));
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn with_search_precedence(mut self, precedence: SearchPrecedence) -> Self {
        self.search_precedence = precedence;
        self
    }

    /// Same filter with the date range replaced
    pub fn with_date_range(&self, range: Option<DateRange>) -> Self {
        Self {
            date_range: range,
            ..self.clone()
        }
    }

    /// The search query when one is active (empty text counts as absent)
    pub fn active_search(&self) -> Option<&str> {
        self.search_query.as_deref().filter(|q| !q.is_empty())
    }

    /// Whether no dimension is constrained
    pub fn is_unconstrained(&self) -> bool {
        self.date_range.is_none()
            && self.provinces.is_empty()
            && self.municipalities.is_empty()
            && self.sexes.is_empty()
            && self.age_groups.is_empty()
            && self.diagnosis_groups.is_empty()
            && self.severity_range.is_none()
            && self.length_of_stay_range.is_none()
            && self.active_search().is_none()
    }

    /// Whether `record` satisfies every active constraint
    pub fn matches(&self, record: &AdmissionRecord) -> bool {
        let search = self.active_search().map(str::to_lowercase);
        self.matches_prepared(record, search.as_deref())
    }

    /// Build a reusable predicate with the search text lowered once
    pub fn predicate(&self) -> impl Fn(&AdmissionRecord) -> bool + Send + Sync + '_ {
        let search = self.active_search().map(str::to_lowercase);
        move |record| self.matches_prepared(record, search.as_deref())
    }

    fn matches_prepared(&self, record: &AdmissionRecord, search_lower: Option<&str>) -> bool {
        match (search_lower, self.search_precedence) {
            (Some(query), SearchPrecedence::Replace) => record.matches_search(query),
            (Some(query), SearchPrecedence::Conjunctive) => {
                self.matches_facets(record) && record.matches_search(query)
            }
            (None, _) => self.matches_facets(record),
        }
    }

    fn matches_facets(&self, record: &AdmissionRecord) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(record.admission_date) {
                return false;
            }
        }

        if !self.provinces.is_empty() && !self.provinces.iter().any(|p| *p == record.province) {
            return false;
        }

        if !self.municipalities.is_empty() && !self.municipalities.iter().any(|m| *m == record.municipality) {
            return false;
        }

        if !self.sexes.is_empty() && !self.sexes.contains(&record.sex) {
            return false;
        }

        if !self.age_groups.is_empty() && !self.age_groups.contains(&record.age_group) {
            return false;
        }

        if !self.diagnosis_groups.is_empty()
            && !self.diagnosis_groups.iter().any(|group| record.diagnosis_chapter.contains(group.as_str()))
        {
            return false;
        }

        if let Some(range) = &self.severity_range {
            if !range.contains(record.severity_score) {
                return false;
            }
        }

        if let Some(range) = &self.length_of_stay_range {
            if !range.contains(record.length_of_stay) {
                return false;
            }
        }

        true
    }

    /// Encode as query parameters for the admissions API
    ///
    /// Multi-select dimensions repeat their key; dates use ISO-8601; each range
    /// becomes a min/max pair. The search precedence is local and not encoded.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(range) = &self.date_range {
            params.push(("from", range.from.format(AdmissionSchema::DATE_FORMAT).to_string()));
            params.push(("to", range.to.format(AdmissionSchema::DATE_FORMAT).to_string()));
        }
        params.extend(self.provinces.iter().map(|p| ("province", p.clone())));
        params.extend(self.municipalities.iter().map(|m| ("municipality", m.clone())));
        params.extend(self.sexes.iter().map(|s| ("sex", s.as_code().to_string())));
        params.extend(self.age_groups.iter().map(|a| ("ageGroup", a.as_code().to_string())));
        params.extend(self.diagnosis_groups.iter().map(|d| ("diagnosis", d.clone())));
        if let Some(range) = &self.severity_range {
            params.push(("severityMin", range.min.to_string()));
            params.push(("severityMax", range.max.to_string()));
        }
        if let Some(range) = &self.length_of_stay_range {
            params.push(("stayMin", range.min.to_string()));
            params.push(("stayMax", range.max.to_string()));
        }
        if let Some(query) = self.active_search() {
            params.push(("q", query.to_string()));
        }

        params
    }

    /// Decode query parameters produced by [`FilterSpec::to_query_pairs`]
    ///
    /// Unknown keys are ignored. A range needs both of its bounds; a date range
    /// needs both `from` and `to`.
    pub fn from_query_pairs<K, V>(pairs: &[(K, V)]) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut spec = FilterSpec::default();
        let mut from = None;
        let mut to = None;
        let mut severity = (None, None);
        let mut stay = (None, None);

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "from" => from = Some(parse_query_date(key, value)?),
                "to" => to = Some(parse_query_date(key, value)?),
                "province" => spec.provinces.push(value.to_string()),
                "municipality" => spec.municipalities.push(value.to_string()),
                "sex" => spec.sexes.push(
                    Sex::from_code(value).map_err(|e| AdmissionsError::invalid_query(key, value, e.to_string()))?,
                ),
                "ageGroup" => spec.age_groups.push(
                    AgeGroup::from_code(value).map_err(|e| AdmissionsError::invalid_query(key, value, e.to_string()))?,
                ),
                "diagnosis" => spec.diagnosis_groups.push(value.to_string()),
                "severityMin" => severity.0 = Some(parse_query_number(key, value)?),
                "severityMax" => severity.1 = Some(parse_query_number(key, value)?),
                "stayMin" => stay.0 = Some(parse_query_number(key, value)?),
                "stayMax" => stay.1 = Some(parse_query_number(key, value)?),
                "q" => spec.search_query = Some(value.to_string()),
                _ => log::debug!("Ignoring unknown query parameter '{}'", key),
            }
        }

        spec.date_range = match (from, to) {
            (Some(from), Some(to)) => Some(DateRange::new(from, to)),
            (None, None) => None,
            (Some(_), None) => return Err(AdmissionsError::invalid_query("to", "", "'from' given without 'to'")),
            (None, Some(_)) => return Err(AdmissionsError::invalid_query("from", "", "'to' given without 'from'")),
        };
        spec.severity_range = paired_range("severity", severity)?;
        spec.length_of_stay_range = paired_range("stay", stay)?;

        Ok(spec)
    }
}

fn parse_query_date(key: &str, value: &str) -> Result<NaiveDate> {
    // Accept full ISO timestamps as sent by browser clients
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, AdmissionSchema::DATE_FORMAT)
        .map_err(|_| AdmissionsError::invalid_query(key, value, "expected an ISO-8601 date (YYYY-MM-DD)"))
}

fn parse_query_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AdmissionsError::invalid_query(key, value, "expected a non-negative integer"))
}

fn paired_range<T: PartialOrd + Copy>(name: &str, bounds: (Option<T>, Option<T>)) -> Result<Option<InclusiveRange<T>>> {
    match bounds {
        (Some(min), Some(max)) => Ok(Some(InclusiveRange::new(min, max))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(AdmissionsError::invalid_query(&format!("{name}Max"), "", "missing upper bound")),
        (None, Some(_)) => Err(AdmissionsError::invalid_query(&format!("{name}Min"), "", "missing lower bound")),
    }
}
