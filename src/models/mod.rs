use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::error::RunError;

/// One institution from the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
}

/// Quarter-end months and their last day.
const QUARTER_ENDS: [(u32, u32); 4] = [(3, 31), (6, 30), (9, 30), (12, 31)];

/// A quarter-end reporting period. The month is always 3, 6, 9 or 12 and the
/// day is always the last day of that month; rendered on the wire as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(NaiveDate);

impl Period {
    /// Build a period from a date, rejecting anything that is not a quarter end.
    pub fn from_quarter_end(date: NaiveDate) -> Result<Self, RunError> {
        let valid = QUARTER_ENDS
            .iter()
            .any(|&(month, day)| date.month() == month && date.day() == day);
        if valid {
            Ok(Period(date))
        } else {
            Err(RunError::NotQuarterEnd { date })
        }
    }

    /// The most recent quarter end on or before `today`.
    pub fn latest_quarter_end(today: NaiveDate) -> Self {
        let quarter = ((today.month() - 1) / 3) as usize;
        let (month, day) = QUARTER_ENDS[quarter];
        let candidate = Period(quarter_date(today.year(), month, day));
        if candidate.0 > today {
            candidate.previous_quarter()
        } else {
            candidate
        }
    }

    /// Step back exactly one quarter (March wraps to the prior year's December).
    pub fn previous_quarter(self) -> Self {
        let month = self.0.month();
        let (year, index) = if month == 3 {
            (self.0.year() - 1, 3)
        } else {
            (self.0.year(), (month / 3 - 2) as usize)
        };
        let (month, day) = QUARTER_ENDS[index];
        Period(quarter_date(year, month, day))
    }

    /// Same quarter one calendar year earlier.
    pub fn year_earlier(self) -> Self {
        Period(quarter_date(self.0.year() - 1, self.0.month(), self.0.day()))
    }

    /// Fraction of the year covered through this period's quarter.
    pub fn annualization_multiplier(self) -> f64 {
        match self.0.month() {
            3 => 0.25,
            6 => 0.5,
            9 => 0.75,
            12 => 1.0,
            other => unreachable!("period month {other} violates the quarter-end invariant"),
        }
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }
}

fn quarter_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid quarter-end date")
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The call-report sections the engine fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    /// Statement of financial condition ("NC").
    Condition,
    /// Income statement ("NI").
    Income,
    /// Membership and deposits ("D").
    Demographics,
}

impl ReportType {
    /// Wire code used by the report source.
    pub fn code(self) -> &'static str {
        match self {
            ReportType::Condition => "NC",
            ReportType::Income => "NI",
            ReportType::Demographics => "D",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Labeled numeric fields extracted from one report page. Built fresh per
/// fetch; an empty map is a valid outcome, not a failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(HashMap<String, i64>);

impl FieldMap {
    pub fn insert(&mut self, label: String, value: i64) {
        self.0.insert(label, value);
    }

    pub fn get(&self, label: &str) -> Option<i64> {
        self.0.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        FieldMap(iter.into_iter().collect())
    }
}

/// The five field maps fetched for one institution.
#[derive(Debug, Clone, Default)]
pub struct ReportBundle {
    pub condition_start: FieldMap,
    pub condition_end: FieldMap,
    pub income_end: FieldMap,
    pub demographics_start: FieldMap,
    pub demographics_end: FieldMap,
}

/// Derived metrics for one institution. Every field is populated once
/// computation runs; `None` is the explicit "no value" marker and serializes
/// as `null`. String metrics may carry the sentinels "Losing members",
/// "Undefined" or "Negative ROI"/"Negative ROA".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub total_assets: Option<i64>,
    pub marketing_budget: Option<i64>,
    pub potential_member_count: Option<i64>,
    pub member_change: Option<String>,
    pub mac: Option<String>,
    pub assets_per_member_start: Option<String>,
    pub assets_per_member_end: Option<String>,
    pub deposit_per_member: Option<String>,
    pub cost_per_dollar_of_assets: Option<String>,
    pub percent_penetration: Option<String>,
}

/// An institution annotated with its metrics; the terminal per-institution
/// output record. Serialized flat with upstream-compatible camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionMetrics {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub metrics: MetricSet,
}

/// Full output of one run: the resolved period pair plus the ordered
/// per-institution records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub current_period: Period,
    pub prior_period: Period,
    pub institutions: Vec<InstitutionMetrics>,
}

/// How the prior period is derived from the resolved current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorPeriodPolicy {
    /// Same quarter one year earlier (canonical).
    YearAgo,
    /// One quarter back.
    PreviousQuarter,
}

/// Sentinel text used when assets shrank over the comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeGrowthLabel {
    Roi,
    Roa,
}

impl NegativeGrowthLabel {
    pub fn text(self) -> &'static str {
        match self {
            NegativeGrowthLabel::Roi => "Negative ROI",
            NegativeGrowthLabel::Roa => "Negative ROA",
        }
    }
}

/// Metric policy knobs for the behaviors the upstream variants disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricPolicy {
    pub prior_period: PriorPeriodPolicy,
    pub negative_growth_label: NegativeGrowthLabel,
}

impl Default for MetricPolicy {
    fn default() -> Self {
        MetricPolicy {
            prior_period: PriorPeriodPolicy::YearAgo,
            negative_growth_label: NegativeGrowthLabel::Roi,
        }
    }
}

impl MetricPolicy {
    fn from_env() -> Self {
        let mut policy = MetricPolicy::default();

        match std::env::var("PRIOR_PERIOD_POLICY").as_deref() {
            Ok("year-ago") | Err(_) => {}
            Ok("previous-quarter") => policy.prior_period = PriorPeriodPolicy::PreviousQuarter,
            Ok(other) => warn!("unknown PRIOR_PERIOD_POLICY '{other}', using year-ago"),
        }

        match std::env::var("NEGATIVE_GROWTH_LABEL").as_deref() {
            Ok("roi") | Err(_) => {}
            Ok("roa") => policy.negative_growth_label = NegativeGrowthLabel::Roa,
            Ok(other) => warn!("unknown NEGATIVE_GROWTH_LABEL '{other}', using roi"),
        }

        policy
    }
}

/// Configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub output_path: String,
    pub max_concurrent_institutions: usize,
    pub requests_per_minute: u32,
    /// Only process the first N institutions (testing aid).
    pub institution_limit: Option<usize>,
    pub policy: MetricPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            base_url: std::env::var("CALLREPORT_BASE_URL")
                .unwrap_or_else(|_| "https://www.ibanknet.com".to_string()),
            output_path: std::env::var("OUTPUT_PATH").unwrap_or_else(|_| "data.json".to_string()),
            max_concurrent_institutions: std::env::var("MAX_CONCURRENT_INSTITUTIONS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
            requests_per_minute: std::env::var("REQUESTS_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
            institution_limit: None,
            policy: MetricPolicy::from_env(),
        })
    }
}
