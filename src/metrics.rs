//! Derived-metric computation over the per-institution report bundle.
//!
//! Pure functions only: all inputs arrive as explicit `FieldMap`s, all
//! missing-data conditions resolve to the "no value" marker (`None`) or a
//! named sentinel. Nothing in here errors or touches the network.

use crate::models::{MetricPolicy, MetricSet, ReportBundle};

// Exact label text on the report pages. Case- and whitespace-sensitive after
// trim; this is the only protocol surface the engine owns.
pub const MEMBER_COUNT_LABEL: &str = "Number of current members (not number of accounts)";
pub const POTENTIAL_MEMBERS_LABEL: &str = "Number of potential members";
pub const TOTAL_ASSETS_LABEL: &str = "TOTAL ASSETS";
pub const MARKETING_EXPENSES_LABEL: &str = "Educational and Promotional Expenses";
pub const TOTAL_DEPOSITS_LABEL: &str =
    "TOTAL SHARES and DEPOSITS (Sum of items 7 and 8) (Total Amount)";

pub const LOSING_MEMBERS: &str = "Losing members";
pub const UNDEFINED: &str = "Undefined";

/// Scale a quarterly budget up to a full-year figure using the quarter
/// fraction of the current period. Absent in, absent out.
pub fn annualized_marketing_budget(quarterly: Option<i64>, multiplier: f64) -> Option<i64> {
    quarterly.map(|budget| (budget as f64 / multiplier).round() as i64)
}

/// Compute every derived metric for one institution.
///
/// If either member count is missing, all derived metrics are the "no value"
/// marker; the raw context fields are still carried through.
pub fn compute_metrics(
    bundle: &ReportBundle,
    annualization_multiplier: f64,
    policy: &MetricPolicy,
) -> MetricSet {
    let member_count_start = bundle.demographics_start.get(MEMBER_COUNT_LABEL);
    let member_count_end = bundle.demographics_end.get(MEMBER_COUNT_LABEL);
    let total_assets_start = bundle.condition_start.get(TOTAL_ASSETS_LABEL);
    let total_assets_end = bundle.condition_end.get(TOTAL_ASSETS_LABEL);
    let quarterly_budget = bundle.income_end.get(MARKETING_EXPENSES_LABEL);
    let marketing_budget = annualized_marketing_budget(quarterly_budget, annualization_multiplier);
    let potential_members = bundle.demographics_start.get(POTENTIAL_MEMBERS_LABEL);
    let deposits_end = bundle.demographics_end.get(TOTAL_DEPOSITS_LABEL);

    let mut metrics = MetricSet {
        total_assets: total_assets_start,
        marketing_budget,
        potential_member_count: potential_members,
        member_change: None,
        mac: None,
        assets_per_member_start: None,
        assets_per_member_end: None,
        deposit_per_member: None,
        cost_per_dollar_of_assets: None,
        percent_penetration: None,
    };

    let (start, end) = match (member_count_start, member_count_end) {
        (Some(start), Some(end)) => (start, end),
        _ => return metrics,
    };

    let member_change = end - start;
    metrics.member_change = Some(format_signed(member_change));

    metrics.mac = match marketing_budget {
        Some(budget) if member_change > 0 => {
            Some(format_currency(budget as f64 / member_change as f64))
        }
        _ => Some(LOSING_MEMBERS.to_string()),
    };

    metrics.assets_per_member_start = match total_assets_start {
        Some(assets) if start > 0 => Some(format_currency(assets as f64 / start as f64)),
        _ => None,
    };

    metrics.assets_per_member_end = match total_assets_end {
        Some(assets) if end > 0 => Some(format_currency(assets as f64 / end as f64)),
        _ => None,
    };

    metrics.deposit_per_member = match deposits_end {
        Some(deposits) if end > 0 => Some(format_currency(deposits as f64 / end as f64)),
        _ => None,
    };

    metrics.cost_per_dollar_of_assets =
        match (total_assets_start, total_assets_end, marketing_budget) {
            (Some(assets_start), Some(assets_end), Some(budget)) => {
                let delta = assets_end - assets_start;
                if delta == 0 {
                    Some(UNDEFINED.to_string())
                } else if delta < 0 {
                    Some(policy.negative_growth_label.text().to_string())
                } else {
                    Some(format_currency(budget as f64 / delta as f64))
                }
            }
            _ => None,
        };

    metrics.percent_penetration = match potential_members {
        Some(potential) if potential != 0 => {
            let ratio = (potential - end) as f64 / potential as f64;
            Some(format_percent((1.0 - ratio) * 100.0))
        }
        _ => Some(UNDEFINED.to_string()),
    };

    metrics
}

/// Currency string: `$` plus thousands-grouped amount at two decimals.
fn format_currency(amount: f64) -> String {
    format!("${}", group_thousands(&format!("{amount:.2}")))
}

/// Signed integer with an explicit `+` for zero-or-positive values.
fn format_signed(value: i64) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// Rounded integer percentage.
fn format_percent(percent: f64) -> String {
    format!("{}%", percent.round() as i64)
}

/// Insert thousands separators into the integer digits of a formatted number.
fn group_thousands(value: &str) -> String {
    let (sign, rest) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rest, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
