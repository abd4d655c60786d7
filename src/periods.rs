//! Reporting-period resolution.
//!
//! The source publishes no index of available periods, so the resolver probes:
//! starting from the most recent quarter end, it fetches the reference report
//! for one sample institution and steps back a quarter at a time until both
//! the candidate period and its prior period yield data.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::api::ReportSource;
use crate::collector::fetch_report;
use crate::error::RunError;
use crate::models::{Period, PriorPeriodPolicy, ReportType};

/// Report type used for availability probing.
const PROBE_REPORT: ReportType = ReportType::Condition;

/// How many quarters back the resolver will look before giving up.
const MAX_BACKWARD_STEPS: usize = 4;

/// The period pair resolved for a whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPeriods {
    pub current: Period,
    pub prior: Period,
    pub annualization_multiplier: f64,
}

/// Resolve the (current, prior) reporting periods by probing availability for
/// `probe_id`. Fails the run when no valid pair exists within the backward
/// budget; per-institution work must not start in that case.
pub async fn resolve_periods(
    source: &dyn ReportSource,
    probe_id: &str,
    today: NaiveDate,
    policy: PriorPeriodPolicy,
) -> Result<ResolvedPeriods, RunError> {
    let mut candidate = Period::latest_quarter_end(today);

    for step in 0..MAX_BACKWARD_STEPS {
        if step > 0 {
            candidate = candidate.previous_quarter();
        }

        if !is_available(source, probe_id, candidate).await {
            debug!("no {PROBE_REPORT} report at {candidate} for probe institution {probe_id}");
            continue;
        }

        let prior = match policy {
            PriorPeriodPolicy::YearAgo => candidate.year_earlier(),
            PriorPeriodPolicy::PreviousQuarter => candidate.previous_quarter(),
        };

        // A current period without a usable prior is not a valid pair; keep
        // stepping back within the budget.
        if !is_available(source, probe_id, prior).await {
            debug!("prior period {prior} unavailable for current period {candidate}");
            continue;
        }

        let multiplier = candidate.annualization_multiplier();
        info!("resolved reporting periods: current {candidate}, prior {prior}, annualization x{multiplier}");
        return Ok(ResolvedPeriods {
            current: candidate,
            prior,
            annualization_multiplier: multiplier,
        });
    }

    Err(RunError::NoAvailablePeriod {
        attempts: MAX_BACKWARD_STEPS,
    })
}

/// A period counts as available when the probe report yields at least one
/// extracted field.
async fn is_available(source: &dyn ReportSource, probe_id: &str, period: Period) -> bool {
    !fetch_report(source, probe_id, period, PROBE_REPORT)
        .await
        .is_empty()
}
