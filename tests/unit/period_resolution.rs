//! Period resolver behavior against an in-memory report source.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use test_log::test;

use cu_metrics::error::RunError;
use cu_metrics::models::{PriorPeriodPolicy, ReportType};
use cu_metrics::periods::resolve_periods;

use crate::common::{fixtures, StubSource};

const PROBE: &str = "cu1";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn probe_report(source: StubSource, period: &str) -> StubSource {
    source.report(PROBE, period, ReportType::Condition, fixtures::condition_rows(1))
}

#[test(tokio::test)]
async fn resolves_the_newest_period_with_an_available_prior() {
    // Data only exists at the two year-end periods; the resolver has to step
    // back over two empty quarters to find them.
    let mut source = StubSource::new();
    source = probe_report(source, "20231231");
    source = probe_report(source, "20221231");

    let resolved = resolve_periods(&source, PROBE, date(2024, 8, 15), PriorPeriodPolicy::YearAgo)
        .await
        .unwrap();

    assert_eq!(resolved.current.to_string(), "20231231");
    assert_eq!(resolved.prior.to_string(), "20221231");
    assert_eq!(resolved.annualization_multiplier, 1.0);
}

#[test(tokio::test)]
async fn fails_after_exhausting_the_backward_budget() {
    let source = StubSource::new();

    let err = resolve_periods(&source, PROBE, date(2024, 8, 15), PriorPeriodPolicy::YearAgo)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::NoAvailablePeriod { attempts: 4 }));
}

#[test(tokio::test)]
async fn a_period_just_out_of_the_budget_is_not_found() {
    // Available data one quarter older than the four candidates the resolver
    // is allowed to try: the run must fail, not guess.
    let mut source = StubSource::new();
    source = probe_report(source, "20230630");
    source = probe_report(source, "20220630");

    let err = resolve_periods(&source, PROBE, date(2024, 8, 15), PriorPeriodPolicy::YearAgo)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::NoAvailablePeriod { .. }));
}

#[test(tokio::test)]
async fn skips_a_current_period_whose_prior_is_unavailable() {
    // 20241231 is published but its year-ago counterpart is not; the resolver
    // keeps stepping back until it finds a complete pair.
    let mut source = StubSource::new();
    source = probe_report(source, "20241231");
    source = probe_report(source, "20240930");
    source = probe_report(source, "20230930");

    let resolved = resolve_periods(&source, PROBE, date(2025, 2, 1), PriorPeriodPolicy::YearAgo)
        .await
        .unwrap();

    assert_eq!(resolved.current.to_string(), "20240930");
    assert_eq!(resolved.prior.to_string(), "20230930");
    assert_eq!(resolved.annualization_multiplier, 0.75);
}

#[test(tokio::test)]
async fn previous_quarter_policy_brackets_adjacent_quarters() {
    let mut source = StubSource::new();
    source = probe_report(source, "20241231");
    source = probe_report(source, "20240930");

    let resolved = resolve_periods(
        &source,
        PROBE,
        date(2025, 2, 1),
        PriorPeriodPolicy::PreviousQuarter,
    )
    .await
    .unwrap();

    assert_eq!(resolved.current.to_string(), "20241231");
    assert_eq!(resolved.prior.to_string(), "20240930");
    assert_eq!(resolved.annualization_multiplier, 1.0);
}

#[test(tokio::test)]
async fn a_report_with_no_numeric_fields_counts_as_unavailable() {
    let mut source = StubSource::new().report(
        PROBE,
        "20241231",
        ReportType::Condition,
        fixtures::unparsable_rows(),
    );
    source = probe_report(source, "20240930");
    source = probe_report(source, "20230930");

    let resolved = resolve_periods(&source, PROBE, date(2025, 2, 1), PriorPeriodPolicy::YearAgo)
        .await
        .unwrap();

    assert_eq!(resolved.current.to_string(), "20240930");
}
