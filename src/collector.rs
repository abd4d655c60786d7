//! Run orchestration: directory listing, period resolution, and the bounded
//! per-institution fan-out.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::api::ReportSource;
use crate::error::RunError;
use crate::extractor::extract_fields;
use crate::metrics::compute_metrics;
use crate::models::{
    Config, FieldMap, InstitutionMetrics, Period, ReportBundle, ReportType, RunReport,
};
use crate::periods::{self, ResolvedPeriods};

/// Fetch one report and extract its fields.
///
/// Any transport or parse failure degrades to an empty map: downstream metric
/// logic treats "field absent" uniformly whether the line item was missing or
/// the fetch failed. The failure is logged, never propagated, and there are no
/// retries here.
pub async fn fetch_report(
    source: &dyn ReportSource,
    institution_id: &str,
    period: Period,
    report_type: ReportType,
) -> FieldMap {
    match source.report_rows(institution_id, period, report_type).await {
        Ok(rows) => {
            let fields = extract_fields(&rows);
            if fields.is_empty() {
                debug!("no numeric fields in {report_type} report for {institution_id} at {period}");
            }
            fields
        }
        Err(err) => {
            warn!("failed to fetch {report_type} report for {institution_id} at {period}: {err:#}");
            FieldMap::default()
        }
    }
}

/// Issue the five per-institution fetches concurrently and join them.
async fn fetch_bundle(
    source: &dyn ReportSource,
    institution_id: &str,
    resolved: &ResolvedPeriods,
) -> ReportBundle {
    let (condition_start, condition_end, income_end, demographics_start, demographics_end) = tokio::join!(
        fetch_report(source, institution_id, resolved.prior, ReportType::Condition),
        fetch_report(source, institution_id, resolved.current, ReportType::Condition),
        fetch_report(source, institution_id, resolved.current, ReportType::Income),
        fetch_report(source, institution_id, resolved.prior, ReportType::Demographics),
        fetch_report(source, institution_id, resolved.current, ReportType::Demographics),
    );

    ReportBundle {
        condition_start,
        condition_end,
        income_end,
        demographics_start,
        demographics_end,
    }
}

/// Drives one full run over the discovered institution population.
pub struct Collector {
    source: Arc<dyn ReportSource>,
    config: Config,
}

impl Collector {
    pub fn new(source: Arc<dyn ReportSource>, config: Config) -> Self {
        Self { source, config }
    }

    /// Run the whole pipeline: listing, period resolution, then a bounded
    /// concurrent pass over every institution. Output order follows the
    /// directory order regardless of completion order.
    pub async fn run(&self, today: NaiveDate) -> Result<RunReport> {
        let mut institutions = self.source.institutions().await?;
        if institutions.is_empty() {
            return Err(RunError::EmptyDirectory.into());
        }
        info!("discovered {} institutions", institutions.len());

        if let Some(limit) = self.config.institution_limit {
            institutions.truncate(limit);
            info!("limiting run to the first {} institutions", institutions.len());
        }

        // Period resolution is fatal on failure; nothing is fetched per
        // institution until a valid pair exists.
        let resolved = periods::resolve_periods(
            self.source.as_ref(),
            &institutions[0].id,
            today,
            self.config.policy.prior_period,
        )
        .await?;

        let concurrency = self.config.max_concurrent_institutions.max(1);
        let policy = self.config.policy;

        let results: Vec<InstitutionMetrics> = stream::iter(institutions)
            .map(|institution| {
                let source = Arc::clone(&self.source);
                async move {
                    let bundle = fetch_bundle(source.as_ref(), &institution.id, &resolved).await;
                    let metrics =
                        compute_metrics(&bundle, resolved.annualization_multiplier, &policy);
                    debug!("computed metrics for [{}] {}", institution.id, institution.name);
                    InstitutionMetrics {
                        id: institution.id,
                        name: institution.name,
                        metrics,
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        info!("computed metrics for {} institutions", results.len());
        Ok(RunReport {
            current_period: resolved.current,
            prior_period: resolved.prior,
            institutions: results,
        })
    }
}
