//! Common test utilities and helpers

use std::collections::HashMap;

use anyhow::{anyhow, Result};

use cu_metrics::api::{ReportSource, TableRow};
use cu_metrics::models::{Config, Institution, MetricPolicy, Period, ReportType};

/// In-memory `ReportSource`. Reports are registered per
/// (institution, period, report type); anything unregistered behaves like a
/// transport failure.
#[derive(Default)]
pub struct StubSource {
    institutions: Vec<Institution>,
    reports: HashMap<(String, String, &'static str), Vec<TableRow>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn institution(mut self, id: &str, name: &str) -> Self {
        self.institutions.push(Institution {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn report(
        mut self,
        id: &str,
        period: &str,
        report_type: ReportType,
        rows: Vec<TableRow>,
    ) -> Self {
        self.reports
            .insert((id.to_string(), period.to_string(), report_type.code()), rows);
        self
    }
}

#[async_trait::async_trait]
impl ReportSource for StubSource {
    async fn institutions(&self) -> Result<Vec<Institution>> {
        Ok(self.institutions.clone())
    }

    async fn report_rows(
        &self,
        institution_id: &str,
        period: Period,
        report_type: ReportType,
    ) -> Result<Vec<TableRow>> {
        self.reports
            .get(&(
                institution_id.to_string(),
                period.to_string(),
                report_type.code(),
            ))
            .cloned()
            .ok_or_else(|| anyhow!("no {report_type} report for {institution_id} at {period}"))
    }
}

/// Config with test-friendly defaults; the base URL is only meaningful for
/// wiremock-backed tests.
pub fn test_config(base_url: &str) -> Config {
    Config {
        base_url: base_url.to_string(),
        output_path: "data.json".to_string(),
        max_concurrent_institutions: 4,
        requests_per_minute: 60_000,
        institution_limit: None,
        policy: MetricPolicy::default(),
    }
}

/// Report fixture builders
pub mod fixtures {
    use cu_metrics::api::TableRow;
    use cu_metrics::metrics::{
        MARKETING_EXPENSES_LABEL, MEMBER_COUNT_LABEL, POTENTIAL_MEMBERS_LABEL,
        TOTAL_ASSETS_LABEL, TOTAL_DEPOSITS_LABEL,
    };

    pub fn row(label: &str, value: &str) -> TableRow {
        vec![label.to_string(), value.to_string()]
    }

    /// Statement-of-condition rows carrying a total-assets line.
    pub fn condition_rows(total_assets: i64) -> Vec<TableRow> {
        vec![
            row("Cash on hand", "10,000"),
            row(TOTAL_ASSETS_LABEL, &total_assets.to_string()),
        ]
    }

    /// Income rows carrying the marketing budget line.
    pub fn income_rows(quarterly_budget: i64) -> Vec<TableRow> {
        vec![
            row("Interest Income", "55,000"),
            row(MARKETING_EXPENSES_LABEL, &quarterly_budget.to_string()),
        ]
    }

    /// Demographics rows carrying members, potential members and deposits.
    pub fn demographics_rows(members: i64, potential: i64, deposits: i64) -> Vec<TableRow> {
        vec![
            row(MEMBER_COUNT_LABEL, &members.to_string()),
            row(POTENTIAL_MEMBERS_LABEL, &potential.to_string()),
            row(TOTAL_DEPOSITS_LABEL, &deposits.to_string()),
        ]
    }

    /// Rows that yield no numeric fields at all.
    pub fn unparsable_rows() -> Vec<TableRow> {
        vec![row("Foo", "n/a"), row("Bar", "")]
    }

    /// Render rows as the kind of table markup the report pages serve.
    pub fn report_page_html(rows: &[TableRow]) -> String {
        let mut html = String::from("<html><body><table>");
        for cells in rows {
            html.push_str("<tr>");
            for cell in cells {
                html.push_str(&format!("<td>{cell}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");
        html
    }

    /// Render a directory listing page with one anchor per (id, name) entry.
    pub fn listing_html(entries: &[(&str, &str)]) -> String {
        let mut html = String::from("<html><body>");
        for (id, name) in entries {
            html.push_str(&format!(
                r#"<a class="pagebody" href="viewreport.aspx?ibnid={id}&per=0">{name}</a>"#
            ));
        }
        html.push_str("</body></html>");
        html
    }
}
