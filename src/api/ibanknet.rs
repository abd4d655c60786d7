use anyhow::{anyhow, Context, Result};
use scraper::{Html, Selector};
use tracing::debug;

use super::{ReportSource, RequestPacer, TableRow};
use crate::models::{Config, Institution, Period, ReportType};

/// HTTP client for an ibanknet-style call-report source. Implements the
/// fetch-and-parse capability; no retries, the pacer only spaces requests out.
pub struct IbanknetClient {
    client: reqwest::Client,
    base_url: String,
    pacer: RequestPacer,
}

impl IbanknetClient {
    /// Create a new client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("cu-metrics/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            pacer: RequestPacer::new(config.requests_per_minute),
        })
    }

    fn listing_url(&self) -> String {
        format!("{}/scripts/callreports/fiList.aspx?type=ncua", self.base_url)
    }

    fn report_url(&self, institution_id: &str, period: Period, report_type: ReportType) -> String {
        format!(
            "{}/scripts/callreports/viewreport.aspx?ibnid={}&per={}&rpt={}&typ=html",
            self.base_url,
            institution_id,
            period,
            report_type.code()
        )
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.pacer.wait().await;
        debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl ReportSource for IbanknetClient {
    async fn institutions(&self) -> Result<Vec<Institution>> {
        let html = self
            .get_text(&self.listing_url())
            .await
            .context("failed to fetch the institution directory listing")?;
        parse_institutions(&html)
    }

    async fn report_rows(
        &self,
        institution_id: &str,
        period: Period,
        report_type: ReportType,
    ) -> Result<Vec<TableRow>> {
        let url = self.report_url(institution_id, period, report_type);
        let html = self.get_text(&url).await?;
        parse_table_rows(&html)
    }
}

/// Institutions are `<a class="pagebody">` anchors whose href carries an
/// `ibnid` query parameter. Anchors without an id are skipped.
fn parse_institutions(html: &str) -> Result<Vec<Institution>> {
    let document = Html::parse_document(html);
    let anchors =
        Selector::parse("a.pagebody").map_err(|err| anyhow!("bad anchor selector: {err}"))?;

    let mut institutions = Vec::new();
    for anchor in document.select(&anchors) {
        let href = match anchor.value().attr("href") {
            Some(href) => href,
            None => continue,
        };
        let id = match extract_ibnid(href) {
            Some(id) => id,
            None => continue,
        };
        let name = anchor.text().collect::<String>().trim().to_string();
        institutions.push(Institution { id, name });
    }
    Ok(institutions)
}

/// Every `<tr>` on the page, reduced to trimmed `<td>` cell text.
fn parse_table_rows(html: &str) -> Result<Vec<TableRow>> {
    let document = Html::parse_document(html);
    let rows = Selector::parse("tr").map_err(|err| anyhow!("bad row selector: {err}"))?;
    let cells = Selector::parse("td").map_err(|err| anyhow!("bad cell selector: {err}"))?;

    Ok(document
        .select(&rows)
        .map(|row| {
            row.select(&cells)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect())
}

fn extract_ibnid(href: &str) -> Option<String> {
    let tail = match href.split_once("ibnid=") {
        Some((_, tail)) => tail,
        None => return None,
    };
    let id = tail.split('&').next().unwrap_or(tail);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
