use std::time::Duration;

use anyhow::Result;

use crate::models::{Institution, Period, ReportType};

pub mod ibanknet;
pub use ibanknet::IbanknetClient;

/// One row of cells from a report page table, already reduced to text.
pub type TableRow = Vec<String>;

/// The injected fetch-and-parse capability. The engine never sees transport
/// details beyond success/failure; retry policy, if any, lives behind this
/// trait.
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    /// Ordered directory listing of the institution population.
    async fn institutions(&self) -> Result<Vec<Institution>>;

    /// Tabular rows of one report page for (institution, period, type).
    async fn report_rows(
        &self,
        institution_id: &str,
        period: Period,
        report_type: ReportType,
    ) -> Result<Vec<TableRow>>;
}

/// Simple fixed-delay pacer applied before every upstream request.
pub struct RequestPacer {
    delay_ms: u64,
}

impl RequestPacer {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            1000 // Default 1 second delay
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
    }
}
