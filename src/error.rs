use chrono::NaiveDate;
use thiserror::Error;

/// Run-level failures. Per-report fetch failures never reach this type;
/// they degrade to empty field maps inside the collector.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("directory listing returned no institutions")]
    EmptyDirectory,

    #[error("no available reporting period pair within {attempts} quarters")]
    NoAvailablePeriod { attempts: usize },

    #[error("{date} is not a quarter-end date")]
    NotQuarterEnd { date: NaiveDate },
}
