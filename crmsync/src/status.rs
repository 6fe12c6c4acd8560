//! Status write-back with pacing and bounded retries.
//!
//! After loading, every processed row gets its status cell rewritten in the
//! source sheet. The sheet API is rate limited, so writes are paced with a
//! fixed interval and transient failures are retried with exponential
//! backoff. A status write that keeps failing is logged and skipped; the
//! warehouse write it reports on is already durable, and the row is
//! recovered on the next run through inter-store deduplication.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crmsync_config::shared::PipelineConfig;

use crate::error::IngestError;
use crate::source::{SheetSnapshot, SheetSource};
use crate::types::{Disposition, LoadOutcome, RowPosition, RowReject};

/// Pacing and retry policy for status writes.
///
/// Encapsulates the decision of whether a failed write should be retried and
/// how long to wait before the next attempt.
#[derive(Debug, Clone)]
pub struct WritePacing {
    interval: Duration,
    max_attempts: u32,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl WritePacing {
    pub fn new(config: &PipelineConfig) -> WritePacing {
        WritePacing {
            interval: config.status_write_interval(),
            max_attempts: config.status_write_max_attempts,
            max_delay: config.status_write_max_delay(),
            backoff_multiplier: config.status_write_backoff_multiplier,
        }
    }

    /// Delay observed between consecutive status writes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Determines if the write should be attempted again after a failure.
    ///
    /// Returns `true` only for transient error kinds (rate limiting,
    /// transport loss) and only while the attempt budget lasts.
    pub fn should_retry(&self, error: &IngestError, attempt: u32) -> bool {
        if !error.kind().is_status_write_retryable() {
            return false;
        }

        attempt < self.max_attempts
    }

    /// Calculates the backoff delay after the given attempt (1-indexed).
    ///
    /// Uses exponential backoff: delay = interval * multiplier^(attempt - 1),
    /// capped at the configured maximum. Adds random jitter of up to 30% so
    /// parallel deployments do not hammer the API in lockstep.
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self.backoff_multiplier.powi(exponent as i32);
        let base_delay_ms = self.interval.as_millis() as f64 * multiplier;

        let capped_delay_ms = base_delay_ms.min(self.max_delay.as_millis() as f64);

        let jitter_factor = rand::rng().random::<f64>() * 0.3;
        let jittered_delay_ms = capped_delay_ms * (1.0 + jitter_factor);

        Duration::from_millis(jittered_delay_ms as u64)
    }
}

/// A single pending status write, keyed by sheet row position.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub position: RowPosition,
    pub value: String,
}

impl StatusUpdate {
    /// Renders the write-back value for a load outcome.
    ///
    /// Skipped duplicates count as processed; they must not be retried on
    /// the next run.
    pub fn from_outcome(outcome: &LoadOutcome) -> StatusUpdate {
        let value = match &outcome.disposition {
            Disposition::Loaded | Disposition::Skipped(_) => "PROCESSED".to_owned(),
            Disposition::Failed(message) => format!("ERROR: {message}"),
        };

        StatusUpdate {
            position: outcome.position,
            value,
        }
    }

    /// Renders the write-back value for a row rejected during cleaning.
    pub fn from_reject(reject: &RowReject) -> StatusUpdate {
        StatusUpdate {
            position: reject.position,
            value: format!("ERROR: {}", reject.reason),
        }
    }
}

/// Counts of how the write-back pass went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub written: u64,
    pub skipped: u64,
}

/// Writes the given status updates back to the sheet, one cell at a time.
///
/// Updates are written in the order given. Failures never abort the pass:
/// a write is retried within the pacing policy's budget and then skipped
/// with a warning, leaving the row to be picked up again on the next run.
pub async fn sync_statuses<S>(
    source: &S,
    tab: &str,
    snapshot: &SheetSnapshot,
    updates: &[StatusUpdate],
    pacing: &WritePacing,
) -> SyncReport
where
    S: SheetSource,
{
    let mut report = SyncReport::default();

    for (index, update) in updates.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(pacing.interval()).await;
        }

        let cell = snapshot.status_cell(update.position);
        let mut attempt = 1;

        loop {
            match source.write_status(tab, cell, &update.value).await {
                Ok(()) => {
                    report.written += 1;
                    break;
                }
                Err(error) if pacing.should_retry(&error, attempt) => {
                    let delay = pacing.calculate_backoff(attempt);
                    warn!(
                        position = update.position,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "status write failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(
                        position = update.position,
                        attempts = attempt,
                        error = %error,
                        "status write failed, skipping row"
                    );
                    report.skipped += 1;
                    break;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ingest_error;
    use crate::source::memory::MemorySheet;
    use crate::types::SkipReason;

    fn pacing(max_attempts: u32) -> WritePacing {
        WritePacing::new(&PipelineConfig {
            status_write_interval_ms: 1,
            status_write_max_attempts: max_attempts,
            status_write_max_delay_ms: 5,
            status_write_backoff_multiplier: 2.0,
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn outcomes_render_processed_or_error() {
        assert_eq!(
            StatusUpdate::from_outcome(&LoadOutcome::loaded(2)).value,
            "PROCESSED"
        );
        assert_eq!(
            StatusUpdate::from_outcome(&LoadOutcome::skipped(3, SkipReason::AlreadyInStore)).value,
            "PROCESSED"
        );
        assert_eq!(
            StatusUpdate::from_outcome(&LoadOutcome::failed(4, "boom")).value,
            "ERROR: boom"
        );
    }

    #[test]
    fn transient_kinds_retry_within_the_budget() {
        let pacing = pacing(3);
        let rate_limited = ingest_error!(ErrorKind::SourceRateLimited, "slow down");
        let rejected = ingest_error!(ErrorKind::StatusWriteFailed, "no");

        assert!(pacing.should_retry(&rate_limited, 1));
        assert!(pacing.should_retry(&rate_limited, 2));
        assert!(!pacing.should_retry(&rate_limited, 3));
        assert!(!pacing.should_retry(&rejected, 1));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = WritePacing::new(&PipelineConfig {
            status_write_interval_ms: 100,
            status_write_max_attempts: 5,
            status_write_max_delay_ms: 250,
            status_write_backoff_multiplier: 2.0,
            ..PipelineConfig::default()
        });

        let first = policy.calculate_backoff(1).as_millis();
        let second = policy.calculate_backoff(2).as_millis();
        let third = policy.calculate_backoff(3).as_millis();

        // Jitter adds up to 30% on top of the base delay.
        assert!((100..=130).contains(&first), "first backoff was {first}ms");
        assert!((200..=260).contains(&second), "second backoff was {second}ms");
        assert!((250..=325).contains(&third), "third backoff was {third}ms");
    }

    async fn snapshot_of(sheet: &MemorySheet, tab: &str) -> SheetSnapshot {
        sheet.fetch_snapshot(tab).await.unwrap()
    }

    fn two_row_grid() -> Vec<Vec<String>> {
        vec![
            vec!["full_name".to_owned(), "upload_status".to_owned()],
            vec!["ada".to_owned(), String::new()],
            vec!["grace".to_owned(), String::new()],
        ]
    }

    #[tokio::test]
    async fn rate_limited_write_succeeds_after_retry() {
        let sheet = MemorySheet::new();
        sheet.insert_tab("Leads", two_row_grid()).await;
        sheet.rate_limit_status_writes(2, 1).await;
        let snapshot = snapshot_of(&sheet, "Leads").await;

        let updates = vec![StatusUpdate {
            position: 2,
            value: "PROCESSED".to_owned(),
        }];
        let report = sync_statuses(&sheet, "Leads", &snapshot, &updates, &pacing(3)).await;

        assert_eq!(report, SyncReport { written: 1, skipped: 0 });
        assert_eq!(sheet.statuses("Leads").await.get(&2).map(String::as_str), Some("PROCESSED"));
    }

    #[tokio::test]
    async fn rejected_write_is_skipped_and_the_pass_continues() {
        let sheet = MemorySheet::new();
        sheet.insert_tab("Leads", two_row_grid()).await;
        sheet.reject_status_writes(2).await;
        let snapshot = snapshot_of(&sheet, "Leads").await;

        let updates = vec![
            StatusUpdate {
                position: 2,
                value: "PROCESSED".to_owned(),
            },
            StatusUpdate {
                position: 3,
                value: "PROCESSED".to_owned(),
            },
        ];
        let report = sync_statuses(&sheet, "Leads", &snapshot, &updates, &pacing(3)).await;

        assert_eq!(report, SyncReport { written: 1, skipped: 1 });

        let statuses = sheet.statuses("Leads").await;
        assert_eq!(statuses.get(&2).map(String::as_str), Some(""));
        assert_eq!(statuses.get(&3).map(String::as_str), Some("PROCESSED"));
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_skips_the_row() {
        let sheet = MemorySheet::new();
        sheet.insert_tab("Leads", two_row_grid()).await;
        // More rate limit failures than the budget of 2 attempts allows.
        sheet.rate_limit_status_writes(2, 5).await;
        let snapshot = snapshot_of(&sheet, "Leads").await;

        let updates = vec![StatusUpdate {
            position: 2,
            value: "PROCESSED".to_owned(),
        }];
        let report = sync_statuses(&sheet, "Leads", &snapshot, &updates, &pacing(2)).await;

        assert_eq!(report, SyncReport { written: 0, skipped: 1 });
    }
}
