//! Run orchestration: one state machine pass per domain.
//!
//! A run walks READ, FILTER_PENDING, CLEAN, DEDUP, LOAD and SYNC_STATUS in
//! strict sequence; no stage overlaps another and per-record loads are
//! serialized so every warehouse write maps to exactly one status write-back.
//! Run-fatal errors abort between durable writes, and the outcomes gathered
//! before the abort are still written back so committed rows are not retried
//! by the next run.
//!
//! Nothing here guards against two concurrent runs on the same domain; the
//! trigger (scheduler or operator) is expected to run one at a time. Two
//! overlapping runs could both pass inter-store deduplication before either
//! commits.

use std::fmt;

use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crmsync_config::shared::PipelineConfig;

use crate::clean::{LeadColumns, VolumeColumns, clean_lead, clean_trading_volume};
use crate::dedup::{
    dedup_leads_in_batch, dedup_volume_in_batch, filter_known_leads, filter_known_volume,
    lead_batch_keys,
};
use crate::error::{IngestError, IngestResult};
use crate::source::{SheetSnapshot, SheetSource};
use crate::status::{StatusUpdate, SyncReport, WritePacing, sync_statuses};
use crate::types::{
    Domain, LoadOutcome, RowPosition, RowReject, RunReport, SheetRow, StatusTag, VolumeKey,
};
use crate::warehouse::Warehouse;

/// Phase of a run, used for logging and abort attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Read,
    FilterPending,
    Clean,
    Dedup,
    Load,
    SyncStatus,
    Done,
    Aborted,
}

impl RunPhase {
    pub fn as_static_str(&self) -> &'static str {
        match self {
            RunPhase::Read => "read",
            RunPhase::FilterPending => "filter_pending",
            RunPhase::Clean => "clean",
            RunPhase::Dedup => "dedup",
            RunPhase::Load => "load",
            RunPhase::SyncStatus => "sync_status",
            RunPhase::Done => "done",
            RunPhase::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_static_str())
    }
}

/// Sequential ingestion pipeline over a sheet source and a warehouse.
///
/// One instance can serve several runs; each [`IngestPipeline::run`] call is
/// an independent pass over one domain's tab.
#[derive(Debug, Clone)]
pub struct IngestPipeline<S, W> {
    source: S,
    warehouse: W,
    pacing: WritePacing,
    max_reported_errors: usize,
}

impl<S, W> IngestPipeline<S, W>
where
    S: SheetSource,
    W: Warehouse,
{
    pub fn new(source: S, warehouse: W, config: &PipelineConfig) -> IngestPipeline<S, W> {
        IngestPipeline {
            source,
            warehouse,
            pacing: WritePacing::new(config),
            max_reported_errors: config.max_reported_errors,
        }
    }

    /// Executes one run for the given domain against the named tab.
    ///
    /// Returns the run's counters on completion. Row-level problems are
    /// reflected in the counters, never in the result; an `Err` always means
    /// the run aborted and the untouched rows are still PENDING.
    pub async fn run(&self, domain: Domain, tab: &str) -> IngestResult<RunReport> {
        let run_id = Uuid::new_v4();
        let run_span = tracing::info_span!(
            "ingest_run",
            run_id = %run_id,
            domain = domain.as_static_str(),
            tab
        );

        async {
            info!("starting ingest run");

            let result = match domain {
                Domain::Leads => self.run_leads(tab).await,
                Domain::TradingVolume => self.run_trading_volume(tab).await,
            };

            if let Ok(report) = &result {
                info!(
                    phase = %RunPhase::Done,
                    read = report.read,
                    pending = report.pending,
                    cleaned = report.cleaned,
                    rejected = report.rejected,
                    deduped = report.deduped,
                    loaded = report.loaded,
                    errored = report.errored,
                    statuses_written = report.statuses_written,
                    statuses_skipped = report.statuses_skipped,
                    "run finished"
                );
            }

            result
        }
        .instrument(run_span)
        .await
    }

    async fn run_leads(&self, tab: &str) -> IngestResult<RunReport> {
        let mut report = RunReport::default();

        let snapshot = self
            .source
            .fetch_snapshot(tab)
            .await
            .map_err(|error| abort(RunPhase::Read, error))?;
        let columns =
            LeadColumns::resolve(&snapshot).map_err(|error| abort(RunPhase::Read, error))?;
        report.read = snapshot.rows().len() as u64;
        info!(phase = %RunPhase::Read, rows = report.read, "snapshot fetched");

        let pending = self.filter_pending(&snapshot, &mut report);

        let mut records = Vec::new();
        let mut rejects = Vec::new();
        for row in pending {
            match clean_lead(row, &columns) {
                Ok(record) => records.push(record),
                Err(reject) => {
                    self.record_row_error(&mut report, reject.position, &reject.reason.to_string());
                    rejects.push(reject);
                }
            }
        }
        report.cleaned = records.len() as u64;
        report.rejected = rejects.len() as u64;
        info!(
            phase = %RunPhase::Clean,
            cleaned = report.cleaned,
            rejected = report.rejected,
            "cleaned pending rows"
        );

        let (records, mut outcomes) = {
            let (survivors, batch_excluded) = dedup_leads_in_batch(records);
            let (emails, telegrams) = lead_batch_keys(&survivors);
            let known = self
                .warehouse
                .lead_keys(&emails, &telegrams)
                .await
                .map_err(|error| abort(RunPhase::Dedup, error))?;
            let (survivors, store_excluded) = filter_known_leads(survivors, &known);

            let mut outcomes = batch_excluded;
            outcomes.extend(store_excluded);
            (survivors, outcomes)
        };
        report.deduped = outcomes.len() as u64;
        info!(phase = %RunPhase::Dedup, excluded = report.deduped, "resolved duplicates");

        for record in &records {
            match self.warehouse.insert_lead(record).await {
                Ok(()) => {
                    report.loaded += 1;
                    outcomes.push(LoadOutcome::loaded(record.position));
                }
                Err(error) if error.kind().is_run_fatal() => {
                    self.write_back(tab, &snapshot, &outcomes, &rejects, &mut report)
                        .await;
                    return Err(abort(RunPhase::Load, error));
                }
                Err(error) => {
                    let message = row_error_message(&error);
                    self.record_row_error(&mut report, record.position, &message);
                    report.errored += 1;
                    outcomes.push(LoadOutcome::failed(record.position, message));
                }
            }
        }
        info!(
            phase = %RunPhase::Load,
            loaded = report.loaded,
            errored = report.errored,
            "loaded records"
        );

        self.write_back(tab, &snapshot, &outcomes, &rejects, &mut report)
            .await;

        Ok(report)
    }

    async fn run_trading_volume(&self, tab: &str) -> IngestResult<RunReport> {
        let mut report = RunReport::default();

        let snapshot = self
            .source
            .fetch_snapshot(tab)
            .await
            .map_err(|error| abort(RunPhase::Read, error))?;
        let columns =
            VolumeColumns::resolve(&snapshot).map_err(|error| abort(RunPhase::Read, error))?;
        report.read = snapshot.rows().len() as u64;
        info!(phase = %RunPhase::Read, rows = report.read, "snapshot fetched");

        let pending = self.filter_pending(&snapshot, &mut report);

        let mut records = Vec::new();
        let mut rejects = Vec::new();
        for row in pending {
            match clean_trading_volume(row, &columns) {
                Ok(record) => records.push(record),
                Err(reject) => {
                    self.record_row_error(&mut report, reject.position, &reject.reason.to_string());
                    rejects.push(reject);
                }
            }
        }
        report.cleaned = records.len() as u64;
        report.rejected = rejects.len() as u64;
        info!(
            phase = %RunPhase::Clean,
            cleaned = report.cleaned,
            rejected = report.rejected,
            "cleaned pending rows"
        );

        let (records, mut outcomes) = {
            let (survivors, batch_excluded) = dedup_volume_in_batch(records);
            let batch_keys: Vec<VolumeKey> =
                survivors.iter().map(|record| record.key()).collect();
            let known = self
                .warehouse
                .volume_keys(&batch_keys)
                .await
                .map_err(|error| abort(RunPhase::Dedup, error))?;
            let (survivors, store_excluded) = filter_known_volume(survivors, &known);

            let mut outcomes = batch_excluded;
            outcomes.extend(store_excluded);
            (survivors, outcomes)
        };
        report.deduped = outcomes.len() as u64;
        info!(phase = %RunPhase::Dedup, excluded = report.deduped, "resolved duplicates");

        for record in &records {
            match self.warehouse.insert_trading_volume(record).await {
                Ok(()) => {
                    report.loaded += 1;
                    outcomes.push(LoadOutcome::loaded(record.position));
                }
                Err(error) if error.kind().is_run_fatal() => {
                    self.write_back(tab, &snapshot, &outcomes, &rejects, &mut report)
                        .await;
                    return Err(abort(RunPhase::Load, error));
                }
                Err(error) => {
                    let message = row_error_message(&error);
                    self.record_row_error(&mut report, record.position, &message);
                    report.errored += 1;
                    outcomes.push(LoadOutcome::failed(record.position, message));
                }
            }
        }
        info!(
            phase = %RunPhase::Load,
            loaded = report.loaded,
            errored = report.errored,
            "loaded records"
        );

        self.write_back(tab, &snapshot, &outcomes, &rejects, &mut report)
            .await;

        Ok(report)
    }

    fn filter_pending<'a>(
        &self,
        snapshot: &'a SheetSnapshot,
        report: &mut RunReport,
    ) -> Vec<&'a SheetRow> {
        let pending: Vec<_> = snapshot
            .rows()
            .iter()
            .filter(|row| snapshot.status_tag(row) == StatusTag::Pending)
            .collect();
        report.pending = pending.len() as u64;
        info!(
            phase = %RunPhase::FilterPending,
            pending = report.pending,
            "selected pending rows"
        );

        pending
    }

    /// Writes every gathered outcome and reject back to the sheet.
    ///
    /// Also called on the abort path, where it covers the rows whose fate was
    /// already decided before the run died.
    async fn write_back(
        &self,
        tab: &str,
        snapshot: &SheetSnapshot,
        outcomes: &[LoadOutcome],
        rejects: &[RowReject],
        report: &mut RunReport,
    ) {
        let mut updates: Vec<StatusUpdate> = outcomes
            .iter()
            .map(StatusUpdate::from_outcome)
            .chain(rejects.iter().map(StatusUpdate::from_reject))
            .collect();
        updates.sort_by_key(|update| update.position);
        info!(
            phase = %RunPhase::SyncStatus,
            updates = updates.len(),
            "writing statuses back"
        );

        let SyncReport { written, skipped } =
            sync_statuses(&self.source, tab, snapshot, &updates, &self.pacing).await;
        report.statuses_written = written;
        report.statuses_skipped = skipped;
    }

    /// Logs a row-level failure and keeps the first few reasons for the run
    /// summary.
    fn record_row_error(&self, report: &mut RunReport, position: RowPosition, reason: &str) {
        if report.error_reasons.len() < self.max_reported_errors {
            warn!(position, reason, "row failed");
            report.error_reasons.push(format!("row {position}: {reason}"));
        } else {
            debug!(position, reason, "row failed");
        }
    }
}

fn abort(phase: RunPhase, error: IngestError) -> IngestError {
    error!(
        phase = %RunPhase::Aborted,
        failed_phase = %phase,
        error = %error,
        "run aborted"
    );

    error
}

/// Short error rendering for an ERROR status cell.
fn row_error_message(error: &IngestError) -> String {
    match error.detail() {
        Some(detail) => format!("{} ({detail})", error.description()),
        None => error.description().to_owned(),
    }
}
