use std::fmt;

use crate::conversions::CellError;
use crate::types::RowPosition;

/// Why a row was rejected during cleaning.
///
/// The rendered form is written back to the source as the ERROR reason, so it
/// stays short and names the offending field.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// A field the domain requires is absent or blank.
    MissingRequiredField(&'static str),
    /// Neither email nor telegram is present.
    MissingContactChannel,
    /// The lead stage is not one of the seven known values.
    InvalidStatusValue(String),
    /// A cell failed type coercion.
    BadCell {
        column: &'static str,
        error: CellError,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingRequiredField(field) => {
                write!(f, "missing_required_field: {field}")
            }
            RejectReason::MissingContactChannel => {
                f.write_str("missing_contact_channel: need email or telegram")
            }
            RejectReason::InvalidStatusValue(value) => {
                write!(f, "invalid_status_value: '{value}'")
            }
            RejectReason::BadCell { column, error } => write!(f, "{column}: {error}"),
        }
    }
}

/// A row excluded during cleaning, tagged ERROR at write-back.
#[derive(Debug, Clone, PartialEq)]
pub struct RowReject {
    pub position: RowPosition,
    pub reason: RejectReason,
}

/// Why duplicate resolution excluded a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// An earlier row in the batch shares the natural key.
    DuplicateInBatch,
    /// The natural key is already present in the warehouse.
    AlreadyInStore,
}

impl SkipReason {
    pub fn as_static_str(&self) -> &'static str {
        match self {
            SkipReason::DuplicateInBatch => "duplicate_in_batch",
            SkipReason::AlreadyInStore => "already_in_store",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_static_str())
    }
}

/// Terminal fate of a row that reached the load stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Written durably to the warehouse.
    Loaded,
    /// Excluded as a duplicate. Counts as success so the row is tagged
    /// PROCESSED and not retried forever.
    Skipped(SkipReason),
    /// The insert failed. The message becomes the ERROR reason.
    Failed(String),
}

/// Outcome of one row, keyed by source position for write-back.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub position: RowPosition,
    pub disposition: Disposition,
}

impl LoadOutcome {
    pub fn loaded(position: RowPosition) -> Self {
        Self {
            position,
            disposition: Disposition::Loaded,
        }
    }

    pub fn skipped(position: RowPosition, reason: SkipReason) -> Self {
        Self {
            position,
            disposition: Disposition::Skipped(reason),
        }
    }

    pub fn failed(position: RowPosition, message: impl Into<String>) -> Self {
        Self {
            position,
            disposition: Disposition::Failed(message.into()),
        }
    }

    /// True when the row should be tagged PROCESSED rather than ERROR.
    pub fn is_success(&self) -> bool {
        !matches!(self.disposition, Disposition::Failed(_))
    }
}

/// Counters for one domain's run, logged when the run finishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Data rows present in the snapshot.
    pub read: u64,
    /// Rows tagged PENDING and selected for processing.
    pub pending: u64,
    /// Rows that passed cleaning.
    pub cleaned: u64,
    /// Rows rejected by cleaning.
    pub rejected: u64,
    /// Rows excluded by duplicate resolution.
    pub deduped: u64,
    /// Rows durably written to the warehouse.
    pub loaded: u64,
    /// Rows whose insert failed.
    pub errored: u64,
    /// Status cells successfully written back.
    pub statuses_written: u64,
    /// Status write-backs skipped after exhausting retries.
    pub statuses_skipped: u64,
    /// The first few row-level error reasons, for the run summary log.
    pub error_reasons: Vec<String>,
}
