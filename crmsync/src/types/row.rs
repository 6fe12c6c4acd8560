use std::fmt;

/// 1-based position of a row in a sheet tab.
///
/// Position 1 is the header row, so the first data row is position 2. The
/// position is the address used for status write-backs and must survive every
/// stage of a run unchanged.
pub type RowPosition = u32;

/// The two sheet tabs the pipeline knows how to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Leads,
    TradingVolume,
}

impl Domain {
    pub fn as_static_str(&self) -> &'static str {
        match self {
            Domain::Leads => "leads",
            Domain::TradingVolume => "trading_volume",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_static_str())
    }
}

/// Upload status of a row, read from the sheet's status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Pending,
    Processed,
    Error,
}

impl StatusTag {
    /// Parses a raw status cell.
    ///
    /// Matching is case-insensitive after trimming. An ERROR tag may carry a
    /// reason suffix ("ERROR: missing email"), so any value starting with
    /// "error" counts as [`StatusTag::Error`]. Blank and unrecognized values
    /// are treated as [`StatusTag::Pending`] so rows with a corrupted status
    /// are retried rather than silently dropped.
    pub fn parse(raw: &str) -> StatusTag {
        let normalized = raw.trim().to_lowercase();

        if normalized == "processed" {
            StatusTag::Processed
        } else if normalized.starts_with("error") {
            StatusTag::Error
        } else {
            StatusTag::Pending
        }
    }

    pub fn as_static_str(&self) -> &'static str {
        match self {
            StatusTag::Pending => "pending",
            StatusTag::Processed => "processed",
            StatusTag::Error => "error",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_static_str())
    }
}

/// A single data row from a sheet tab.
///
/// Values are kept raw; trimming happens on access so the cleaners see the
/// same text regardless of how the sheet author padded cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based sheet position, used for status write-back.
    pub position: RowPosition,
    /// Cell values aligned with the snapshot's normalized headers.
    pub values: Vec<String>,
}

impl SheetRow {
    /// Returns the trimmed value of the cell in the given column.
    ///
    /// Returns [`None`] when the cell is blank or the row is shorter than the
    /// header, which the sheet API produces for trailing empty cells.
    pub fn field(&self, column: usize) -> Option<&str> {
        let value = self.values.get(column)?.trim();
        (!value.is_empty()).then_some(value)
    }
}
