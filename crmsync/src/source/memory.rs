//! In-memory implementation of the sheet source for testing.
//!
//! Provides [`MemorySheet`], a [`SheetSource`] that stores tab grids in
//! memory. Status writes mutate the stored grid, so a second run against the
//! same fixture observes the statuses written by the first, which is how the
//! idempotence tests drive back-to-back runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::conversions::normalize_header;
use crate::error::{ErrorKind, IngestResult};
use crate::source::base::{CellRef, SheetSnapshot, SheetSource};
use crate::types::RowPosition;

#[derive(Debug, Default)]
struct Inner {
    tabs: HashMap<String, Vec<Vec<String>>>,
    fail_snapshots: bool,
    rate_limited_writes: HashMap<RowPosition, u32>,
    rejected_writes: HashSet<RowPosition>,
}

/// In-memory sheet fixture with injectable failures.
///
/// Cloning is cheap and all clones share the same tab storage.
#[derive(Debug, Clone)]
pub struct MemorySheet {
    status_column: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemorySheet {
    /// Creates an empty sheet whose status column is named `upload_status`.
    pub fn new() -> MemorySheet {
        MemorySheet {
            status_column: "upload_status".to_owned(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Inserts a tab, replacing any existing grid under the same name.
    ///
    /// The first grid row is the header row.
    pub async fn insert_tab(&self, name: &str, grid: Vec<Vec<String>>) {
        let mut inner = self.inner.lock().await;
        inner.tabs.insert(name.to_owned(), grid);
    }

    /// Makes every subsequent snapshot fetch fail with a connection error.
    pub async fn fail_snapshots(&self) {
        let mut inner = self.inner.lock().await;
        inner.fail_snapshots = true;
    }

    /// Makes the next `failures` status writes for `position` fail with a
    /// rate limit error before succeeding.
    pub async fn rate_limit_status_writes(&self, position: RowPosition, failures: u32) {
        let mut inner = self.inner.lock().await;
        inner.rate_limited_writes.insert(position, failures);
    }

    /// Makes every status write for `position` fail with a rejection.
    pub async fn reject_status_writes(&self, position: RowPosition) {
        let mut inner = self.inner.lock().await;
        inner.rejected_writes.insert(position);
    }

    /// Returns the status column values by row position for the given tab.
    ///
    /// This method is useful for verifying which statuses a run wrote back.
    /// Rows whose status cell is missing report an empty string.
    pub async fn statuses(&self, tab: &str) -> HashMap<RowPosition, String> {
        let inner = self.inner.lock().await;
        let mut statuses = HashMap::new();

        let Some(grid) = inner.tabs.get(tab) else {
            return statuses;
        };
        let Some(header) = grid.first() else {
            return statuses;
        };

        let wanted = normalize_header(&self.status_column);
        let Some(column) = header.iter().position(|cell| normalize_header(cell) == wanted) else {
            return statuses;
        };

        for (index, row) in grid.iter().enumerate().skip(1) {
            let value = row.get(column).cloned().unwrap_or_default();
            statuses.insert(index as RowPosition + 1, value);
        }

        statuses
    }
}

impl Default for MemorySheet {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetSource for MemorySheet {
    async fn fetch_snapshot(&self, tab: &str) -> IngestResult<SheetSnapshot> {
        let inner = self.inner.lock().await;

        if inner.fail_snapshots {
            bail!(
                ErrorKind::SourceConnectionFailed,
                "Sheet API connection lost"
            );
        }

        let Some(grid) = inner.tabs.get(tab) else {
            bail!(
                ErrorKind::SourceReadFailed,
                "Unknown sheet tab",
                format!("tab '{tab}'")
            );
        };

        SheetSnapshot::from_grid(tab, &self.status_column, grid.clone())
    }

    async fn write_status(&self, tab: &str, cell: CellRef, value: &str) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;

        if let Some(remaining) = inner.rate_limited_writes.get_mut(&cell.row) {
            if *remaining > 0 {
                *remaining -= 1;
                bail!(
                    ErrorKind::SourceRateLimited,
                    "Sheet API rate limit hit during status write",
                    format!("cell {tab}!{cell}")
                );
            }
        }

        if inner.rejected_writes.contains(&cell.row) {
            bail!(
                ErrorKind::StatusWriteFailed,
                "Sheet API rejected the status write",
                format!("cell {tab}!{cell}")
            );
        }

        let Some(grid) = inner.tabs.get_mut(tab) else {
            bail!(
                ErrorKind::StatusWriteFailed,
                "Unknown sheet tab",
                format!("tab '{tab}'")
            );
        };

        let row_index = cell.row.saturating_sub(1) as usize;
        let Some(row) = grid.get_mut(row_index) else {
            bail!(
                ErrorKind::StatusWriteFailed,
                "Status write addressed a row outside the grid",
                format!("cell {tab}!{cell}")
            );
        };

        if row.len() <= cell.column {
            row.resize(cell.column + 1, String::new());
        }
        row[cell.column] = value.to_owned();

        Ok(())
    }
}
