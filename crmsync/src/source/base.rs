use std::fmt;
use std::future::Future;

use crate::bail;
use crate::conversions::normalize_header;
use crate::error::{ErrorKind, IngestResult};
use crate::types::{RowPosition, SheetRow, StatusTag};

/// Sheet position of the first data row. Row 1 holds the headers.
const FIRST_DATA_ROW: RowPosition = 2;

/// Reference to a single cell in a sheet tab.
///
/// Rendered in A1 notation ("G5") when building write-back ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// Zero-based column index.
    pub column: usize,
    /// One-based row position, matching the source's own numbering.
    pub row: RowPosition,
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

/// Converts a zero-based column index into A1 column letters.
///
/// Index 0 maps to "A", 25 to "Z", 26 to "AA" and so on.
pub fn column_letters(mut index: usize) -> String {
    let mut letters = String::new();

    loop {
        let letter = (b'A' + (index % 26) as u8) as char;
        letters.insert(0, letter);

        if index < 26 {
            break;
        }

        index = index / 26 - 1;
    }

    letters
}

/// Point-in-time copy of a sheet tab.
///
/// The snapshot is taken once per run at the READ phase. Headers are
/// normalized on construction and data rows keep the positions they had in
/// the source, so status write-backs address the same physical rows even
/// though all later stages operate on this copy.
#[derive(Debug, Clone)]
pub struct SheetSnapshot {
    headers: Vec<String>,
    status_column: usize,
    rows: Vec<SheetRow>,
}

impl SheetSnapshot {
    /// Builds a snapshot from the raw grid returned by the source.
    ///
    /// The first grid row is the header row; its cells are normalized (trim,
    /// lowercase, spaces to underscores) before any lookup. Every following
    /// row becomes a [`SheetRow`] with its 1-based sheet position.
    ///
    /// A grid without a header row, or without the status column, means the
    /// tab cannot be written back safely, which is a run-fatal schema error.
    pub fn from_grid(
        tab: &str,
        status_column: &str,
        grid: Vec<Vec<String>>,
    ) -> IngestResult<SheetSnapshot> {
        let mut grid = grid.into_iter();

        let Some(header_row) = grid.next() else {
            bail!(
                ErrorKind::SourceSchemaInvalid,
                "Sheet tab has no header row",
                format!("tab '{tab}' returned an empty grid")
            );
        };

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| normalize_header(cell))
            .collect();

        let wanted = normalize_header(status_column);
        let Some(status_column) = headers.iter().position(|header| *header == wanted) else {
            bail!(
                ErrorKind::SourceSchemaInvalid,
                "Sheet tab is missing the status column",
                format!("no column '{wanted}' in tab '{tab}'")
            );
        };

        let rows = grid
            .enumerate()
            .map(|(index, values)| SheetRow {
                position: FIRST_DATA_ROW + index as RowPosition,
                values,
            })
            .collect();

        Ok(SheetSnapshot {
            headers,
            status_column,
            rows,
        })
    }

    /// Returns the index of the named column, if present.
    ///
    /// The name is compared against the normalized headers, so callers pass
    /// the canonical snake_case form.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Resolves a set of required columns to their indices, in input order.
    ///
    /// Any missing column aborts the run before a single row is touched, so a
    /// renamed or deleted column can never silently shift data into the wrong
    /// warehouse field. The error lists every missing column, not just the
    /// first.
    pub fn require_columns<const N: usize>(&self, names: [&str; N]) -> IngestResult<[usize; N]> {
        let mut indices = [0usize; N];
        let mut missing = Vec::new();

        for (slot, name) in indices.iter_mut().zip(names) {
            match self.column(name) {
                Some(index) => *slot = index,
                None => missing.push(name),
            }
        }

        if !missing.is_empty() {
            bail!(
                ErrorKind::SourceSchemaInvalid,
                "Sheet tab is missing required columns",
                format!("missing columns: {}", missing.join(", "))
            );
        }

        Ok(indices)
    }

    /// Parses the status tag of a data row.
    pub fn status_tag(&self, row: &SheetRow) -> StatusTag {
        row.field(self.status_column)
            .map_or(StatusTag::Pending, StatusTag::parse)
    }

    /// Returns the cell holding the status tag for the given row position.
    pub fn status_cell(&self, position: RowPosition) -> CellRef {
        CellRef {
            column: self.status_column,
            row: position,
        }
    }

    /// Data rows in sheet order, header row excluded.
    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }
}

/// Trait for spreadsheet-like services the pipeline can ingest from.
///
/// A [`SheetSource`] provides two operations: a point-in-time read of a whole
/// tab, and a single-cell write used to mark rows PROCESSED or ERROR after
/// loading. The write side is intentionally narrow so implementations against
/// rate-limited APIs stay one-request-per-cell and the pacing logic in the
/// status synchronizer remains accurate.
pub trait SheetSource {
    /// Fetches a full snapshot of the given tab.
    ///
    /// Transport failures and schema problems are run-fatal; the caller never
    /// retries within a run because a torn read would invalidate row
    /// addressing.
    fn fetch_snapshot(&self, tab: &str) -> impl Future<Output = IngestResult<SheetSnapshot>> + Send;

    /// Writes a status value into one cell of the given tab.
    fn write_status(
        &self,
        tab: &str,
        cell: CellRef,
        value: &str,
    ) -> impl Future<Output = IngestResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn column_letters_cover_multi_letter_ranges() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(52), "BA");
    }

    #[test]
    fn snapshot_normalizes_headers_and_positions() {
        let snapshot = SheetSnapshot::from_grid(
            "Leads",
            "upload_status",
            grid(&[
                &[" Full Name ", "Email", "Upload Status"],
                &["alice", "a@x.io", ""],
                &["bob", "b@x.io", "PROCESSED"],
            ]),
        )
        .unwrap();

        assert_eq!(snapshot.column("full_name"), Some(0));
        assert_eq!(snapshot.column("email"), Some(1));
        assert_eq!(snapshot.rows().len(), 2);
        assert_eq!(snapshot.rows()[0].position, 2);
        assert_eq!(snapshot.rows()[1].position, 3);
        assert_eq!(snapshot.status_tag(&snapshot.rows()[0]), StatusTag::Pending);
        assert_eq!(
            snapshot.status_tag(&snapshot.rows()[1]),
            StatusTag::Processed
        );
    }

    #[test]
    fn missing_status_column_is_schema_invalid() {
        let error = SheetSnapshot::from_grid(
            "Leads",
            "upload_status",
            grid(&[&["full_name", "email"], &["alice", "a@x.io"]]),
        )
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::SourceSchemaInvalid);
    }

    #[test]
    fn require_columns_reports_every_missing_name() {
        let snapshot = SheetSnapshot::from_grid(
            "Leads",
            "upload_status",
            grid(&[&["full_name", "upload_status"]]),
        )
        .unwrap();

        let error = snapshot
            .require_columns(["full_name", "email", "telegram"])
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::SourceSchemaInvalid);
        let rendered = error.to_string();
        assert!(rendered.contains("email"));
        assert!(rendered.contains("telegram"));
    }

    #[test]
    fn status_cell_targets_the_status_column() {
        let snapshot = SheetSnapshot::from_grid(
            "Leads",
            "upload_status",
            grid(&[&["full_name", "email", "upload_status"]]),
        )
        .unwrap();

        let cell = snapshot.status_cell(7);
        assert_eq!(cell.to_string(), "C7");
    }
}
