//! Spreadsheet source abstractions for the ingestion pipeline.
//!
//! This module provides the core [`SheetSource`] trait and implementations for
//! reading tab snapshots and writing per-row status markers back to the sheet.
//! Sources expose a point-in-time grid; all row addressing is derived from that
//! snapshot and stays valid for the whole run.

mod base;
pub mod http;
pub mod memory;

pub use base::{CellRef, SheetSnapshot, SheetSource, column_letters};
