//! Per-row validation and normalization.
//!
//! Cleaners are pure functions from a sheet row to a typed record or a
//! [`crate::types::RowReject`]. They perform no I/O and no row's outcome
//! depends on another row's, so a rejected row never disturbs its neighbors.
//! Column lookups are resolved once per run against the snapshot and reused
//! for every row.

mod leads;
mod volume;

pub use leads::{LeadColumns, clean_lead};
pub use volume::{VolumeColumns, clean_trading_volume};
