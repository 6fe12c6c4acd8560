//! Common types used throughout the ingestion pipeline.
//!
//! Re-exports row-level source types, the cleaned per-domain records, and the
//! outcome types that drive status write-back.

mod lead;
mod outcome;
mod row;
mod volume;

pub use lead::*;
pub use outcome::*;
pub use row::*;
pub use volume::*;
