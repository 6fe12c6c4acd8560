//! Cell-level parsing helpers shared by the domain cleaners.
//!
//! Every helper fails explicitly: a cell that cannot be coerced produces a
//! [`CellError`] that the cleaner turns into a row rejection, never a silent
//! null.

mod bool;
mod date;
mod numeric;
mod text;

pub use bool::parse_bool;
pub use date::parse_date;
pub use numeric::{parse_optional_decimal, parse_tier_level};
pub use text::{lowercased, normalize_header, owned_text, pad_entity_id, title_case};

use thiserror::Error;

/// Errors raised when a single cell fails type coercion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error("not a valid boolean (received: {0})")]
    InvalidBool(String),
    #[error("not a valid date (received: {0})")]
    InvalidDate(String),
    #[error("not a valid number (received: {0})")]
    InvalidNumber(String),
    #[error("level out of range 0..={max} (received: {value})")]
    LevelOutOfRange { value: String, max: i16 },
}
