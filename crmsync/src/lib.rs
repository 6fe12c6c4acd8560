pub mod clean;
pub mod conversions;
pub mod dedup;
pub mod error;
mod macros;
pub mod pipeline;
pub mod source;
pub mod status;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod warehouse;
