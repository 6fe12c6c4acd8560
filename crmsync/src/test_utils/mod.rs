//! Testing utilities for driving the pipeline against in-memory fixtures.
//!
//! Used by the unit tests in this crate and by the integration tests under
//! `tests/`. Compiled for tests and behind the `test-utils` feature for
//! out-of-crate use.

pub mod grid;
pub mod pipeline;
