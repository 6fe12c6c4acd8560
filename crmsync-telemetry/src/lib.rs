//! Telemetry setup shared by the ingestor binary and integration tests.

pub mod tracing;
