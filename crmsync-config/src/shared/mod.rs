//! Shared configuration types for the ingestion pipeline.

mod base;
mod connection;
mod ingestor;
mod pipeline;
mod sheets;

pub use base::ValidationError;
pub use connection::{
    IntoConnectOptions, PgConnectionConfig, PgConnectionOptions, TlsConfig, WAREHOUSE_OPTIONS,
};
pub use ingestor::IngestorConfig;
pub use pipeline::PipelineConfig;
pub use sheets::SheetSourceConfig;
