use serde::Deserialize;

use crate::shared::{PgConnectionConfig, PipelineConfig, SheetSourceConfig, ValidationError};

/// Top level configuration for the ingestor service.
///
/// This intentionally does not implement [`Serialize`] to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestorConfig {
    /// The spreadsheet the pipeline reads rows from and writes statuses to.
    pub source: SheetSourceConfig,
    /// The connection configuration for the Postgres warehouse.
    pub warehouse: PgConnectionConfig,
    /// Run tuning, including status write-back pacing.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl IngestorConfig {
    /// Validates the configuration of all components.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.warehouse.tls.validate()?;
        self.pipeline.validate()?;

        Ok(())
    }
}
