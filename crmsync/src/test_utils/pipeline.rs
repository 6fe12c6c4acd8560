//! Pipeline assembly against in-memory fixtures.

use crmsync_config::shared::PipelineConfig;

use crate::pipeline::IngestPipeline;
use crate::source::memory::MemorySheet;
use crate::warehouse::memory::MemoryWarehouse;

/// Pacing tuned so tests spend no meaningful time sleeping.
pub fn fast_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        status_write_interval_ms: 1,
        status_write_max_attempts: 3,
        status_write_max_delay_ms: 5,
        status_write_backoff_multiplier: 2.0,
        max_reported_errors: 5,
    }
}

/// Builds a pipeline over the given fixtures with test pacing.
pub fn memory_pipeline(
    sheet: &MemorySheet,
    warehouse: &MemoryWarehouse,
) -> IngestPipeline<MemorySheet, MemoryWarehouse> {
    IngestPipeline::new(sheet.clone(), warehouse.clone(), &fast_pipeline_config())
}
