use crmsync_config::load_config;
use crmsync_config::shared::IngestorConfig;

use crate::error::{IngestorError, IngestorResult};

/// Loads and validates the ingestor configuration.
///
/// Uses the standard configuration loading mechanism from [`crmsync_config`]
/// and validates the resulting [`IngestorConfig`] before returning it.
pub fn load_ingestor_config() -> IngestorResult<IngestorConfig> {
    let config = load_config::<IngestorConfig>().map_err(IngestorError::config)?;
    config.validate().map_err(IngestorError::config)?;

    Ok(config)
}
