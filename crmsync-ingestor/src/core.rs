use crmsync::error::IngestError;
use crmsync::pipeline::IngestPipeline;
use crmsync::source::http::HttpSheetSource;
use crmsync::types::Domain;
use crmsync::warehouse::postgres::PostgresWarehouse;
use crmsync_config::shared::{
    IngestorConfig, PgConnectionConfig, PipelineConfig, SheetSourceConfig,
};
use tracing::{debug, info, warn};

use crate::error::IngestorResult;

/// Runs the ingestion pipeline for the given domains.
///
/// Builds the sheet source and warehouse once, then processes the domains
/// strictly in order so their status writes never interleave on the sheet
/// API. A failed domain does not stop the remaining ones; run-fatal errors
/// are aggregated and returned once every domain has had its turn.
pub async fn run_ingestor_with_config(
    config: IngestorConfig,
    domains: Vec<Domain>,
) -> IngestorResult<()> {
    info!("starting ingestor service");

    log_config(&config);

    let source = HttpSheetSource::new(&config.source)?;
    let warehouse = PostgresWarehouse::connect(&config.warehouse).await?;
    let pipeline = IngestPipeline::new(source, warehouse, &config.pipeline);

    let mut failures = Vec::new();
    for domain in domains {
        let tab = tab_name(&config.source, domain);

        if let Err(error) = pipeline.run(domain, tab).await {
            warn!(domain = %domain, error = %error, "domain run failed");
            failures.push(error);
        }
    }

    if !failures.is_empty() {
        return Err(IngestError::from(failures).into());
    }

    info!("ingestor service completed");

    Ok(())
}

/// Returns the sheet tab configured for a domain.
fn tab_name(config: &SheetSourceConfig, domain: Domain) -> &str {
    match domain {
        Domain::Leads => &config.leads_tab,
        Domain::TradingVolume => &config.trading_volume_tab,
    }
}

fn log_config(config: &IngestorConfig) {
    log_source_config(&config.source);
    log_pg_connection_config(&config.warehouse);
    log_pipeline_config(&config.pipeline);
}

fn log_source_config(config: &SheetSourceConfig) {
    debug!(
        base_url = config.base_url,
        spreadsheet_id = config.spreadsheet_id,
        leads_tab = config.leads_tab,
        trading_volume_tab = config.trading_volume_tab,
        status_column = config.status_column,
        "sheet source config"
    );
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    debug!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        "warehouse postgres connection config",
    );
}

fn log_pipeline_config(config: &PipelineConfig) {
    debug!(
        status_write_interval_ms = config.status_write_interval_ms,
        status_write_max_attempts = config.status_write_max_attempts,
        status_write_max_delay_ms = config.status_write_max_delay_ms,
        status_write_backoff_multiplier = config.status_write_backoff_multiplier,
        max_reported_errors = config.max_reported_errors,
        "pipeline config"
    );
}
