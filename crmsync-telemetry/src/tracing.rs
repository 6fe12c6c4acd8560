use std::sync::Once;

use thiserror::Error;
use tracing::info;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives applied when `RUST_LOG` is not set.
const DEFAULT_FILTER_DIRECTIVES: &str = "info";

/// Ensures the test subscriber is only installed once per process.
static INIT_TEST_TRACING: Once = Once::new();

/// Errors that can occur while installing the global tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingSetupError {
    /// The `log` compatibility bridge was already installed.
    #[error("failed to install the log compatibility bridge: {0}")]
    LogBridge(#[from] tracing_log::log::SetLoggerError),

    /// A global subscriber was already installed.
    #[error("failed to install the global tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global tracing subscriber for a binary.
///
/// Records emitted through the `log` facade (sqlx, reqwest) are bridged into
/// tracing events so that all output goes through one subscriber. The filter
/// is taken from `RUST_LOG` when set and falls back to `info`.
pub fn init_tracing(service_name: &str) -> Result<(), TracingSetupError> {
    LogTracer::init()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER_DIRECTIVES.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!(service = service_name, "tracing initialized");

    Ok(())
}

/// Installs a subscriber that captures output per test.
///
/// Safe to call at the start of every test. Only the first call in a process
/// installs the subscriber, later calls are no-ops.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER_DIRECTIVES.into());

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}
