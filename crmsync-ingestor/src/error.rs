use crmsync::error::IngestError;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

pub type IngestorResult<T> = Result<T, IngestorError>;

/// Top-level error for the ingestor binary.
///
/// Pipeline failures arrive as [`IngestError`] and carry their own backtrace;
/// the infrastructure variants capture one at construction.
#[derive(Debug)]
pub enum IngestorError {
    /// The pipeline reported a failed run.
    Ingest(IngestError),
    /// Configuration could not be loaded or validated.
    Config {
        source: Box<dyn Error + Send + Sync>,
        trace: Backtrace,
    },
    /// Runtime or filesystem failure outside the pipeline.
    Io {
        source: std::io::Error,
        trace: Backtrace,
    },
}

impl IngestorError {
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        IngestorError::Config {
            source: Box::new(err),
            trace: Backtrace::capture(),
        }
    }

    /// Short category label used in the terminal report.
    pub fn category(&self) -> &'static str {
        match self {
            IngestorError::Ingest(_) => "ingest error",
            IngestorError::Config { .. } => "configuration error",
            IngestorError::Io { .. } => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            IngestorError::Ingest(err) => err.backtrace(),
            IngestorError::Config { trace, .. } => Some(trace),
            IngestorError::Io { trace, .. } => Some(trace),
        }
    }

    /// Multi-line report printed to stderr when the process exits with a
    /// failure.
    pub fn render_report(&self) -> String {
        let mut report = format!(
            "ingestor failed\ncategory: {}\nerror: {}\n",
            self.category(),
            self
        );

        // An aggregate pipeline error already lists each underlying failure
        // in its own rendering.
        if !self.is_aggregate() {
            for (position, cause) in CauseChain::new(self).enumerate() {
                report.push_str(&format!("cause {}: {cause}\n", position + 1));
            }
        }

        if backtraces_enabled()
            && let Some(trace) = self.backtrace()
        {
            report.push_str("backtrace:\n");
            report.push_str(&trace.to_string());
            if !report.ends_with('\n') {
                report.push('\n');
            }
        }

        report
    }

    fn is_aggregate(&self) -> bool {
        matches!(self, IngestorError::Ingest(err) if err.kinds().len() > 1)
    }
}

impl fmt::Display for IngestorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestorError::Ingest(err) => fmt::Display::fmt(err, f),
            IngestorError::Config { source, .. } => write!(f, "configuration error: {source}"),
            IngestorError::Io { source, .. } => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for IngestorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IngestorError::Ingest(err) => err.source(),
            IngestorError::Config { source, .. } => Some(source.as_ref()),
            IngestorError::Io { source, .. } => Some(source),
        }
    }
}

impl From<IngestError> for IngestorError {
    fn from(err: IngestError) -> Self {
        IngestorError::Ingest(err)
    }
}

impl From<std::io::Error> for IngestorError {
    fn from(err: std::io::Error) -> Self {
        IngestorError::Io {
            source: err,
            trace: Backtrace::capture(),
        }
    }
}

/// Walks the `source` chain below an error, outermost cause first.
struct CauseChain<'a> {
    next: Option<&'a (dyn Error + 'static)>,
}

impl<'a> CauseChain<'a> {
    fn new(error: &'a IngestorError) -> Self {
        CauseChain {
            next: error.source(),
        }
    }
}

impl<'a> Iterator for CauseChain<'a> {
    type Item = &'a (dyn Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.source();
        Some(current)
    }
}

/// Backtraces are printed only when `RUST_BACKTRACE` asks for them.
fn backtraces_enabled() -> bool {
    std::env::var("RUST_BACKTRACE")
        .map(|value| value == "1" || value == "full")
        .unwrap_or(false)
}
