//! Error and result types for ingestion runs.
//!
//! [`IngestError`] classifies every failure with an [`ErrorKind`], captures the
//! callsite and a backtrace, and can aggregate the failures of a run that
//! touches several domains into one error. The kind decides whether a failure
//! stays scoped to a row or aborts the run.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::conversions::CellError;

/// Result alias used throughout the pipeline.
pub type IngestResult<T> = Result<T, IngestError>;

/// Error raised by ingestion operations.
///
/// Carries either one diagnostic or a group of aggregated errors. Construction
/// goes through the `From` impls below or the `ingest_error!` and `bail!`
/// macros.
#[derive(Debug, Clone)]
pub struct IngestError {
    repr: Repr,
}

#[derive(Debug, Clone)]
enum Repr {
    One(Diagnostic),
    /// Failures gathered from a run covering several domains.
    Group {
        members: Vec<IngestError>,
        location: &'static Location<'static>,
    },
}

/// Everything captured about a single failure.
#[derive(Debug, Clone)]
struct Diagnostic {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Failure categories for ingestion operations.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source errors
    SourceConnectionFailed,
    SourceSchemaInvalid,
    SourceRateLimited,
    SourceReadFailed,
    StatusWriteFailed,

    // Warehouse errors
    WarehouseConnectionFailed,
    WarehouseQueryFailed,

    // Data and transformation errors
    ValidationFailed,
    ConversionFailed,

    // Configuration errors
    ConfigInvalid,

    // State and workflow errors
    InvalidState,

    // IO and serialization errors
    IoError,
    SerializationError,
    DeserializationError,

    // Unknown / uncategorized
    Unknown,
}

impl ErrorKind {
    /// Returns true when an error of this kind must abort the whole run.
    ///
    /// Row-scoped kinds continue the run with the affected row excluded.
    /// Run-scoped kinds stop processing, leaving untouched rows PENDING in
    /// the source so that a later run picks them up again.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::SourceConnectionFailed
                | ErrorKind::SourceSchemaInvalid
                | ErrorKind::SourceReadFailed
                | ErrorKind::WarehouseConnectionFailed
        )
    }

    /// Returns true when a failed status write of this kind is worth retrying.
    ///
    /// Rate limiting and transient transport loss back off and retry. Other
    /// kinds fail the individual write immediately so it gets skipped.
    pub fn is_status_write_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::SourceRateLimited | ErrorKind::SourceConnectionFailed
        )
    }
}

impl IngestError {
    /// Kind of this error, or of the first member for a group.
    ///
    /// An empty group reports [`ErrorKind::Unknown`].
    pub fn kind(&self) -> ErrorKind {
        match &self.repr {
            Repr::One(diagnostic) => diagnostic.kind,
            Repr::Group { members, .. } => match members.first() {
                Some(first) => first.kind(),
                None => ErrorKind::Unknown,
            },
        }
    }

    /// Every kind present in this error, flattening nested groups.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        let mut kinds = Vec::new();
        self.collect_kinds(&mut kinds);
        kinds
    }

    fn collect_kinds(&self, kinds: &mut Vec<ErrorKind>) {
        match &self.repr {
            Repr::One(diagnostic) => kinds.push(diagnostic.kind),
            Repr::Group { members, .. } => {
                for member in members {
                    member.collect_kinds(kinds);
                }
            }
        }
    }

    /// Static description, taken from the first member for a group.
    pub fn description(&self) -> &str {
        match &self.repr {
            Repr::One(diagnostic) => diagnostic.description.as_ref(),
            Repr::Group { members, .. } => members
                .first()
                .map_or("Multiple errors occurred", |first| first.description()),
        }
    }

    /// Dynamic detail, if any was attached.
    ///
    /// A group reports the first member that carries one.
    pub fn detail(&self) -> Option<&str> {
        match &self.repr {
            Repr::One(diagnostic) => diagnostic.detail.as_deref(),
            Repr::Group { members, .. } => members.iter().find_map(|member| member.detail()),
        }
    }

    /// Backtrace captured when the error was constructed.
    ///
    /// Groups have no backtrace of their own.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match &self.repr {
            Repr::One(diagnostic) => Some(diagnostic.backtrace.as_ref()),
            Repr::Group { .. } => None,
        }
    }

    /// Callsite that constructed the error.
    pub fn location(&self) -> &'static Location<'static> {
        match &self.repr {
            Repr::One(diagnostic) => diagnostic.location,
            Repr::Group { location, .. } => location,
        }
    }

    /// Attaches the originating error, exposed later via
    /// [`error::Error::source`].
    ///
    /// A group keeps forwarding its first member as the source, so calling
    /// this on one has no effect.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let Repr::One(diagnostic) = &mut self.repr {
            diagnostic.source = Some(Arc::new(source));
        }
        self
    }

    #[track_caller]
    fn from_parts(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        IngestError {
            repr: Repr::One(Diagnostic {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }

    /// Wraps an external error, keeping it as the source and copying its
    /// message into the detail.
    #[track_caller]
    fn wrap<E>(kind: ErrorKind, description: &'static str, err: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        let detail = err.to_string();
        Self::from_parts(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl PartialEq for IngestError {
    /// Compares by kind for single errors and member-wise for groups.
    fn eq(&self, other: &IngestError) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::One(a), Repr::One(b)) => a.kind == b.kind,
            (Repr::Group { members: a, .. }, Repr::Group { members: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::One(diagnostic) => {
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    diagnostic.kind,
                    diagnostic.description,
                    diagnostic.location.file(),
                    diagnostic.location.line(),
                    diagnostic.location.column()
                )?;

                if let Some(detail) = diagnostic.detail.as_deref() {
                    write_block(f, "Detail", detail, 1)?;
                }

                let backtrace = diagnostic.backtrace.to_string();
                if !backtrace.trim().is_empty() {
                    write_block(f, "Backtrace", &backtrace, 1)?;
                }

                Ok(())
            }
            Repr::Group { members, location } => {
                let count = members.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if members.is_empty() {
                    return write!(f, "\n  (no inner errors provided)");
                }

                for (index, member) in members.iter().enumerate() {
                    let rendered = member.to_string();
                    let mut lines = rendered.lines();
                    match lines.next() {
                        Some(first) => write!(f, "\n  {}. {first}", index + 1)?,
                        None => write!(f, "\n  {}.", index + 1)?,
                    }
                    for line in lines {
                        if line.trim().is_empty() {
                            write!(f, "\n     ")?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

/// Writes a labeled block with every line indented under the label.
fn write_block(f: &mut fmt::Formatter<'_>, label: &str, text: &str, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);

    if text.trim().is_empty() {
        return write!(f, "\n{pad}{label}: <empty>");
    }

    write!(f, "\n{pad}{label}:")?;
    for line in text.lines() {
        if line.trim().is_empty() {
            write!(f, "\n{pad}  ")?;
        } else {
            write!(f, "\n{pad}  {line}")?;
        }
    }

    Ok(())
}

impl error::Error for IngestError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            Repr::One(diagnostic) => diagnostic
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            // A group forwards its first member as the source.
            Repr::Group { members, .. } => members
                .first()
                .map(|member| member as &(dyn error::Error + 'static)),
        }
    }
}

impl From<(ErrorKind, &'static str)> for IngestError {
    /// Builds an error from a kind and a static description.
    #[track_caller]
    fn from((kind, description): (ErrorKind, &'static str)) -> IngestError {
        IngestError::from_parts(kind, Cow::Borrowed(description), None, None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for IngestError
where
    D: Into<Cow<'static, str>>,
{
    /// Builds an error from a kind, a static description and dynamic detail.
    #[track_caller]
    fn from((kind, description, detail): (ErrorKind, &'static str, D)) -> IngestError {
        IngestError::from_parts(kind, Cow::Borrowed(description), Some(detail.into()), None)
    }
}

impl<E> From<Vec<E>> for IngestError
where
    E: Into<IngestError>,
{
    /// Aggregates a batch of errors.
    ///
    /// A single-element batch collapses into the error itself instead of a
    /// one-member group.
    #[track_caller]
    fn from(errors: Vec<E>) -> IngestError {
        let location = Location::caller();

        let mut members: Vec<IngestError> = errors.into_iter().map(Into::into).collect();
        if members.len() == 1 {
            return members.swap_remove(0);
        }

        IngestError {
            repr: Repr::Group { members, location },
        }
    }
}

impl From<std::io::Error> for IngestError {
    #[track_caller]
    fn from(err: std::io::Error) -> IngestError {
        IngestError::wrap(ErrorKind::IoError, "I/O operation failed", err)
    }
}

impl From<serde_json::Error> for IngestError {
    /// I/O failures keep their kind; syntax, data and eof failures surface
    /// as deserialization errors.
    #[track_caller]
    fn from(err: serde_json::Error) -> IngestError {
        let (kind, description) = if matches!(err.classify(), serde_json::error::Category::Io) {
            (ErrorKind::IoError, "JSON I/O operation failed")
        } else {
            (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            )
        };
        IngestError::wrap(kind, description, err)
    }
}

impl From<chrono::ParseError> for IngestError {
    #[track_caller]
    fn from(err: chrono::ParseError) -> IngestError {
        IngestError::wrap(ErrorKind::ConversionFailed, "Date parsing failed", err)
    }
}

impl From<CellError> for IngestError {
    #[track_caller]
    fn from(err: CellError) -> IngestError {
        IngestError::wrap(ErrorKind::ConversionFailed, "Cell parsing failed", err)
    }
}

impl From<sqlx::Error> for IngestError {
    /// Transport and pool failures count as connection loss, which is
    /// run-fatal; everything else stays scoped to the failing statement.
    #[track_caller]
    fn from(err: sqlx::Error) -> IngestError {
        let kind = match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                ErrorKind::WarehouseConnectionFailed
            }
            _ => ErrorKind::WarehouseQueryFailed,
        };
        IngestError::wrap(kind, "Warehouse operation failed", err)
    }
}

impl From<reqwest::Error> for IngestError {
    /// Connect and timeout failures abort the run, HTTP 429 marks rate
    /// limiting, body decode failures surface as deserialization errors.
    #[track_caller]
    fn from(err: reqwest::Error) -> IngestError {
        let kind = if err.is_connect() || err.is_timeout() {
            ErrorKind::SourceConnectionFailed
        } else if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            ErrorKind::SourceRateLimited
        } else if err.is_decode() {
            ErrorKind::DeserializationError
        } else {
            ErrorKind::SourceReadFailed
        };
        IngestError::wrap(kind, "Sheet API request failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_fatal_kinds_cover_transport_and_schema_loss() {
        assert!(ErrorKind::SourceConnectionFailed.is_run_fatal());
        assert!(ErrorKind::SourceSchemaInvalid.is_run_fatal());
        assert!(ErrorKind::SourceReadFailed.is_run_fatal());
        assert!(ErrorKind::WarehouseConnectionFailed.is_run_fatal());

        assert!(!ErrorKind::WarehouseQueryFailed.is_run_fatal());
        assert!(!ErrorKind::ValidationFailed.is_run_fatal());
        assert!(!ErrorKind::StatusWriteFailed.is_run_fatal());
    }

    #[test]
    fn singleton_aggregation_unwraps_to_inner_error() {
        let inner: IngestError = (ErrorKind::WarehouseQueryFailed, "insert failed").into();
        let aggregated: IngestError = vec![inner.clone()].into();

        assert_eq!(aggregated, inner);
        assert_eq!(aggregated.kinds(), vec![ErrorKind::WarehouseQueryFailed]);
    }

    #[test]
    fn aggregated_errors_report_all_kinds() {
        let first: IngestError = (ErrorKind::WarehouseQueryFailed, "insert failed").into();
        let second: IngestError = (ErrorKind::StatusWriteFailed, "write-back failed").into();
        let aggregated: IngestError = vec![first, second].into();

        assert_eq!(
            aggregated.kinds(),
            vec![
                ErrorKind::WarehouseQueryFailed,
                ErrorKind::StatusWriteFailed
            ]
        );
        assert_eq!(aggregated.kind(), ErrorKind::WarehouseQueryFailed);
    }

    #[test]
    fn wrapped_errors_keep_their_source() {
        let io_err = std::io::Error::other("disk detached");
        let err: IngestError = io_err.into();

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.detail(), Some("disk detached"));
        assert!(error::Error::source(&err).is_some());
    }
}
