use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Pause between status write-backs cannot be zero.
    #[error("`status_write_interval_ms` cannot be zero")]
    StatusWriteIntervalZero,
    /// Maximum attempts for a single status write-back cannot be zero.
    #[error("`status_write_max_attempts` cannot be zero")]
    StatusWriteMaxAttemptsZero,
    /// Backoff multiplier below 1.0 would shrink delays between retries.
    #[error("`status_write_backoff_multiplier` must be at least 1.0")]
    StatusWriteBackoffMultiplierTooSmall,
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// A required spreadsheet source field is empty.
    #[error("Invalid source config: `{0}` cannot be empty")]
    EmptySourceField(&'static str),
}
