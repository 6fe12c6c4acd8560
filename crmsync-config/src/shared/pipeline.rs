use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Tuning knobs for a single ingestion run.
///
/// The status write settings govern how fast outcomes are written back to the
/// spreadsheet. The source API enforces a per-minute write quota, so the
/// defaults stay just above one write per second.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause between consecutive status write-backs.
    ///
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 1100ms
    #[serde(default = "default_status_write_interval_ms")]
    pub status_write_interval_ms: u64,

    /// Maximum attempts for a single status write-back before it is skipped.
    ///
    /// Default: 3
    #[serde(default = "default_status_write_max_attempts")]
    pub status_write_max_attempts: u32,

    /// Maximum delay between retries of a failed status write-back.
    ///
    /// The backoff algorithm will not exceed this delay.
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 10000ms (10 seconds)
    #[serde(default = "default_status_write_max_delay_ms")]
    pub status_write_max_delay_ms: u64,

    /// Multiplier for exponential backoff between status write retries.
    ///
    /// After each failed attempt, the delay is multiplied by this value.
    /// Must be >= 1.0.
    /// Default: 2.0
    #[serde(default = "default_status_write_backoff_multiplier")]
    pub status_write_backoff_multiplier: f64,

    /// Maximum number of per-row errors quoted in the run summary log.
    ///
    /// Every error is still logged individually at warn level.
    /// Default: 5
    #[serde(default = "default_max_reported_errors")]
    pub max_reported_errors: usize,
}

fn default_status_write_interval_ms() -> u64 {
    1100
}

fn default_status_write_max_attempts() -> u32 {
    3
}

fn default_status_write_max_delay_ms() -> u64 {
    10_000
}

fn default_status_write_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_reported_errors() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            status_write_interval_ms: default_status_write_interval_ms(),
            status_write_max_attempts: default_status_write_max_attempts(),
            status_write_max_delay_ms: default_status_write_max_delay_ms(),
            status_write_backoff_multiplier: default_status_write_backoff_multiplier(),
            max_reported_errors: default_max_reported_errors(),
        }
    }
}

impl PipelineConfig {
    /// Returns the pause between status write-backs as a Duration.
    pub fn status_write_interval(&self) -> Duration {
        Duration::from_millis(self.status_write_interval_ms)
    }

    /// Returns the maximum retry delay as a Duration.
    pub fn status_write_max_delay(&self) -> Duration {
        Duration::from_millis(self.status_write_max_delay_ms)
    }

    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.status_write_interval_ms == 0 {
            return Err(ValidationError::StatusWriteIntervalZero);
        }

        if self.status_write_max_attempts == 0 {
            return Err(ValidationError::StatusWriteMaxAttemptsZero);
        }

        if self.status_write_backoff_multiplier < 1.0 {
            return Err(ValidationError::StatusWriteBackoffMultiplierTooSmall);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pacing_stays_under_write_quota() {
        let config = PipelineConfig::default();

        assert_eq!(config.status_write_interval_ms, 1100);
        assert_eq!(config.status_write_max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_fails_validation() {
        let config = PipelineConfig {
            status_write_interval_ms: 0,
            ..PipelineConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::StatusWriteIntervalZero)
        ));
    }

    #[test]
    fn shrinking_backoff_fails_validation() {
        let config = PipelineConfig {
            status_write_backoff_multiplier: 0.5,
            ..PipelineConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::StatusWriteBackoffMultiplierTooSmall)
        ));
    }
}
