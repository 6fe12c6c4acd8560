use std::sync::LazyLock;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions as SqlxConnectOptions, PgSslMode as SqlxSslMode};

use crate::shared::ValidationError;

/// Session options for warehouse reads and writes during an ingestion run.
///
/// Statement and lock timeouts are short because every query touches a handful
/// of rows at most. A stuck session must not outlive the run that opened it.
pub static WAREHOUSE_OPTIONS: LazyLock<PgConnectionOptions> =
    LazyLock::new(|| PgConnectionOptions::session_defaults("crmsync_ingestor"));

/// Postgres session settings applied when a connection is opened.
///
/// Pinning datestyle, encoding and timezone keeps value parsing identical
/// across warehouse installations.
#[derive(Debug, Clone)]
pub struct PgConnectionOptions {
    pub datestyle: String,
    pub intervalstyle: String,
    pub extra_float_digits: i32,
    pub client_encoding: String,
    pub timezone: String,
    pub statement_timeout: u32,
    pub lock_timeout: u32,
    pub idle_in_transaction_session_timeout: u32,
    pub application_name: String,
}

impl PgConnectionOptions {
    /// Standard settings for run-scoped sessions under the given
    /// `application_name`.
    fn session_defaults(application_name: &str) -> Self {
        PgConnectionOptions {
            datestyle: "ISO".to_string(),
            intervalstyle: "postgres".to_string(),
            extra_float_digits: 3,
            client_encoding: "UTF8".to_string(),
            timezone: "UTC".to_string(),
            statement_timeout: 30_000,
            lock_timeout: 5_000,
            idle_in_transaction_session_timeout: 60_000,
            application_name: application_name.to_string(),
        }
    }

    /// Renders the settings as key-value pairs for the driver's `options`
    /// connection parameter.
    pub fn to_key_value_pairs(&self) -> Vec<(String, String)> {
        [
            ("datestyle", self.datestyle.clone()),
            ("intervalstyle", self.intervalstyle.clone()),
            ("extra_float_digits", self.extra_float_digits.to_string()),
            ("client_encoding", self.client_encoding.clone()),
            ("timezone", self.timezone.clone()),
            ("statement_timeout", self.statement_timeout.to_string()),
            ("lock_timeout", self.lock_timeout.to_string()),
            (
                "idle_in_transaction_session_timeout",
                self.idle_in_transaction_session_timeout.to_string(),
            ),
            ("application_name", self.application_name.clone()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
    }
}

/// Connection settings for the Postgres warehouse.
///
/// Deserialized from the `warehouse` section of the configuration files. Does
/// not implement [`Serialize`] so the password cannot leak into serialized
/// forms.
#[derive(Debug, Clone, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Database name to connect to.
    pub name: String,
    pub username: String,
    /// Redacted in debug output.
    pub password: Option<SecretString>,
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: String::new(),
            enabled: false,
        }
    }

    /// Enabled TLS requires trusted root certificates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }

    fn sqlx_ssl_mode(&self) -> SqlxSslMode {
        if self.enabled {
            SqlxSslMode::VerifyFull
        } else {
            SqlxSslMode::Prefer
        }
    }
}

/// Conversion from [`PgConnectionConfig`] into a driver's connect options.
///
/// `without_db` leaves the database unset, which is what administrative work
/// such as creating the database itself needs; `with_db` targets the
/// configured database.
pub trait IntoConnectOptions<Output> {
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> Output;
    fn with_db(&self, options: Option<&PgConnectionOptions>) -> Output;
}

impl IntoConnectOptions<SqlxConnectOptions> for PgConnectionConfig {
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> SqlxConnectOptions {
        let mut connect_options = SqlxConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .ssl_mode(self.tls.sqlx_ssl_mode())
            .ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes());

        if let Some(password) = &self.password {
            connect_options = connect_options.password(password.expose_secret());
        }

        if let Some(session) = options {
            connect_options = connect_options.options(session.to_key_value_pairs());
        }

        connect_options
    }

    fn with_db(&self, options: Option<&PgConnectionOptions>) -> SqlxConnectOptions {
        self.without_db(options).database(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warehouse_options_use_run_scoped_timeouts() {
        assert_eq!(WAREHOUSE_OPTIONS.statement_timeout, 30_000);
        assert_eq!(WAREHOUSE_OPTIONS.lock_timeout, 5_000);
        assert_eq!(
            WAREHOUSE_OPTIONS.idle_in_transaction_session_timeout,
            60_000
        );
        assert_eq!(WAREHOUSE_OPTIONS.application_name, "crmsync_ingestor");
    }

    #[test]
    fn key_value_pairs_carry_session_settings() {
        let pairs = WAREHOUSE_OPTIONS.to_key_value_pairs();

        assert!(pairs.contains(&("timezone".to_string(), "UTC".to_string())));
        assert!(pairs.contains(&("statement_timeout".to_string(), "30000".to_string())));
        assert!(pairs.contains(&(
            "application_name".to_string(),
            "crmsync_ingestor".to_string()
        )));
    }

    #[test]
    fn tls_validation_requires_certs_when_enabled() {
        let tls = TlsConfig {
            trusted_root_certs: "".to_string(),
            enabled: true,
        };
        assert!(matches!(
            tls.validate(),
            Err(ValidationError::MissingTrustedRootCerts)
        ));

        assert!(TlsConfig::disabled().validate().is_ok());
    }
}
