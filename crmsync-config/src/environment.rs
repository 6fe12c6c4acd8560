use std::fmt;
use std::io;
use std::str::FromStr;

/// Environment variable consulted to pick the runtime environment.
const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";

/// Runtime environment the service was started in.
///
/// Decides which configuration file is layered on top of `base`, so `dev`
/// reads `configuration/dev.*` and `prod` reads `configuration/prod.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    /// Reads the environment from `APP_ENVIRONMENT`, defaulting to dev when
    /// the variable is unset.
    pub fn load() -> Result<Environment, io::Error> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Environment::Dev),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = io::Error;

    /// Parses an environment name case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(io::Error::other(format!(
                "unknown environment `{other}`, expected `dev` or `prod`"
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("Dev".parse::<Environment>().unwrap(), Environment::Dev);
    }

    #[test]
    fn environment_rejects_unknown_names() {
        assert!("staging".parse::<Environment>().is_err());
    }
}
