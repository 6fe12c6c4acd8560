use std::{
    borrow::Cow,
    io,
    path::{Path, PathBuf},
};

use rust_cli_config as config;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding the configuration files, relative to the working
/// directory the service is started from.
const CONFIG_DIR: &str = "configuration";

/// File extensions probed for each layer, in order of preference.
const FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix marking environment variables as configuration overrides.
const ENV_VAR_PREFIX: &str = "APP";

/// Separator between the prefix and the first key segment.
const ENV_VAR_PREFIX_SEPARATOR: &str = "_";

/// Separator between nested key segments in an override variable.
const NESTED_KEY_SEPARATOR: &str = "__";

/// One file layer of the configuration stack.
///
/// The stack is always `base` followed by the current environment's file;
/// later layers override earlier ones key by key.
struct ConfigLayer {
    stem: Cow<'static, str>,
    description: Cow<'static, str>,
}

impl ConfigLayer {
    fn base() -> ConfigLayer {
        ConfigLayer {
            stem: Cow::Borrowed("base"),
            description: Cow::Borrowed("base configuration"),
        }
    }

    fn for_environment(environment: Environment) -> ConfigLayer {
        ConfigLayer {
            stem: Cow::Owned(environment.to_string()),
            description: Cow::Owned(format!("{environment} environment configuration")),
        }
    }

    /// Returns the first existing file for this layer.
    ///
    /// Probes every supported extension so `base.yml` works as well as
    /// `base.yaml`; the error lists everything that was tried.
    fn locate(&self, directory: &Path) -> Result<PathBuf, LoadConfigError> {
        let candidates: Vec<PathBuf> = FILE_EXTENSIONS
            .iter()
            .map(|extension| directory.join(format!("{}.{extension}", self.stem)))
            .collect();

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(LoadConfigError::FileMissing {
                layer: self.description.clone().into_owned(),
                attempted: render_paths(&candidates),
            }),
        }
    }
}

/// Errors surfaced while assembling the configuration stack.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The working directory could not be resolved.
    #[error("could not resolve the working directory: {0}")]
    Workdir(#[source] io::Error),

    /// The `configuration` directory is absent from the working directory.
    #[error("configuration directory `{0}` does not exist")]
    DirectoryMissing(PathBuf),

    /// A layer has no file under any supported extension.
    #[error("could not locate {layer}; attempted: {attempted}")]
    FileMissing { layer: String, attempted: String },

    /// A layer's file exists but cannot be parsed.
    #[error("could not parse {layer} at `{path}`: {source}")]
    FileInvalid {
        layer: String,
        path: PathBuf,
        source: config::ConfigError,
    },

    /// The runtime environment could not be determined from
    /// `APP_ENVIRONMENT`.
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    /// The merged stack failed to build.
    #[error("could not assemble the configuration stack: {0}")]
    Assemble(#[source] config::ConfigError),

    /// The merged stack does not deserialize into the requested type.
    #[error("configuration does not match the expected shape: {0}")]
    Deserialize(#[source] config::ConfigError),
}

/// Loads the layered configuration for the current environment.
///
/// The stack is `configuration/base.*`, then `configuration/<env>.*`, then
/// `APP_`-prefixed environment variable overrides, where nested keys are
/// separated with double underscores (`APP_WAREHOUSE__HOST`). Later layers
/// win. Which `<env>` file is read comes from `APP_ENVIRONMENT`.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let directory = std::env::current_dir()
        .map_err(LoadConfigError::Workdir)?
        .join(CONFIG_DIR);
    if !directory.is_dir() {
        return Err(LoadConfigError::DirectoryMissing(directory));
    }

    let environment = Environment::load().map_err(LoadConfigError::Environment)?;

    let mut builder = config::Config::builder();
    for layer in [
        ConfigLayer::base(),
        ConfigLayer::for_environment(environment),
    ] {
        let path = layer.locate(&directory)?;
        builder = builder.add_source(config::File::from(path.clone()));

        // Each file is parsed on its own so a syntax error names the file
        // that caused it rather than the merged stack.
        if let Err(source) = builder.clone().build() {
            return Err(LoadConfigError::FileInvalid {
                layer: layer.description.into_owned(),
                path,
                source,
            });
        }
    }

    let overrides = config::Environment::with_prefix(ENV_VAR_PREFIX)
        .prefix_separator(ENV_VAR_PREFIX_SEPARATOR)
        .separator(NESTED_KEY_SEPARATOR);

    builder
        .add_source(overrides)
        .build()
        .map_err(LoadConfigError::Assemble)?
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialize)
}

fn render_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
