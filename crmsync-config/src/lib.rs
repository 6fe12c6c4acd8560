//! Configuration types and loading for the crmsync services.
//!
//! Configuration is assembled from layered sources: a base file, an
//! environment-specific file, and `APP_`-prefixed environment variable
//! overrides. All structs validate themselves before use.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config};
