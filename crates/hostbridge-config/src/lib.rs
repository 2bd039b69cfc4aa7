//! # Hostbridge Configuration
//!
//! Settings for script runtimes, object injection naming and logging.
//!
//! Configuration files may be YAML, TOML or JSON (detected by extension),
//! may reference environment variables as `${VAR}` or `${VAR:-default}`, and
//! are validated after loading. Every field has a default, so an empty file
//! is a valid configuration.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod loader;
pub mod logging;
pub mod types;
pub mod validator;

pub use loader::{load_config, load_from_file, load_from_str, ConfigFormat};
pub use logging::init_tracing;
pub use types::{Config, InjectionConfig, LogFormat, LoggingConfig, RuntimeConfig};
pub use validator::validate_config;

use hostbridge_core::Result;
use std::path::Path;

/// Load and validate the configuration at `path`, then install the tracing
/// subscriber it describes.
///
/// A subscriber that is already installed is kept; the configuration is
/// still returned.
pub fn bootstrap<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = load_config(path)?;
    if let Err(err) = init_tracing(&config.logging) {
        tracing::debug!(error = %err, "Keeping existing tracing subscriber");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bootstrap_returns_validated_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"injection": {{"override_suffix": "shadow"}}}}"#).unwrap();

        let config = bootstrap(file.path()).unwrap();
        assert_eq!(config.injection.override_suffix, "shadow");

        // A second bootstrap finds the subscriber already installed
        assert!(bootstrap(file.path()).is_ok());
    }

    #[test]
    fn test_bootstrap_rejects_invalid_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[runtime]\nmax_call_levels = 0").unwrap();

        assert!(bootstrap(file.path()).is_err());
    }
}
