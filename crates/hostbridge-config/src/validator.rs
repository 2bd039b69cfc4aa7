//! Configuration validation

use crate::Config;
use hostbridge_core::{Error, Result};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_runtime(config)?;
    validate_injection(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_runtime(config: &Config) -> Result<()> {
    let runtime = &config.runtime;

    if runtime.max_operations == 0 {
        tracing::warn!("max_operations is 0, script evaluation is unbounded");
    }

    if runtime.max_expr_depth == 0 || runtime.max_function_expr_depth == 0 {
        return Err(Error::Config("expression depth limits must be > 0".to_string()));
    }

    if runtime.max_call_levels == 0 {
        return Err(Error::Config("max_call_levels must be > 0".to_string()));
    }

    if runtime.max_string_size == 0 {
        return Err(Error::Config("max_string_size must be > 0".to_string()));
    }

    Ok(())
}

fn validate_injection(config: &Config) -> Result<()> {
    let injection = &config.injection;

    let prefix_ok = injection
        .generated_name_prefix
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !prefix_ok || !is_identifier_fragment(&injection.generated_name_prefix) {
        return Err(Error::Config(format!(
            "generated_name_prefix '{}' must start a valid identifier",
            injection.generated_name_prefix
        )));
    }

    if injection.override_suffix.is_empty() || !is_identifier_fragment(&injection.override_suffix) {
        return Err(Error::Config(format!(
            "override_suffix '{}' must be a non-empty identifier fragment",
            injection.override_suffix
        )));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    match config.logging.level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(Error::Config(format!(
            "Invalid log level: {other} (must be trace, debug, info, warn or error)"
        ))),
    }
}

fn is_identifier_fragment(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_call_levels() {
        let mut config = Config::default();
        config.runtime.max_call_levels = 0;

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unbounded_operations_allowed() {
        let mut config = Config::default();
        config.runtime.max_operations = 0;

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_prefix_must_start_identifier() {
        let mut config = Config::default();
        config.injection.generated_name_prefix = "9tmp".to_string();
        assert!(validate_config(&config).is_err());

        config.injection.generated_name_prefix = "tmp-".to_string();
        assert!(validate_config(&config).is_err());

        config.injection.generated_name_prefix = "_tmp".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_suffix() {
        let mut config = Config::default();
        config.injection.override_suffix = String::new();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("override_suffix"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        assert!(validate_config(&config).is_err());
    }
}
