//! Configuration types

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Script engine limits
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Object injection naming
    #[serde(default)]
    pub injection: InjectionConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Script engine limits applied to every runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Maximum operations per script evaluation (0 = unlimited)
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    /// Maximum expression nesting depth at global level
    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,

    /// Maximum expression nesting depth inside functions
    #[serde(default = "default_max_function_expr_depth")]
    pub max_function_expr_depth: usize,

    /// Maximum function call nesting
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    /// Maximum string length in bytes
    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,

    /// Maximum array length
    #[serde(default = "default_max_collection_size")]
    pub max_array_size: usize,

    /// Maximum object map size
    #[serde(default = "default_max_collection_size")]
    pub max_map_size: usize,
}

fn default_max_operations() -> u64 {
    100_000
}

fn default_max_expr_depth() -> usize {
    64
}

fn default_max_function_expr_depth() -> usize {
    32
}

fn default_max_call_levels() -> usize {
    64
}

fn default_max_string_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_max_collection_size() -> usize {
    10_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_expr_depth: default_max_expr_depth(),
            max_function_expr_depth: default_max_function_expr_depth(),
            max_call_levels: default_max_call_levels(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_collection_size(),
            max_map_size: default_max_collection_size(),
        }
    }
}

/// Naming used when generating injection scripts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionConfig {
    /// Prefix of generated variable names for unnamed objects
    #[serde(default = "default_generated_name_prefix")]
    pub generated_name_prefix: String,

    /// Suffix of the temporary binding used by injection overrides
    #[serde(default = "default_override_suffix")]
    pub override_suffix: String,
}

fn default_generated_name_prefix() -> String {
    "TEMP".to_string()
}

fn default_override_suffix() -> String {
    "host".to_string()
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            generated_name_prefix: default_generated_name_prefix(),
            override_suffix: default_override_suffix(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.runtime.max_operations, 100_000);
        assert_eq!(config.injection.generated_name_prefix, "TEMP");
        assert_eq!(config.injection.override_suffix, "host");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_partial_section_uses_field_defaults() {
        let config: Config = serde_json::from_str(r#"{"runtime": {"max_operations": 5}}"#).unwrap();
        assert_eq!(config.runtime.max_operations, 5);
        assert_eq!(config.runtime.max_array_size, 10_000);
        assert_eq!(config.injection, InjectionConfig::default());
    }
}
