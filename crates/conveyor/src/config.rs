//! Configuration types for streams and operators
//!
//! Both structures are plain serde types with defaults, so an embedding
//! application can keep them in its own configuration files. The engine
//! itself never reads files or environment variables.

use crate::channel::DEFAULT_CHANNEL_CAPACITY;
use crate::error::{PipelineError, Result};
use crate::log::DEFAULT_LOG_CAPACITY;
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Stream-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream name, used in lifecycle logs
    #[serde(default = "default_stream_name")]
    pub name: String,

    /// Capacity of the log bus; events beyond it are dropped
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: default_stream_name(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl StreamConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PipelineError::configuration("stream name cannot be empty"));
        }

        if self.log_capacity == 0 {
            return Err(PipelineError::configuration(
                "log_capacity must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Extract a stream configuration from the root of a figment
    pub fn extract(figment: &Figment) -> Result<Self> {
        figment
            .extract::<Self>()
            .map_err(|e| PipelineError::configuration(e.to_string()))
    }

    /// Extract a stream configuration nested under `key`
    pub fn extract_section(figment: &Figment, key: &str) -> Result<Self> {
        figment
            .extract_inner::<Self>(key)
            .map_err(|e| PipelineError::configuration(e.to_string()))
    }
}

/// Operator-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Operator name, used to scope log events
    pub name: String,

    /// Number of workers sharing the operator's input
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Capacity of the operator's output channel
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl OperatorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            concurrency: default_concurrency(),
            capacity: default_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PipelineError::configuration("operator name cannot be empty"));
        }

        if self.concurrency == 0 {
            return Err(PipelineError::configuration(format!(
                "operator {}: concurrency must be greater than 0",
                self.name
            )));
        }

        if self.capacity == 0 {
            return Err(PipelineError::configuration(format!(
                "operator {}: capacity must be greater than 0",
                self.name
            )));
        }

        Ok(())
    }
}

fn default_stream_name() -> String {
    "unnamed-stream".to_string()
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

fn default_concurrency() -> usize {
    1
}

fn default_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Serialized, Yaml};

    #[test]
    fn test_stream_config_default() {
        let config = StreamConfig::default();
        assert_eq!(config.name, "unnamed-stream");
        assert_eq!(config.log_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stream_config_rejects_empty_name() {
        let config = StreamConfig {
            name: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stream_config_rejects_zero_log_capacity() {
        let config = StreamConfig {
            log_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration { .. })
        ));
    }

    #[test]
    fn test_operator_config_validation() {
        let mut config = OperatorConfig::new("map");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.capacity, 1024);
        assert!(config.validate().is_ok());

        config.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency"));

        config.concurrency = 4;
        config.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extract_section_from_yaml() {
        let yaml = "
pipeline:
  name: access-logs
  log_capacity: 64
";
        let figment = Figment::new().merge(Yaml::string(yaml));
        let config = StreamConfig::extract_section(&figment, "pipeline").unwrap();
        assert_eq!(config.name, "access-logs");
        assert_eq!(config.log_capacity, 64);
    }

    #[test]
    fn test_extract_applies_defaults() {
        let figment = Figment::from(Serialized::defaults(serde_json::json!({ "name": "etl" })));
        let config = StreamConfig::extract(&figment).unwrap();
        assert_eq!(config.name, "etl");
        assert_eq!(config.log_capacity, DEFAULT_LOG_CAPACITY);
    }

    #[test]
    fn test_extract_from_environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CONVEYOR_NAME", "from-env");
            jail.set_env("CONVEYOR_LOG_CAPACITY", "16");

            let figment = Figment::new().merge(figment::providers::Env::prefixed("CONVEYOR_"));
            let config = StreamConfig::extract(&figment).map_err(|e| e.to_string())?;
            assert_eq!(config.name, "from-env");
            assert_eq!(config.log_capacity, 16);
            Ok(())
        });
    }

    #[test]
    fn test_operator_config_serde_defaults() {
        let config: OperatorConfig = serde_json::from_str(r#"{"name":"parse"}"#).unwrap();
        assert_eq!(config, OperatorConfig::new("parse"));
    }
}
