//! Configuration for the MQTT exporter.

use mqtt_exporter_common::{LoggingConfig, TopicFilter, ZenohConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::exporter::validate_prefix;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Topics to subscribe to.
    #[serde(default)]
    pub subscription: SubscriptionConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Per-format decoder settings.
    #[serde(default)]
    pub decoders: DecodersConfig,

    /// Per-device settings, keyed by the raw device identifier.
    #[serde(default)]
    pub devices: HashMap<String, DeviceConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Subscription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// MQTT topic filters (default: `["#"]`, everything).
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
}

fn default_topics() -> Vec<String> {
    vec!["#".to_string()]
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
        }
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Metric name prefix (default: "mqtt").
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_prefix() -> String {
    "mqtt".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            prefix: default_prefix(),
        }
    }
}

/// Decoder settings. Decoders always run in the order zigbee2mqtt, esphome,
/// miflora; disabling one only removes it from that chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodersConfig {
    #[serde(default)]
    pub zigbee2mqtt: Zigbee2MqttConfig,

    #[serde(default)]
    pub esphome: DecoderToggle,

    #[serde(default)]
    pub miflora: DecoderToggle,
}

/// zigbee2mqtt decoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zigbee2MqttConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// zigbee2mqtt's `base_topic` setting (default: "zigbee2mqtt").
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
}

fn default_true() -> bool {
    true
}

fn default_base_topic() -> String {
    "zigbee2mqtt".to_string()
}

impl Default for Zigbee2MqttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_topic: default_base_topic(),
        }
    }
}

/// Settings for decoders that only need an on/off switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderToggle {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DecoderToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Settings for a single device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Name exposed instead of the raw identifier.
    #[serde(default)]
    pub human_readable_name: String,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the configured topic filters.
    pub fn topic_filters(&self) -> Result<Vec<TopicFilter>, ConfigError> {
        self.subscription
            .topics
            .iter()
            .map(|topic| {
                TopicFilter::parse(topic).map_err(|e| ConfigError::Validation(e.to_string()))
            })
            .collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zenoh
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        self.logging
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.subscription.topics.is_empty() {
            return Err(ConfigError::Validation(
                "At least one subscription topic is required".to_string(),
            ));
        }
        self.topic_filters()?;

        // Validate listen address format
        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        // Validate path starts with /
        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        validate_prefix(&self.prometheus.prefix)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let base_topic = &self.decoders.zigbee2mqtt.base_topic;
        if base_topic.is_empty() || base_topic.contains(['#', '+']) {
            return Err(ConfigError::Validation(format!(
                "Invalid zigbee2mqtt base topic: '{}'",
                base_topic
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqtt_exporter_common::LogFormat;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.prometheus.listen, "0.0.0.0:8080");
        assert_eq!(config.prometheus.path, "/metrics");
        assert_eq!(config.prometheus.prefix, "mqtt");
        assert_eq!(config.subscription.topics, vec!["#"]);
        assert!(config.decoders.zigbee2mqtt.enabled);
        assert_eq!(config.decoders.zigbee2mqtt.base_topic, "zigbee2mqtt");
        assert!(config.decoders.esphome.enabled);
        assert!(config.decoders.miflora.enabled);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            zenoh: {
                mode: "client",
                connect: ["tcp/localhost:7447"]
            },
            subscription: {
                topics: ["zigbee2mqtt/#", "esphome/+/+/state"]
            },
            prometheus: {
                listen: "127.0.0.1:9091",
                path: "/prometheus/metrics",
                prefix: "home"
            },
            decoders: {
                zigbee2mqtt: { base_topic: "z2m" },
                miflora: { enabled: false }
            },
            devices: {
                "C4:7C:8D:6A:3E:11": { human_readable_name: "Fern" }
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.zenoh.mode, "client");
        assert_eq!(config.zenoh.connect, vec!["tcp/localhost:7447"]);
        assert_eq!(config.prometheus.listen, "127.0.0.1:9091");
        assert_eq!(config.prometheus.path, "/prometheus/metrics");
        assert_eq!(config.prometheus.prefix, "home");
        assert_eq!(config.decoders.zigbee2mqtt.base_topic, "z2m");
        assert!(config.decoders.zigbee2mqtt.enabled);
        assert!(config.decoders.esphome.enabled);
        assert!(!config.decoders.miflora.enabled);
        assert_eq!(
            config.devices["C4:7C:8D:6A:3E:11"].human_readable_name,
            "Fern"
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);

        let filters = config.topic_filters().unwrap();
        assert_eq!(filters[0].key_expr(), "zigbee2mqtt/**");
        assert_eq!(filters[1].key_expr(), "esphome/*/*/state");
    }

    #[test]
    fn test_validate_invalid_listen() {
        let json = r#"{
            prometheus: { listen: "not-an-address" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let json = r#"{
            prometheus: { path: "no-leading-slash" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must start with /")
        );
    }

    #[test]
    fn test_validate_invalid_topic() {
        let json = r#"{
            subscription: { topics: ["zigbee2mqtt/#/extra"] }
        }"#;

        let err = ExporterConfig::parse(json).unwrap_err();
        assert!(err.to_string().contains("Invalid topic filter"));
    }

    #[test]
    fn test_validate_no_topics() {
        let json = r#"{ subscription: { topics: [] } }"#;
        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_validate_wildcard_base_topic() {
        let json = r#"{ decoders: { zigbee2mqtt: { base_topic: "z2m/#" } } }"#;
        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_validate_invalid_prefix() {
        let json = r#"{ prometheus: { prefix: "home-sensors" } }"#;

        let err = ExporterConfig::parse(json).unwrap_err();
        assert!(err.to_string().contains("invalid metric name"));
    }

    #[test]
    fn test_validate_unknown_log_level() {
        let json = r#"{ logging: { level: "verbose" } }"#;
        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.json5");
        std::fs::write(
            &path,
            r#"{
                // Comments are allowed in JSON5
                devices: { A1: { human_readable_name: "Fern" } },
            }"#,
        )
        .unwrap();

        let config = ExporterConfig::load_from_file(&path).unwrap();
        assert_eq!(config.devices["A1"].human_readable_name, "Fern");
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/exporter.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
