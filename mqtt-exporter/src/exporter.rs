//! Snapshot exporter: renders the store as Prometheus gauges on each scrape.

use std::collections::HashSet;
use std::fmt::{self, Write};

use prometheus_client::collector::Collector;
use prometheus_client::encoding::{
    DescriptorEncoder, EncodeLabelValue, EncodeMetric, LabelValueEncoder,
};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::registry::Registry;
use thiserror::Error;

use crate::metric::MetricKind;
use crate::store::SharedStore;

/// Label carrying the device family.
pub const LABEL_TYPE: &str = "type";
/// Label carrying the device display name.
pub const LABEL_NAME: &str = "name";

/// Metric registration errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid metric name '{0}'")]
    InvalidName(String),

    #[error("duplicate metric name '{0}'")]
    DuplicateName(String),
}

/// One exported sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub name: &'static str,
    pub help: &'static str,
    pub device_type: String,
    pub device_name: String,
    pub value: f64,
}

/// Exposes the current store contents, without prefix, on every pull.
#[derive(Debug)]
pub struct SnapshotExporter {
    store: SharedStore,
}

impl SnapshotExporter {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// One record per stored reading, from a single consistent snapshot.
    pub fn records(&self) -> Vec<ExportRecord> {
        self.store
            .snapshot()
            .into_iter()
            .map(|reading| ExportRecord {
                name: reading.identity.kind.name(),
                help: reading.identity.kind.help(),
                device_type: reading.identity.device_type,
                device_name: reading.identity.device_name,
                value: reading.value,
            })
            .collect()
    }
}

impl Collector for SnapshotExporter {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let records = self.records();

        // Records are sorted by kind, so each family is a contiguous run.
        for family in records.chunk_by(|a, b| a.name == b.name) {
            let first = &family[0];
            let mut family_encoder =
                encoder.encode_descriptor(first.name, first.help, None, MetricType::Gauge)?;
            for record in family {
                let labels = [
                    (LABEL_TYPE, EscapedLabelValue(&record.device_type)),
                    (LABEL_NAME, EscapedLabelValue(&record.device_name)),
                ];
                ConstGauge::new(record.value).encode(family_encoder.encode_family(&labels)?)?;
            }
        }

        Ok(())
    }
}

/// Label value written with exposition-format escaping.
struct EscapedLabelValue<'a>(&'a str);

impl EncodeLabelValue for EscapedLabelValue<'_> {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), fmt::Error> {
        encoder.write_str(&escape_label_value(self.0))
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn full_name(prefix: &str, kind: MetricKind) -> String {
    if prefix.is_empty() {
        kind.name().to_string()
    } else {
        format!("{}_{}", prefix, kind.name())
    }
}

/// Check that every metric name produced under `prefix` is valid and unique.
pub fn validate_prefix(prefix: &str) -> Result<(), ExportError> {
    let mut seen = HashSet::with_capacity(MetricKind::ALL.len());
    for kind in MetricKind::ALL {
        let name = full_name(prefix, kind);
        if !is_valid_metric_name(&name) {
            return Err(ExportError::InvalidName(name));
        }
        if !seen.insert(name.clone()) {
            return Err(ExportError::DuplicateName(name));
        }
    }
    Ok(())
}

/// Build the scrape registry with the snapshot exporter registered under
/// `prefix`.
///
/// Every metric name the exporter can produce is checked up front, so a bad
/// prefix fails at startup instead of producing an unscrapable body.
pub fn build_registry(prefix: &str, store: SharedStore) -> Result<Registry, ExportError> {
    validate_prefix(prefix)?;

    let mut registry = if prefix.is_empty() {
        Registry::default()
    } else {
        Registry::with_prefix(prefix)
    };
    registry.register_collector(Box::new(SnapshotExporter::new(store)));
    Ok(registry)
}

/// Encode the registry as OpenMetrics text.
pub fn render(registry: &Registry) -> Result<String, fmt::Error> {
    let mut body = String::new();
    prometheus_client::encoding::text::encode(&mut body, registry)?;
    Ok(body)
}
