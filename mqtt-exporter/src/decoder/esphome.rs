//! Decoder for ESPHome sensor state topics.
//!
//! ESPHome publishes each sensor on `<node>/sensor/<sensor_id>/state` with a
//! plain number as payload. The sensor id carries both the device name and
//! the measured quantity, e.g. `ficus_soil_conductivity`.

use tracing::{debug, warn};

use super::Decoder;
use crate::metric::{MetricKind, SeriesIdentity};
use crate::store::SharedStore;

const DEVICE_TYPE: &str = "plant";

/// Sensor id suffixes and the quantity they report.
const SUFFIXES: [(&str, MetricKind); 4] = [
    ("_temperature", MetricKind::Temperature),
    ("_soil_conductivity", MetricKind::Fertility),
    ("_illuminance", MetricKind::Illuminance),
    ("_moisture", MetricKind::Moisture),
];

pub struct EsphomeDecoder {
    store: SharedStore,
}

impl EsphomeDecoder {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

/// Split a sensor id into device name and metric kind.
fn classify(sensor_id: &str) -> Option<(&str, MetricKind)> {
    SUFFIXES.iter().find_map(|(suffix, kind)| {
        sensor_id
            .strip_suffix(suffix)
            .map(|device| (device, *kind))
    })
}

impl Decoder for EsphomeDecoder {
    fn name(&self) -> &'static str {
        "esphome"
    }

    fn try_process(&self, topic: &str, payload: &[u8]) -> bool {
        if !topic.contains("/sensor/") || !topic.ends_with("/state") {
            return false;
        }

        let value = match std::str::from_utf8(payload)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
        {
            Some(value) => value,
            None => {
                warn!(
                    topic,
                    raw = %String::from_utf8_lossy(payload),
                    "Failed to parse ESPHome state as a number"
                );
                return true;
            }
        };

        // The shape guarantees at least three segments.
        let sensor_id = topic.rsplit('/').nth(1).unwrap_or_default();

        match classify(sensor_id) {
            Some((device, kind)) => {
                self.store
                    .set(SeriesIdentity::new(kind, DEVICE_TYPE, device), value);
                debug!(topic, device, metric = %kind, value, "Processed ESPHome state");
            }
            None => {
                debug!(sensor = sensor_id, "Unknown ESPHome sensor type");
            }
        }

        true
    }
}
