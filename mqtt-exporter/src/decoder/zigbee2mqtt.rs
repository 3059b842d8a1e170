//! Decoder for zigbee2mqtt device state messages.
//!
//! zigbee2mqtt publishes the state of each paired device as a flat JSON
//! object on `<base_topic>/<friendly_name>`. Bridge messages live under
//! `<base_topic>/bridge/...` and are not device readings.

use serde::Deserialize;
use tracing::{debug, warn};

use super::Decoder;
use crate::metric::{MetricKind, SeriesIdentity};
use crate::store::SharedStore;

const DEVICE_TYPE: &str = "sensor";
const BRIDGE_SEGMENT: &str = "bridge";

/// Fields are optional: a device only reports what it measures, and 0 is a
/// valid reading.
#[derive(Debug, Deserialize)]
struct DeviceState {
    battery: Option<f64>,
    humidity: Option<f64>,
    linkquality: Option<f64>,
    temperature: Option<f64>,
}

pub struct Zigbee2MqttDecoder {
    base_topic: String,
    store: SharedStore,
}

impl Zigbee2MqttDecoder {
    pub fn new(base_topic: impl Into<String>, store: SharedStore) -> Self {
        Self {
            base_topic: base_topic.into(),
            store,
        }
    }

    /// Device name for a topic under the base topic, skipping bridge topics.
    fn device_name<'t>(&self, topic: &'t str) -> Option<&'t str> {
        let rest = topic
            .strip_prefix(self.base_topic.as_str())?
            .strip_prefix('/')?;
        let device = rest.split('/').next()?;

        if device.is_empty() || device == BRIDGE_SEGMENT {
            return None;
        }
        Some(device)
    }
}

impl Decoder for Zigbee2MqttDecoder {
    fn name(&self) -> &'static str {
        "zigbee2mqtt"
    }

    fn try_process(&self, topic: &str, payload: &[u8]) -> bool {
        let Some(device) = self.device_name(topic) else {
            return false;
        };

        let state: DeviceState = match serde_json::from_slice(payload) {
            Ok(state) => state,
            Err(e) => {
                warn!(topic, error = %e, "Failed to parse zigbee2mqtt message");
                return true;
            }
        };

        let fields = [
            (MetricKind::Battery, state.battery),
            (MetricKind::Humidity, state.humidity),
            (MetricKind::LinkQuality, state.linkquality),
            (MetricKind::Temperature, state.temperature),
        ];
        for (kind, value) in fields {
            if let Some(value) = value {
                self.store
                    .set(SeriesIdentity::new(kind, DEVICE_TYPE, device), value);
            }
        }

        debug!(topic, device, ?state, "Processed zigbee2mqtt message");
        true
    }
}
