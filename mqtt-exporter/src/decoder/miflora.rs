//! Decoder for Xiaomi Mi Flora plant sensors relayed by OpenMQTTGateway.
//!
//! The gateway publishes BLE advertisements as JSON objects that carry the
//! sensor's MAC address in `id`. The topic layout depends on the gateway
//! setup, so recognition is based on the payload alone.

use serde::Deserialize;
use tracing::debug;

use super::{Decoder, DeviceAliases};
use crate::metric::{MetricKind, SeriesIdentity};
use crate::store::SharedStore;

const DEVICE_TYPE: &str = "plant";

#[derive(Debug, Deserialize)]
struct Advertisement {
    id: Option<String>,
    #[serde(rename = "tempc")]
    temperature: Option<f64>,
    #[serde(rename = "fer")]
    fertility: Option<f64>,
    #[serde(rename = "lux")]
    light: Option<f64>,
    #[serde(rename = "moi")]
    moisture: Option<f64>,
}

pub struct MifloraDecoder {
    aliases: DeviceAliases,
    store: SharedStore,
}

impl MifloraDecoder {
    pub fn new(aliases: DeviceAliases, store: SharedStore) -> Self {
        Self { aliases, store }
    }
}

impl Decoder for MifloraDecoder {
    fn name(&self) -> &'static str {
        "miflora"
    }

    fn try_process(&self, topic: &str, payload: &[u8]) -> bool {
        let advertisement: Advertisement = match serde_json::from_slice(payload) {
            Ok(advertisement) => advertisement,
            Err(e) => {
                debug!(topic, error = %e, "Not a Mi Flora advertisement");
                return false;
            }
        };

        let Some(id) = advertisement.id.as_deref().filter(|id| !id.is_empty()) else {
            debug!(topic, "Mi Flora advertisement without device id");
            return false;
        };
        let device = self.aliases.resolve(id);

        let fields = [
            (MetricKind::Temperature, advertisement.temperature),
            (MetricKind::Fertility, advertisement.fertility),
            (MetricKind::Illuminance, advertisement.light),
            (MetricKind::Moisture, advertisement.moisture),
        ];
        for (kind, value) in fields {
            if let Some(value) = value {
                self.store
                    .set(SeriesIdentity::new(kind, DEVICE_TYPE, device), value);
            }
        }

        debug!(topic, id, device, "Processed Mi Flora advertisement");
        true
    }
}
