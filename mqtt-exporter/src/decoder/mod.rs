//! Format-specific message decoders.
//!
//! Each decoder recognises one vendor's topic layout or payload schema and
//! turns matching messages into store updates. Decoders are tried in a fixed
//! order by the [`Router`](crate::router::Router); the first one that claims a
//! message ends the search.

use std::collections::HashMap;

use crate::config::{DecodersConfig, DeviceConfig};
use crate::store::SharedStore;

mod esphome;
mod miflora;
mod zigbee2mqtt;

pub use esphome::EsphomeDecoder;
pub use miflora::MifloraDecoder;
pub use zigbee2mqtt::Zigbee2MqttDecoder;

/// A decoder for one message format.
pub trait Decoder: Send + Sync {
    /// Short name used in logs and dispatch results.
    fn name(&self) -> &'static str;

    /// Try to decode a message.
    ///
    /// Returns `false` without side effects when the message is not in this
    /// decoder's format. Returns `true` once the format is recognised, even if
    /// the body turned out to be malformed; such failures are only logged so
    /// that the message is not offered to unrelated decoders.
    fn try_process(&self, topic: &str, payload: &[u8]) -> bool;
}

/// Raw device identifier to display name mapping.
///
/// Read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct DeviceAliases {
    names: HashMap<String, String>,
}

impl DeviceAliases {
    /// Build the alias table from per-device settings. Devices without a
    /// display name are left out.
    pub fn from_config(devices: &HashMap<String, DeviceConfig>) -> Self {
        let names = devices
            .iter()
            .filter(|(_, device)| !device.human_readable_name.is_empty())
            .map(|(id, device)| (id.clone(), device.human_readable_name.clone()))
            .collect();
        Self { names }
    }

    /// Display name for `id`, or `id` itself when no alias is configured.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(String, String)> for DeviceAliases {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Build the enabled decoders in dispatch order: zigbee2mqtt, esphome, miflora.
pub fn build_decoders(
    config: &DecodersConfig,
    aliases: DeviceAliases,
    store: SharedStore,
) -> Vec<Box<dyn Decoder>> {
    let mut decoders: Vec<Box<dyn Decoder>> = Vec::with_capacity(3);

    if config.zigbee2mqtt.enabled {
        decoders.push(Box::new(Zigbee2MqttDecoder::new(
            config.zigbee2mqtt.base_topic.clone(),
            store.clone(),
        )));
    }
    if config.esphome.enabled {
        decoders.push(Box::new(EsphomeDecoder::new(store.clone())));
    }
    if config.miflora.enabled {
        decoders.push(Box::new(MifloraDecoder::new(aliases, store)));
    }

    decoders
}
