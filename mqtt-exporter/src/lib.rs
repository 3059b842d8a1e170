//! Prometheus exporter for IoT sensor readings published over MQTT.
//!
//! Messages from zigbee2mqtt, ESPHome and OpenMQTTGateway (Mi Flora) reach
//! the exporter through Zenoh's MQTT bridge. Each message is offered to the
//! decoders in order; the first one that recognises it writes the readings to
//! the store, and every scrape renders the store's current contents.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Zenoh Network  │────>│     Router      │────>│    Decoders     │
//! │ (topic filters) │     │ (ordered, 1st)  │     │ z2m/esph/flora  │
//! └─────────────────┘     └─────────────────┘     └────────┬────────┘
//!                                                          │
//! ┌─────────────────┐     ┌─────────────────┐     ┌────────v────────┐
//! │   Prometheus    │<────│   HTTP Server   │<────│   MetricStore   │
//! │    (scrape)     │     │   (/metrics)    │     │ (last value)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! mqtt-exporter --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod decoder;
pub mod exporter;
pub mod http;
pub mod metric;
pub mod router;
pub mod store;
pub mod subscriber;

pub use config::ExporterConfig;
pub use decoder::{Decoder, DeviceAliases, build_decoders};
pub use exporter::{ExportError, SnapshotExporter, build_registry};
pub use http::HttpServer;
pub use metric::{MetricKind, Reading, SeriesIdentity};
pub use router::{Router, RouterStats, SharedRouter};
pub use store::{MetricStore, SharedStore};
pub use subscriber::TopicSubscriber;
