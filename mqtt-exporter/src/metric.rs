//! Metric kinds and series identities.

use std::fmt;

/// A physical quantity exposed as one gauge family.
///
/// The set is closed: every value the store holds belongs to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Temperature,
    Humidity,
    Battery,
    LinkQuality,
    Fertility,
    Illuminance,
    Moisture,
}

impl MetricKind {
    /// Every kind, in exposition order.
    pub const ALL: [MetricKind; 7] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Battery,
        MetricKind::LinkQuality,
        MetricKind::Fertility,
        MetricKind::Illuminance,
        MetricKind::Moisture,
    ];

    /// Metric name, without the exporter prefix.
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature_celsius",
            MetricKind::Humidity => "humidity_percent",
            MetricKind::Battery => "battery_percent",
            MetricKind::LinkQuality => "linkquality",
            MetricKind::Fertility => "fertility",
            MetricKind::Illuminance => "light_lux",
            MetricKind::Moisture => "moisture_percent",
        }
    }

    /// HELP text for the exposition format.
    pub fn help(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "Temperature in degrees Celsius",
            MetricKind::Humidity => "Relative humidity in percent",
            MetricKind::Battery => "Battery level in percent",
            MetricKind::LinkQuality => "Radio link quality (LQI)",
            MetricKind::Fertility => "Soil fertility (conductivity) in µS/cm",
            MetricKind::Illuminance => "Illuminance in lux",
            MetricKind::Moisture => "Soil moisture in percent",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unique identifier for a stored time series.
///
/// Ordering is by kind, then device type, then device name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesIdentity {
    /// The measured quantity.
    pub kind: MetricKind,
    /// Ecosystem the reading came from (e.g. "sensor", "plant").
    pub device_type: String,
    /// The physical device, possibly aliased.
    pub device_name: String,
}

impl SeriesIdentity {
    pub fn new(
        kind: MetricKind,
        device_type: impl Into<String>,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            device_type: device_type.into(),
            device_name: device_name.into(),
        }
    }
}

/// The latest value of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub identity: SeriesIdentity,
    pub value: f64,
}
