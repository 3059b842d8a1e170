//! Thread-safe store holding the latest value of every series.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::metric::{MetricKind, Reading, SeriesIdentity};

#[derive(Debug, Default)]
struct Inner {
    series: HashMap<SeriesIdentity, f64>,
    kinds: BTreeSet<MetricKind>,
}

/// Last-write-wins store keyed by [`SeriesIdentity`].
///
/// Entries are created on first update and never removed; a device that
/// stops reporting keeps exposing its last value.
#[derive(Debug, Default)]
pub struct MetricStore {
    inner: RwLock<Inner>,
}

/// Create a shareable store handle.
pub type SharedStore = Arc<MetricStore>;

impl MetricStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value of a series.
    ///
    /// NaN and infinities are stored as-is.
    pub fn set(&self, identity: SeriesIdentity, value: f64) {
        trace!(
            metric = %identity.kind,
            device_type = %identity.device_type,
            device = %identity.device_name,
            value,
            "Updating series"
        );

        let mut inner = self.inner.write();
        inner.kinds.insert(identity.kind);
        inner.series.insert(identity, value);
    }

    /// Copy every stored reading, sorted by identity.
    pub fn snapshot(&self) -> Vec<Reading> {
        let mut readings: Vec<Reading> = {
            let inner = self.inner.read();
            inner
                .series
                .iter()
                .map(|(identity, value)| Reading {
                    identity: identity.clone(),
                    value: *value,
                })
                .collect()
        };

        readings.sort_by(|a, b| a.identity.cmp(&b.identity));
        readings
    }

    /// Kinds targeted by at least one update, in enumeration order.
    pub fn kinds(&self) -> Vec<MetricKind> {
        self.inner.read().kinds.iter().copied().collect()
    }

    /// Number of stored series.
    pub fn len(&self) -> usize {
        self.inner.read().series.len()
    }

    /// Whether no series has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn id(kind: MetricKind, device_type: &str, device_name: &str) -> SeriesIdentity {
        SeriesIdentity::new(kind, device_type, device_name)
    }

    #[test]
    fn test_empty_snapshot() {
        let store = MetricStore::new();
        assert!(store.snapshot().is_empty());
        assert!(store.kinds().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let store = MetricStore::new();
        let series = id(MetricKind::Temperature, "sensor", "kitchen");

        store.set(series.clone(), 19.0);
        store.set(series.clone(), 20.5);
        store.set(series.clone(), 21.0);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].identity, series);
        assert_eq!(snapshot[0].value, 21.0);
    }

    #[test]
    fn test_one_reading_per_identity() {
        let store = MetricStore::new();
        let updates = [
            (id(MetricKind::Temperature, "sensor", "a"), 1.0),
            (id(MetricKind::Temperature, "plant", "a"), 2.0),
            (id(MetricKind::Humidity, "sensor", "a"), 3.0),
            (id(MetricKind::Temperature, "sensor", "a"), 4.0),
            (id(MetricKind::Temperature, "sensor", "b"), 5.0),
            (id(MetricKind::Humidity, "sensor", "a"), 6.0),
        ];
        for (identity, value) in &updates {
            store.set(identity.clone(), *value);
        }

        let snapshot = store.snapshot();
        let distinct: HashSet<_> = snapshot.iter().map(|r| r.identity.clone()).collect();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(distinct.len(), 4);

        // Each identity holds the value of its last update.
        for reading in &snapshot {
            let last = updates
                .iter()
                .rev()
                .find(|(identity, _)| *identity == reading.identity)
                .map(|(_, v)| *v)
                .unwrap();
            assert_eq!(reading.value, last);
        }
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let store = MetricStore::new();
        store.set(id(MetricKind::Moisture, "plant", "fern"), 30.0);
        store.set(id(MetricKind::Temperature, "sensor", "b"), 1.0);
        store.set(id(MetricKind::Temperature, "sensor", "a"), 2.0);

        let names: Vec<_> = store
            .snapshot()
            .into_iter()
            .map(|r| (r.identity.kind, r.identity.device_name))
            .collect();
        assert_eq!(
            names,
            vec![
                (MetricKind::Temperature, "a".to_string()),
                (MetricKind::Temperature, "b".to_string()),
                (MetricKind::Moisture, "fern".to_string()),
            ]
        );
    }

    #[test]
    fn test_kinds_present_after_first_set() {
        let store = MetricStore::new();
        store.set(id(MetricKind::Illuminance, "plant", "x"), 100.0);
        store.set(id(MetricKind::Battery, "sensor", "y"), 90.0);
        store.set(id(MetricKind::Battery, "sensor", "z"), 80.0);

        assert_eq!(
            store.kinds(),
            vec![MetricKind::Battery, MetricKind::Illuminance]
        );
    }

    #[test]
    fn test_non_finite_values_pass_through() {
        let store = MetricStore::new();
        store.set(id(MetricKind::Temperature, "sensor", "nan"), f64::NAN);
        store.set(id(MetricKind::Temperature, "sensor", "inf"), f64::INFINITY);

        let snapshot = store.snapshot();
        assert!(snapshot[0].value.is_infinite());
        assert!(snapshot[1].value.is_nan());
    }

    #[test]
    fn test_concurrent_set_and_snapshot() {
        const WRITERS: usize = 4;
        const UPDATES: usize = 2_000;

        let store = Arc::new(MetricStore::new());
        let shared = id(MetricKind::Temperature, "sensor", "shared");

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let store = store.clone();
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..UPDATES {
                        store.set(shared.clone(), (w * UPDATES + i) as f64);
                        store.set(
                            id(MetricKind::Humidity, "sensor", &format!("w{}", w)),
                            i as f64,
                        );
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        for reading in store.snapshot() {
                            // Every observed value is one that was written.
                            let v = reading.value;
                            assert_eq!(v.fract(), 0.0);
                            assert!(v >= 0.0 && v < (WRITERS * UPDATES) as f64);
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), WRITERS + 1);
        for w in 0..WRITERS {
            let series = id(MetricKind::Humidity, "sensor", &format!("w{}", w));
            let reading = snapshot.iter().find(|r| r.identity == series).unwrap();
            assert_eq!(reading.value, (UPDATES - 1) as f64);
        }
    }
}
