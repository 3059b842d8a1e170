//! Ordered dispatch of inbound messages to decoders.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::decoder::Decoder;

/// Create a shareable router handle.
pub type SharedRouter = Arc<Router>;

/// Router statistics.
#[derive(Debug, Clone, Default)]
pub struct RouterStats {
    /// Total messages offered to the router.
    pub messages_received: u64,
    /// Messages claimed by a decoder.
    pub messages_handled: u64,
    /// Messages no decoder recognised.
    pub messages_unrecognized: u64,
}

/// Offers each message to a fixed list of decoders, in order, until one
/// claims it.
///
/// The order is the tie-break between decoders whose structural tests could
/// overlap; it is set at construction and never changes.
pub struct Router {
    decoders: Vec<Box<dyn Decoder>>,
    stats: RwLock<RouterStats>,
}

impl Router {
    pub fn new(decoders: Vec<Box<dyn Decoder>>) -> Self {
        Self {
            decoders,
            stats: RwLock::new(RouterStats::default()),
        }
    }

    /// Dispatch a message and return the name of the decoder that handled it.
    ///
    /// Unrecognised messages are dropped after a debug log entry.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> Option<&'static str> {
        let handled_by = self
            .decoders
            .iter()
            .find(|decoder| decoder.try_process(topic, payload))
            .map(|decoder| decoder.name());

        let mut stats = self.stats.write();
        stats.messages_received += 1;
        match handled_by {
            Some(decoder) => {
                stats.messages_handled += 1;
                trace!(topic, decoder, "Message handled");
            }
            None => {
                stats.messages_unrecognized += 1;
                debug!(
                    topic,
                    payload = %String::from_utf8_lossy(payload),
                    "No decoder recognised message"
                );
            }
        }

        handled_by
    }

    /// Names of the active decoders, in dispatch order.
    pub fn decoder_names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Get router statistics.
    pub fn stats(&self) -> RouterStats {
        self.stats.read().clone()
    }
}
