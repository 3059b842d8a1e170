//! Zenoh subscriptions feeding the router.
//!
//! Each configured topic filter gets its own Zenoh subscriber. Subscribers
//! only forward samples into a bounded queue; a single consumer drains it and
//! runs the router, so decoders never see two messages at once.

use mqtt_exporter_common::TopicFilter;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};
use zenoh::Session;
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::Subscriber;
use zenoh::sample::{Sample, SampleKind};

use crate::router::SharedRouter;

/// Capacity of the queue between subscriptions and the router.
pub const QUEUE_CAPACITY: usize = 1024;

/// An inbound message, detached from the transport.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl From<&Sample> for Message {
    fn from(sample: &Sample) -> Self {
        Self {
            topic: sample.key_expr().as_str().to_string(),
            payload: sample.payload().to_bytes().into_owned(),
        }
    }
}

/// Subscribes to the configured topics and dispatches every message.
pub struct TopicSubscriber {
    session: Session,
    subscribers: Vec<Subscriber<FifoChannelHandler<Sample>>>,
    router: SharedRouter,
}

impl TopicSubscriber {
    /// Declare one Zenoh subscriber per filter on an open session.
    ///
    /// Fails on the first filter Zenoh rejects, before any message is
    /// consumed.
    pub async fn declare(
        session: Session,
        filters: &[TopicFilter],
        router: SharedRouter,
    ) -> anyhow::Result<Self> {
        let mut subscribers = Vec::with_capacity(filters.len());
        for filter in filters {
            let subscriber = session
                .declare_subscriber(filter.key_expr())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to subscribe to '{}': {}", filter, e))?;

            info!(filter = %filter, key_expr = filter.key_expr(), "Subscribed");
            subscribers.push(subscriber);
        }

        Ok(Self {
            session,
            subscribers,
            router,
        })
    }

    /// Run until the shutdown signal is received, then undeclare all
    /// subscriptions and close the session.
    ///
    /// Returns an error if every subscription closes before shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Message>(QUEUE_CAPACITY);

        let forwarders: Vec<JoinHandle<()>> = self
            .subscribers
            .into_iter()
            .map(|subscriber| tokio::spawn(forward(subscriber, tx.clone(), shutdown.clone())))
            .collect();
        drop(tx);

        info!(
            subscriptions = forwarders.len(),
            "Subscriber started, waiting for messages..."
        );

        let mut closed_early = false;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping subscriber");
                        break;
                    }
                }

                message = rx.recv() => {
                    match message {
                        Some(message) => {
                            self.router.dispatch(&message.topic, &message.payload);
                        }
                        None => {
                            closed_early = true;
                            break;
                        }
                    }
                }
            }
        }

        // Unblocks forwarders waiting on a full queue.
        drop(rx);
        for forwarder in forwarders {
            if let Err(e) = forwarder.await {
                warn!(error = %e, "Forwarder task failed");
            }
        }

        self.session
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to close session: {}", e))?;

        if closed_early {
            anyhow::bail!("All subscriptions closed");
        }

        info!("Subscriber stopped");
        Ok(())
    }
}

/// Move samples from one Zenoh subscription into the shared queue.
async fn forward(
    subscriber: Subscriber<FifoChannelHandler<Sample>>,
    tx: mpsc::Sender<Message>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            sample = subscriber.recv_async() => {
                match sample {
                    Ok(sample) => {
                        if sample.kind() == SampleKind::Delete {
                            trace!(key = %sample.key_expr(), "Ignoring delete sample");
                            continue;
                        }
                        if tx.send(Message::from(&sample)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Error receiving sample: {}", e);
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = subscriber.undeclare().await {
        warn!("Failed to undeclare subscriber: {}", e);
    }
}
