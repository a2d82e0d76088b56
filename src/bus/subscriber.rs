//! Bus subscriber
//!
//! One queue subscription per operation (`<prefix>.<operation>`). Each
//! message is decoded, run against the shared store, and answered with a
//! single publish to its reply subject, using the same payloads as HTTP.

use async_nats::{Client, ConnectError, ConnectOptions, Message, SubscribeError};
use futures_util::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::BusSection;
use crate::protocol::{Operation, execute_blocking};
use crate::storage::FileStore;

const TRANSPORT: &str = "bus";

/// Bus front end. The connection is handed in at construction and lives as
/// long as the adapter.
pub struct BusAdapter {
    client: Client,
    store: Arc<FileStore>,
    config: BusSection,
}

impl BusAdapter {
    /// Connect without failing startup when the bus is not up yet; the client
    /// keeps retrying in the background.
    pub async fn connect(config: &BusSection) -> Result<Client, ConnectError> {
        let client = ConnectOptions::new()
            .name("file-service")
            .retry_on_initial_connect()
            .connect(config.url.as_str())
            .await?;
        info!("Bus client created for {}", config.url);
        Ok(client)
    }

    pub fn new(client: Client, store: Arc<FileStore>, config: BusSection) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// `(operation, subject)` for every subscription this adapter makes.
    pub fn subjects(config: &BusSection) -> Vec<(Operation, String)> {
        Operation::ALL
            .into_iter()
            .map(|op| (op, config.subject(op.name())))
            .collect()
    }

    /// Handle messages until `shutdown` fires, then unsubscribe and wait for
    /// in-flight handlers.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), SubscribeError> {
        let mut streams = Vec::new();
        for (op, subject) in Self::subjects(&self.config) {
            let subscriber = self
                .client
                .queue_subscribe(subject.clone(), self.config.queue_group.clone())
                .await?;
            info!("Subscribed to {subject} (queue {})", self.config.queue_group);
            streams.push(subscriber.map(move |msg| (op, msg)).boxed());
        }
        let mut incoming = stream::select_all(streams);
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                next = incoming.next() => match next {
                    Some((op, msg)) => {
                        tracker.spawn(handle_message(
                            self.client.clone(),
                            Arc::clone(&self.store),
                            op,
                            msg,
                        ));
                    }
                    None => {
                        warn!("Bus subscriptions closed");
                        break;
                    }
                },
            }
        }

        // Dropping the subscribers unsubscribes them.
        drop(incoming);
        tracker.close();
        tracker.wait().await;

        if let Err(e) = self.client.flush().await {
            warn!("Failed to flush bus replies on shutdown: {e}");
        }
        info!("Bus adapter stopped");
        Ok(())
    }
}

/// Run one request and publish exactly one reply.
///
/// A message without a reply subject is still executed; there is nowhere to
/// send the outcome.
async fn handle_message(client: Client, store: Arc<FileStore>, op: Operation, msg: Message) {
    let reply_to = msg.reply.clone();
    let reply = execute_blocking(store, op, msg.payload, TRANSPORT).await;

    let Some(reply_to) = reply_to else {
        debug!(
            "{} on {} had no reply subject (status {})",
            op.name(),
            msg.subject,
            reply.status
        );
        return;
    };

    if let Err(e) = client.publish(reply_to, reply.to_bytes().into()).await {
        error!("Failed to publish {} reply: {e}", op.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(prefix: &str) -> BusSection {
        BusSection {
            enabled: true,
            url: "nats://127.0.0.1:4222".into(),
            subject_prefix: prefix.into(),
            queue_group: "file-service".into(),
        }
    }

    #[test]
    fn one_subject_per_operation() {
        let subjects: Vec<String> = BusAdapter::subjects(&section("file"))
            .into_iter()
            .map(|(_, s)| s)
            .collect();
        assert_eq!(
            subjects,
            vec!["file.write", "file.read", "file.list", "file.delete", "file.move"]
        );
    }

    #[test]
    fn prefix_is_configurable() {
        let subjects = BusAdapter::subjects(&section("dev.files"));
        assert!(subjects.contains(&(Operation::Write, "dev.files.write".to_string())));
    }
}
