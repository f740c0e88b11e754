use std::convert::Infallible;
use std::task::{Context, Poll};

use futures::future::{self, Ready};
use tokio::sync::broadcast;
use tower::Service;
use tracing::debug;

use crate::pipeline::identified::IdentifiedBatch;

/// Delivers identified batches to every subscriber.
#[derive(Clone)]
pub struct IdentifiedPublishingService {
    identified_tx: broadcast::Sender<IdentifiedBatch>,
}

impl IdentifiedPublishingService {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<IdentifiedBatch>) {
        let (identified_tx, identified_rx) = broadcast::channel(capacity);
        (Self { identified_tx }, identified_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IdentifiedBatch> {
        self.identified_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.identified_tx.receiver_count()
    }

    /// Sends the batch even when it holds no objects: consumers rely on one
    /// result per input batch. Returns the number of subscribers reached.
    pub fn publish(&self, batch: IdentifiedBatch) -> usize {
        let batch_id = batch.batch_id;
        let objects = batch.len();
        match self.identified_tx.send(batch) {
            Ok(receivers) => {
                debug!(%batch_id, objects, receivers, "Published identified batch");
                receivers
            }
            Err(_) => {
                debug!(%batch_id, objects, "No subscribers for identified batch");
                0
            }
        }
    }
}

impl Service<IdentifiedBatch> for IdentifiedPublishingService {
    type Response = usize;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, batch: IdentifiedBatch) -> Self::Future {
        future::ready(Ok(self.publish(batch)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn empty_batches_are_delivered() {
        let (publisher, mut rx) = IdentifiedPublishingService::new(4);
        let batch = IdentifiedBatch::new(Uuid::new_v4());

        assert_eq!(publisher.publish(batch.clone()), 1);
        let received = rx.recv().await.unwrap();
        assert_eq!(received, batch);
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_not_an_error() {
        let (publisher, rx) = IdentifiedPublishingService::new(4);
        drop(rx);
        assert_eq!(publisher.subscriber_count(), 0);
        assert_eq!(publisher.publish(IdentifiedBatch::new(Uuid::new_v4())), 0);

        let mut late = publisher.subscribe();
        let batch = IdentifiedBatch::new(Uuid::new_v4());
        publisher.publish(batch.clone());
        assert_eq!(late.recv().await.unwrap(), batch);
    }
}
