//! In-process queue over an unbounded tokio channel.
//!
//! Rejected-with-requeue messages go back to the tail of the same channel
//! flagged as redelivered.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Acknowledge, Delivery, EventAction, EventError, EventPublisher, EventSource, OrderEvent};

#[derive(Debug)]
struct QueuedMessage {
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Clone)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<QueuedMessage>,
}

pub struct ChannelSource {
    receiver: mpsc::UnboundedReceiver<QueuedMessage>,
    // Weak so the queue still closes once every publisher is gone.
    requeue: mpsc::WeakUnboundedSender<QueuedMessage>,
}

pub fn channel_queue() -> (ChannelPublisher, ChannelSource) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let requeue = sender.downgrade();
    (ChannelPublisher { sender }, ChannelSource { receiver, requeue })
}

impl ChannelPublisher {
    /// Enqueues raw bytes. Used to feed malformed or legacy payloads in tests.
    pub fn publish_raw(&self, payload: Vec<u8>) -> Result<(), EventError> {
        self.sender
            .send(QueuedMessage {
                payload,
                redelivered: false,
            })
            .map_err(|_| EventError::Closed)
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, action: EventAction, order_id: &str) -> Result<(), EventError> {
        let payload = OrderEvent::new(action, order_id).to_bytes()?;
        self.publish_raw(payload)?;
        debug!(action = %action, order_id = %order_id, "Published event");
        Ok(())
    }
}

struct ChannelAcker {
    payload: Vec<u8>,
    requeue: mpsc::WeakUnboundedSender<QueuedMessage>,
}

#[async_trait]
impl Acknowledge for ChannelAcker {
    async fn ack(&self) -> Result<(), EventError> {
        Ok(())
    }

    async fn reject(&self, requeue: bool) -> Result<(), EventError> {
        if !requeue {
            return Ok(());
        }
        let Some(sender) = self.requeue.upgrade() else {
            warn!("Queue closed, dropping requeued message");
            return Err(EventError::Closed);
        };
        sender
            .send(QueuedMessage {
                payload: self.payload.clone(),
                redelivered: true,
            })
            .map_err(|_| EventError::Closed)
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, EventError> {
        let Some(message) = self.receiver.recv().await else {
            return Ok(None);
        };
        let acker = ChannelAcker {
            payload: message.payload.clone(),
            requeue: self.requeue.clone(),
        };
        Ok(Some(Delivery::new(message.payload, message.redelivered, Box::new(acker))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_and_close() {
        let (publisher, mut source) = channel_queue();
        publisher.publish(EventAction::OrderCreated, "o1").await.unwrap();
        publisher.publish(EventAction::OrderCancelled, "o2").await.unwrap();
        drop(publisher);

        let first = source.next_delivery().await.unwrap().unwrap();
        assert_eq!(OrderEvent::from_bytes(&first.payload).unwrap().order_id, "o1");
        first.ack().await.unwrap();

        let second = source.next_delivery().await.unwrap().unwrap();
        assert_eq!(OrderEvent::from_bytes(&second.payload).unwrap().action, "order_cancelled");
        second.ack().await.unwrap();

        assert!(source.next_delivery().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requeue_marks_redelivered() {
        let (publisher, mut source) = channel_queue();
        publisher.publish(EventAction::OrderPaid, "o1").await.unwrap();

        let delivery = source.next_delivery().await.unwrap().unwrap();
        assert!(!delivery.redelivered);
        delivery.reject(true).await.unwrap();

        let again = source.next_delivery().await.unwrap().unwrap();
        assert!(again.redelivered);
        assert_eq!(OrderEvent::from_bytes(&again.payload).unwrap().order_id, "o1");
        again.reject(false).await.unwrap();

        drop(publisher);
        assert!(source.next_delivery().await.unwrap().is_none());
    }
}
