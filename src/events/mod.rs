//! Order facts and the queue that carries them to the index sync consumer.
//!
//! A fact is only `{action, order_id}`. Consumers re-read the order, so facts
//! may arrive twice or out of order without harm.
//!
//! Implementations:
//! - `AmqpPublisher` / `AmqpSource`: durable RabbitMQ queue
//! - `ChannelPublisher` / `ChannelSource`: in-process tokio channel

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod amqp;
pub mod channel;

pub use amqp::{AmqpPublisher, AmqpSource};
pub use channel::{channel_queue, ChannelPublisher, ChannelSource};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EventError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Publish failed: {0}")]
    Publish(String),
    #[error("Acknowledge failed: {0}")]
    Acknowledge(String),
    #[error("Malformed event: {0}")]
    Decode(String),
    #[error("Queue closed")]
    Closed,
}

/// Actions this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    OrderCreated,
    OrderStatusChanged,
    OrderCancelled,
    OrderPaid,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::OrderCreated => "order_created",
            EventAction::OrderStatusChanged => "order_status_changed",
            EventAction::OrderCancelled => "order_cancelled",
            EventAction::OrderPaid => "order_paid",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire format of a fact. `action` stays a string so facts from older
/// producers (`create`, `delete`, ...) still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub action: String,
    pub order_id: String,
}

impl OrderEvent {
    pub fn new(action: EventAction, order_id: impl Into<String>) -> Self {
        Self {
            action: action.as_str().to_string(),
            order_id: order_id.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| EventError::Publish(format!("Failed to encode event: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        let event: OrderEvent = serde_json::from_slice(bytes).map_err(|e| EventError::Decode(e.to_string()))?;
        if event.order_id.trim().is_empty() {
            return Err(EventError::Decode("order_id is empty".to_string()));
        }
        Ok(event)
    }
}

/// Emits order facts onto the queue.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, action: EventAction, order_id: &str) -> Result<(), EventError>;
}

/// Settles one delivery with the broker.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn ack(&self) -> Result<(), EventError>;

    async fn reject(&self, requeue: bool) -> Result<(), EventError>;
}

/// One message pulled from the queue. Must be settled with `ack` or `reject`.
pub struct Delivery {
    pub payload: Vec<u8>,
    /// Set when the broker has handed this message out before.
    pub redelivered: bool,
    acker: Box<dyn Acknowledge>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, redelivered: bool, acker: Box<dyn Acknowledge>) -> Self {
        Self {
            payload,
            redelivered,
            acker,
        }
    }

    pub async fn ack(self) -> Result<(), EventError> {
        self.acker.ack().await
    }

    pub async fn reject(self, requeue: bool) -> Result<(), EventError> {
        self.acker.reject(requeue).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

/// Pulls deliveries one at a time.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Next delivery, or `None` once the queue is closed for good.
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, EventError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = OrderEvent::new(EventAction::OrderStatusChanged, "order_1");
        let bytes = event.to_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"action":"order_status_changed","order_id":"order_1"}"#
        );
        assert_eq!(OrderEvent::from_bytes(&bytes).unwrap(), event);
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(OrderEvent::from_bytes(b"not json"), Err(EventError::Decode(_))));
        assert!(matches!(
            OrderEvent::from_bytes(br#"{"action":"create","order_id":" "}"#),
            Err(EventError::Decode(_))
        ));
    }
}
