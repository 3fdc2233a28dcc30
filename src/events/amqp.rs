//! RabbitMQ publisher and consumer over a single durable queue.
//!
//! The publisher keeps one connection/channel pair per process. It is checked
//! on every publish and rebuilt when either side is closed; there is no
//! background health check.

use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use chrono::Utc;
use futures::StreamExt;
use lapin::{
    acker::Acker,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, BasicRejectOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{Acknowledge, Delivery, EventAction, EventError, EventPublisher, EventSource, OrderEvent};

const APP_ID: &str = "orders-service";
const MAX_RETRIES: usize = 3;

struct AmqpLink {
    connection: Connection,
    channel: Channel,
}

impl AmqpLink {
    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

async fn open_link(url: &str, queue: &str) -> Result<AmqpLink, EventError> {
    let connection = Connection::connect(url, ConnectionProperties::default())
        .await
        .map_err(|e| EventError::Connection(format!("Failed to connect: {}", e)))?;

    let channel = connection
        .create_channel()
        .await
        .map_err(|e| EventError::Connection(format!("Failed to create channel: {}", e)))?;

    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| EventError::Connection(format!("Failed to declare queue: {}", e)))?;

    info!(queue = %queue, "Connected to AMQP");
    Ok(AmqpLink { connection, channel })
}

fn retry_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(MAX_RETRIES)
        .with_jitter()
}

pub struct AmqpPublisher {
    url: String,
    queue: String,
    link: Mutex<Option<AmqpLink>>,
}

impl AmqpPublisher {
    /// Creates the publisher. The connection is opened on first publish.
    pub fn new(url: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            queue: queue.into(),
            link: Mutex::new(None),
        }
    }

    /// Returns an open channel, reconnecting if the stored link is closed.
    async fn channel(&self) -> Result<Channel, EventError> {
        let mut guard = self.link.lock().await;
        if let Some(link) = guard.as_ref() {
            if link.is_open() {
                return Ok(link.channel.clone());
            }
            warn!(queue = %self.queue, "AMQP link closed, reconnecting");
        }

        let link = open_link(&self.url, &self.queue).await?;
        let channel = link.channel.clone();
        *guard = Some(link);
        Ok(channel)
    }

    async fn discard_link(&self) {
        self.link.lock().await.take();
    }

    async fn publish_once(&self, payload: &[u8]) -> Result<(), EventError> {
        let channel = self.channel().await?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_message_id(Uuid::new_v4().to_string().into())
            .with_timestamp(Utc::now().timestamp().max(0) as u64)
            .with_app_id(APP_ID.into())
            .with_delivery_mode(2); // persistent

        let confirm = channel
            .basic_publish("", &self.queue, BasicPublishOptions::default(), payload, properties)
            .await
            .map_err(|e| EventError::Publish(format!("Failed to publish: {}", e)))?;

        confirm
            .await
            .map_err(|e| EventError::Publish(format!("Publish confirmation failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    #[tracing::instrument(name = "amqp.publish", skip(self, action), fields(action = %action))]
    async fn publish(&self, action: EventAction, order_id: &str) -> Result<(), EventError> {
        let payload = OrderEvent::new(action, order_id).to_bytes()?;
        let backoff = retry_backoff().build();
        let mut last_error = None;

        for (attempt, delay) in std::iter::once(Duration::ZERO).chain(backoff).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }
            match self.publish_once(&payload).await {
                Ok(()) => {
                    debug!(queue = %self.queue, order_id = %order_id, "Published event");
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        error = %e,
                        "Publish failed, retrying..."
                    );
                    self.discard_link().await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| EventError::Publish("Max retries exceeded".to_string())))
    }
}

struct AmqpAcker(Acker);

#[async_trait]
impl Acknowledge for AmqpAcker {
    async fn ack(&self) -> Result<(), EventError> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| EventError::Acknowledge(e.to_string()))
    }

    async fn reject(&self, requeue: bool) -> Result<(), EventError> {
        self.0
            .reject(BasicRejectOptions { requeue })
            .await
            .map_err(|e| EventError::Acknowledge(e.to_string()))
    }
}

struct ConsumerLink {
    _link: AmqpLink,
    consumer: Consumer,
}

/// Consumes the order queue one unacknowledged message at a time.
///
/// Broken connections are rebuilt with exponential backoff, so
/// `next_delivery` only returns once a message arrives.
pub struct AmqpSource {
    url: String,
    queue: String,
    consumer_tag: String,
    current: Option<ConsumerLink>,
}

impl AmqpSource {
    pub fn new(url: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            queue: queue.into(),
            consumer_tag: format!("{}-{}", APP_ID, Uuid::new_v4()),
            current: None,
        }
    }

    async fn setup_consumer(&self) -> Result<ConsumerLink, EventError> {
        let link = open_link(&self.url, &self.queue).await?;

        link.channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| EventError::Connection(format!("Failed to set prefetch: {}", e)))?;

        let consumer = link
            .channel
            .basic_consume(
                &self.queue,
                &self.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| EventError::Connection(format!("Failed to start consumer: {}", e)))?;

        info!(queue = %self.queue, "Consumer connected, processing messages");
        Ok(ConsumerLink { _link: link, consumer })
    }
}

#[async_trait]
impl EventSource for AmqpSource {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, EventError> {
        let backoff_builder = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(30))
            .without_max_times()
            .with_jitter();
        let mut backoff = backoff_builder.build();

        loop {
            if self.current.is_none() {
                match self.setup_consumer().await {
                    Ok(link) => {
                        self.current = Some(link);
                        backoff = backoff_builder.build();
                    }
                    Err(e) => {
                        let delay = backoff.next().unwrap_or(Duration::from_secs(30));
                        error!(
                            error = %e,
                            backoff_ms = %delay.as_millis(),
                            queue = %self.queue,
                            "Failed to set up consumer, retrying after backoff"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                }
            }
            let Some(current) = self.current.as_mut() else {
                continue;
            };

            match current.consumer.next().await {
                Some(Ok(delivery)) => {
                    return Ok(Some(Delivery::new(
                        delivery.data,
                        delivery.redelivered,
                        Box::new(AmqpAcker(delivery.acker)),
                    )));
                }
                Some(Err(e)) => {
                    error!(error = %e, "Consumer delivery error, will reconnect");
                    self.current = None;
                }
                None => {
                    info!(queue = %self.queue, "Consumer stream ended, reconnecting...");
                    self.current = None;
                    let delay = backoff.next().unwrap_or(Duration::from_secs(30));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
