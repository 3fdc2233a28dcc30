//! Keeps the search index in step with the order store.
//!
//! A single sequential loop pulls one fact at a time, re-reads the canonical
//! order and upserts its document. Facts only route work, so duplicates and
//! reordering converge on the current state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::Order;
use crate::error::ErrorKind;
use crate::events::{Delivery, EventSource, OrderEvent};
use crate::order_actor::OrderError;
use crate::search::{SearchDocument, SearchError, SearchIndex};

/// Read access to the order store.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn find_order(&self, id: &str) -> Result<Option<Order>, OrderError>;
}

/// What the consumer does with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPolicy {
    Upsert,
    /// Cancellation is visible state, so this re-upserts as well.
    Cancel,
    Ignore,
}

impl IndexPolicy {
    pub fn for_action(action: &str) -> Self {
        match action {
            "order_created" | "order_status_changed" | "order_paid" | "create" | "update" | "status_update" => {
                IndexPolicy::Upsert
            }
            "order_cancelled" | "cancel" | "delete" => IndexPolicy::Cancel,
            _ => IndexPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error("Malformed event: {0}")]
    Decode(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Order store error: {0}")]
    Store(OrderError),
    #[error("Search index error: {0}")]
    Index(#[from] SearchError),
}

impl SyncError {
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Decode(_) | SyncError::OrderNotFound(_) => false,
            SyncError::Store(e) => e.kind() == ErrorKind::Transient,
            SyncError::Index(e) => e.is_transient(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Indexed,
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub indexed: u64,
    pub ignored: u64,
    pub requeued: u64,
    pub rejected: u64,
}

pub struct IndexSyncConsumer {
    source: Box<dyn EventSource>,
    orders: Arc<dyn OrderLookup>,
    index: Arc<dyn SearchIndex>,
    shutdown: CancellationToken,
}

impl IndexSyncConsumer {
    pub fn new(
        source: Box<dyn EventSource>,
        orders: Arc<dyn OrderLookup>,
        index: Arc<dyn SearchIndex>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            orders,
            index,
            shutdown,
        }
    }

    /// Runs until shutdown is requested or the source closes.
    pub async fn run(mut self) -> SyncStats {
        info!("Index sync consumer starting");
        let mut stats = SyncStats::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, stopping consumer");
                    break;
                }
                next = self.source.next_delivery() => next,
            };

            match next {
                Ok(Some(delivery)) => self.settle(delivery, &mut stats).await,
                Ok(None) => {
                    info!("Event source closed, stopping consumer");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive delivery");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            }
        }

        info!(
            indexed = stats.indexed,
            ignored = stats.ignored,
            requeued = stats.requeued,
            rejected = stats.rejected,
            "Index sync consumer stopped"
        );
        stats
    }

    async fn settle(&self, delivery: Delivery, stats: &mut SyncStats) {
        let settled = match self.handle(&delivery.payload).await {
            Ok(outcome) => {
                match outcome {
                    Handled::Indexed => stats.indexed += 1,
                    Handled::Ignored => stats.ignored += 1,
                }
                delivery.ack().await
            }
            Err(e) => {
                let requeue = e.is_transient() && !delivery.redelivered;
                if requeue {
                    warn!(error = %e, "Processing failed, requeueing once");
                    stats.requeued += 1;
                } else {
                    error!(error = %e, redelivered = delivery.redelivered, "Processing failed, rejecting");
                    stats.rejected += 1;
                }
                delivery.reject(requeue).await
            }
        };
        if let Err(e) = settled {
            error!(error = %e, "Failed to settle delivery");
        }
    }

    /// Applies one fact to the index.
    #[instrument(skip(self, payload))]
    pub async fn handle(&self, payload: &[u8]) -> Result<Handled, SyncError> {
        let event = OrderEvent::from_bytes(payload).map_err(|e| SyncError::Decode(e.to_string()))?;

        match IndexPolicy::for_action(&event.action) {
            IndexPolicy::Ignore => {
                warn!(action = %event.action, order_id = %event.order_id, "Unknown action, skipping");
                Ok(Handled::Ignored)
            }
            policy => {
                let order = self
                    .orders
                    .find_order(&event.order_id)
                    .await
                    .map_err(SyncError::Store)?
                    .ok_or_else(|| SyncError::OrderNotFound(event.order_id.clone()))?;

                self.index.upsert(&SearchDocument::from(&order)).await?;
                debug!(
                    order_id = %order.id,
                    status = %order.status,
                    policy = ?policy,
                    "Order indexed"
                );
                Ok(Handled::Indexed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::{ItemLine, OrderStatus};
    use crate::events::{channel_queue, EventAction, EventPublisher};
    use crate::search::{MemoryIndex, SearchQuery};

    #[derive(Default)]
    struct StubOrders {
        orders: Mutex<HashMap<String, Order>>,
        failures_left: Mutex<u32>,
    }

    impl StubOrders {
        fn put(&self, order: Order) {
            self.orders.lock().unwrap().insert(order.id.clone(), order);
        }
    }

    #[async_trait]
    impl OrderLookup for StubOrders {
        async fn find_order(&self, id: &str) -> Result<Option<Order>, OrderError> {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(OrderError::ActorCommunicationError("store unavailable".into()));
            }
            Ok(self.orders.lock().unwrap().get(id).cloned())
        }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        let price = Decimal::new(1700, 2);
        Order {
            id: id.to_string(),
            business_id: "biz_1".into(),
            branch_id: "centro".into(),
            user_id: "user_1".into(),
            table: "T1".into(),
            items: vec![ItemLine {
                item_id: "item_1".into(),
                name: "Burger".into(),
                base_price: price,
                quantity: 1,
                variant: None,
                modifiers: vec![],
                unit_price: price,
                subtotal: price,
            }],
            subtotal: price,
            total: price,
            status,
            notes: String::new(),
            payment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn consumer(
        source: Box<dyn EventSource>,
        orders: Arc<StubOrders>,
        index: Arc<MemoryIndex>,
    ) -> IndexSyncConsumer {
        IndexSyncConsumer::new(source, orders, index, CancellationToken::new())
    }

    #[tokio::test]
    async fn test_duplicate_facts_yield_one_current_document() {
        let orders = Arc::new(StubOrders::default());
        let index = Arc::new(MemoryIndex::new());
        let (publisher, source) = channel_queue();

        orders.put(order("o1", OrderStatus::Pending));
        publisher.publish(EventAction::OrderCreated, "o1").await.unwrap();
        orders.put(order("o1", OrderStatus::Accepted));
        publisher.publish(EventAction::OrderCreated, "o1").await.unwrap();
        drop(publisher);

        let stats = consumer(Box::new(source), orders, index.clone()).run().await;

        assert_eq!(stats.indexed, 2);
        assert_eq!(index.len().await, 1);
        assert_eq!(index.document("o1").await.unwrap().status, "accepted");
    }

    #[tokio::test]
    async fn test_unknown_action_and_missing_order_keep_loop_alive() {
        let orders = Arc::new(StubOrders::default());
        let index = Arc::new(MemoryIndex::new());
        let (publisher, source) = channel_queue();

        orders.put(order("o2", OrderStatus::Cancelled));
        publisher.publish_raw(br#"{"action":"order_archived","order_id":"o2"}"#.to_vec()).unwrap();
        publisher.publish_raw(b"{broken".to_vec()).unwrap();
        publisher.publish(EventAction::OrderCreated, "missing").await.unwrap();
        publisher.publish_raw(br#"{"action":"delete","order_id":"o2"}"#.to_vec()).unwrap();
        drop(publisher);

        let stats = consumer(Box::new(source), orders, index.clone()).run().await;

        assert_eq!(stats, SyncStats { indexed: 1, ignored: 1, requeued: 0, rejected: 2 });
        let ids = index.query(&SearchQuery::new("").filter("status", "cancelled")).await.unwrap();
        assert_eq!(ids, vec!["o2"]);
    }

    #[tokio::test]
    async fn test_transient_failure_is_requeued_once() {
        let orders = Arc::new(StubOrders::default());
        *orders.failures_left.lock().unwrap() = 1;
        orders.put(order("o3", OrderStatus::Ready));
        let index = Arc::new(MemoryIndex::new());
        let (publisher, source) = channel_queue();

        publisher.publish(EventAction::OrderStatusChanged, "o3").await.unwrap();

        let token = CancellationToken::new();
        let consumer = IndexSyncConsumer::new(Box::new(source), orders, index.clone(), token.clone());
        let handle = tokio::spawn(consumer.run());

        for _ in 0..50 {
            if index.len().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        let stats = handle.await.unwrap();
        drop(publisher);

        assert_eq!(stats.requeued, 1);
        assert_eq!(stats.indexed, 1);
        assert_eq!(index.document("o3").await.unwrap().status, "ready");
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(IndexPolicy::for_action("order_paid"), IndexPolicy::Upsert);
        assert_eq!(IndexPolicy::for_action("status_update"), IndexPolicy::Upsert);
        assert_eq!(IndexPolicy::for_action("cancel"), IndexPolicy::Cancel);
        assert_eq!(IndexPolicy::for_action("refund"), IndexPolicy::Ignore);
    }
}
