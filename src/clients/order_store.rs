use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::actor_framework::{Page, PageRequest, ResourceClient};
use crate::domain::{Order, OrderCreate, OrderFilter, OrderStatus, Payment};
use crate::index_sync::OrderLookup;
use crate::order_actor::{OrderAction, OrderActionResult, OrderError};

/// Client for the order store actor, the only writer of orders.
#[derive(Clone)]
pub struct OrderStoreClient {
    inner: ResourceClient<Order>,
}

impl OrderStoreClient {
    #[instrument(skip(self, params), fields(items = params.items.len()))]
    pub async fn create(&self, params: OrderCreate) -> Result<Order, OrderError> {
        debug!("Sending request");
        self.inner.create(params).await.map_err(OrderError::from)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, OrderError> {
        debug!("Sending request");
        self.inner.list(filter, page).await.map_err(OrderError::from)
    }

    /// Moves the order from `expected` to `next` if nobody changed it since.
    #[instrument(skip(self))]
    pub async fn transition(&self, id: &str, expected: OrderStatus, next: OrderStatus) -> Result<Order, OrderError> {
        debug!("Sending request");
        let action = OrderAction::TransitionStatus { expected, next };
        match self.inner.perform_action(id.to_string(), action).await? {
            OrderActionResult::Transitioned(order) => Ok(order),
            OrderActionResult::StatusMismatch { found } => Err(OrderError::StatusConflict {
                id: id.to_string(),
                expected,
                found,
            }),
            OrderActionResult::PaymentRecorded(_) => {
                Err(OrderError::ActorCommunicationError("Unexpected result".to_string()))
            }
        }
    }

    #[instrument(skip(self, payment))]
    pub async fn record_payment(&self, id: &str, payment: Payment) -> Result<Order, OrderError> {
        debug!("Sending request");
        match self.inner.perform_action(id.to_string(), OrderAction::RecordPayment(payment)).await? {
            OrderActionResult::PaymentRecorded(order) => Ok(order),
            _ => Err(OrderError::ActorCommunicationError("Unexpected result".to_string())),
        }
    }
}

#[async_trait]
impl OrderLookup for OrderStoreClient {
    async fn find_order(&self, id: &str) -> Result<Option<Order>, OrderError> {
        self.get_order(id).await
    }
}

impl_basic_client!(OrderStoreClient, Order, OrderError, order);
