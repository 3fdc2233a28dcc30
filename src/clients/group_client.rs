use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::domain::{GroupOrder, GroupOrderCreate, OrderStatus, Payment, MAX_DIVISIONS, MIN_DIVISIONS};
use crate::events::{EventAction, EventPublisher};
use crate::group_actor::{GroupOrderAction, GroupOrderActionResult, GroupOrderError};
use super::OrderStoreClient;

/// Payment method recorded on the parent order once every share is paid.
pub const GROUP_PAYMENT_METHOD: &str = "group";

/// Client for splitting orders into per-person shares.
#[derive(Clone)]
pub struct GroupOrderClient {
    inner: ResourceClient<GroupOrder>,
    orders: OrderStoreClient,
    publisher: Arc<dyn EventPublisher>,
}

impl GroupOrderClient {
    pub fn new(inner: ResourceClient<GroupOrder>, orders: OrderStoreClient, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            inner,
            orders,
            publisher,
        }
    }

    /// Splits an existing order into `divisions` shares.
    ///
    /// Blank or missing names default to `Person N`. A second group for the
    /// same order fails with `AlreadyExists`.
    #[instrument(skip(self, names))]
    pub async fn create_group_order(
        &self,
        order_id: &str,
        divisions: u32,
        names: Vec<String>,
    ) -> Result<GroupOrder, GroupOrderError> {
        if !(MIN_DIVISIONS..=MAX_DIVISIONS).contains(&divisions) {
            return Err(GroupOrderError::InvalidDivisions(divisions));
        }

        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| GroupOrderError::OrderNotFound(order_id.to_string()))?;
        if order.status == OrderStatus::Cancelled {
            return Err(GroupOrderError::OrderCancelled(order_id.to_string()));
        }

        debug!("Sending request");
        let group = self
            .inner
            .create(GroupOrderCreate {
                order_id: order.id,
                total: order.total,
                divisions,
                names,
            })
            .await?;
        info!(group_id = %group.id, total = %group.total, "Group order created");
        Ok(group)
    }

    /// Marks one share paid.
    ///
    /// When that payment completes the group, the parent order's payment is
    /// recorded and `order_paid` is published. Later calls do not repeat it.
    #[instrument(skip(self))]
    pub async fn update_share_payment(
        &self,
        group_id: &str,
        person_id: &str,
        method: &str,
    ) -> Result<GroupOrder, GroupOrderError> {
        debug!("Sending request");
        let action = GroupOrderAction::MarkSharePaid {
            person_id: person_id.to_string(),
            method: method.to_string(),
        };
        match self.inner.perform_action(group_id.to_string(), action).await? {
            GroupOrderActionResult::UnknownShare(person_id) => Err(GroupOrderError::ShareNotFound {
                group_id: group_id.to_string(),
                person_id,
            }),
            GroupOrderActionResult::SharePaid { group, completed_now } => {
                if let Some(share) = group.share(person_id) {
                    info!(person = %share.display_name, amount = %share.amount, "Share paid");
                }
                if completed_now {
                    self.settle_parent(&group).await;
                }
                Ok(group)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_group_order_by_order(&self, order_id: &str) -> Result<Option<GroupOrder>, GroupOrderError> {
        debug!("Sending request");
        self.inner
            .get_by_key(format!("order:{}", order_id))
            .await
            .map_err(GroupOrderError::from)
    }

    async fn settle_parent(&self, group: &GroupOrder) {
        let payment = Payment::paid_now(GROUP_PAYMENT_METHOD, group.total);
        match self.orders.record_payment(&group.order_id, payment).await {
            Ok(_) => info!(order_id = %group.order_id, "Group order completed, order marked paid"),
            Err(e) => {
                error!(order_id = %group.order_id, error = %e, "Group completed but order payment was not recorded");
                return;
            }
        }
        if let Err(e) = self.publisher.publish(EventAction::OrderPaid, &group.order_id).await {
            warn!(order_id = %group.order_id, error = %e, "Failed to publish order_paid");
        }
    }
}

impl_client_methods!(GroupOrderClient, GroupOrder, GroupOrderError, group_order);
