use std::cmp::Ordering;

use chrono::Utc;

use crate::actor_framework::Entity;
use crate::domain::{Order, OrderCreate, OrderFilter, OrderStatus};
use super::actions::{OrderAction, OrderActionResult};
use super::state_machine::check_transition;

impl Entity for Order {
    type Id = String;
    type CreateParams = OrderCreate;
    type Patch = ();
    type Action = OrderAction;
    type ActionResult = OrderActionResult;
    type Filter = OrderFilter;

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new pending Order from fully priced lines.
    ///
    /// # Notes
    /// `total` must equal the exact sum of the line subtotals; `subtotal` mirrors it.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, String> {
        if params.items.is_empty() {
            return Err("an order needs at least one item".to_string());
        }
        match Order::items_total(&params.items) {
            Some(sum) if sum == params.total => {}
            Some(sum) => return Err(format!("total {} does not match the lines ({})", params.total, sum)),
            None => return Err("order total is out of range".to_string()),
        }
        let total = params.total;
        let now = Utc::now();

        Ok(Self {
            id,
            business_id: params.business_id,
            branch_id: params.branch_id,
            user_id: params.user_id,
            table: params.table,
            items: params.items,
            subtotal: total,
            total,
            status: OrderStatus::Pending,
            notes: params.notes,
            payment: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn matches(&self, filter: &OrderFilter) -> bool {
        fn field_matches(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().map_or(true, |w| w.is_empty() || w == actual)
        }

        field_matches(&filter.business_id, &self.business_id)
            && field_matches(&filter.branch_id, &self.branch_id)
            && field_matches(&filter.user_id, &self.user_id)
            && field_matches(&filter.table, &self.table)
            && filter.status.map_or(true, |s| s == self.status)
    }

    /// Newest first, ties broken by id so pages are stable.
    fn list_cmp(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), String> {
        Err("orders change only through status transitions and payments".to_string())
    }

    fn on_delete(&self) -> Result<(), String> {
        Err("orders are never deleted, cancel them instead".to_string())
    }

    /// Handles order-specific actions.
    ///
    /// # Actions
    /// - `TransitionStatus`: compare-and-set, reports a mismatch instead of failing
    /// - `RecordPayment`: overwrites the payment record
    ///
    /// # Errors
    /// Returns an error for a transition the lifecycle does not allow.
    fn handle_action(&mut self, action: OrderAction) -> Result<OrderActionResult, String> {
        match action {
            OrderAction::TransitionStatus { expected, next } => {
                if self.status != expected {
                    return Ok(OrderActionResult::StatusMismatch { found: self.status });
                }
                check_transition(self.status, next).map_err(|e| e.to_string())?;
                self.status = next;
                self.updated_at = Utc::now();
                Ok(OrderActionResult::Transitioned(self.clone()))
            }
            OrderAction::RecordPayment(payment) => {
                self.payment = Some(payment);
                self.updated_at = Utc::now();
                Ok(OrderActionResult::PaymentRecorded(self.clone()))
            }
        }
    }
}
