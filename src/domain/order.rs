use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of an order.
///
/// `Delivered` and `Cancelled` are terminal. The legal moves between the
/// other states live in `order_actor::state_machine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Position along the forward path. `Cancelled` has none.
    pub fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Accepted => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Ready => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .iter()
            .find(|status| status.as_str() == wanted)
            .copied()
            .ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

/// Variant chosen for a line, frozen at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSnapshot {
    pub name: String,
    pub additional_price: Decimal,
}

/// Modifier chosen for a line, frozen at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierSnapshot {
    pub name: String,
    pub additional_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLine {
    pub item_id: String,
    pub name: String,
    pub base_price: Decimal,
    pub quantity: u32,
    pub variant: Option<VariantSnapshot>,
    pub modifiers: Vec<ModifierSnapshot>,
    /// Quoted price of one unit including variant and modifiers
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub method: String,
    pub amount: Decimal,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn paid_now(method: impl Into<String>, amount: Decimal) -> Self {
        Self {
            method: method.into(),
            amount,
            paid: true,
            paid_at: Some(Utc::now()),
        }
    }
}

/// Represents a customer order. The order store is the system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub business_id: String,
    pub branch_id: String,
    pub user_id: String,
    pub table: String,
    pub items: Vec<ItemLine>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub notes: String,
    pub payment: Option<Payment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the line subtotals, or `None` when it does not fit a `Decimal`.
    pub fn items_total(items: &[ItemLine]) -> Option<Decimal> {
        items
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.subtotal))
    }
}

/// One requested line of an incoming order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub item_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl CreateItemRequest {
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            variant: None,
            modifiers: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }
}

/// Incoming order as received from the caller, before enrichment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub business_id: String,
    #[serde(default)]
    pub branch_id: String,
    pub user_id: String,
    #[serde(default)]
    pub table: String,
    pub items: Vec<CreateItemRequest>,
    #[serde(default)]
    pub notes: String,
}

/// Payload handed to the order store once every line is priced.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub business_id: String,
    pub branch_id: String,
    pub user_id: String,
    pub table: String,
    pub items: Vec<ItemLine>,
    /// Sum of `items` subtotals, computed by the caller.
    pub total: Decimal,
    pub notes: String,
}

/// Listing filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub business_id: Option<String>,
    pub branch_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub table: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_and_display() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!(" Ready ".parse::<OrderStatus>(), Ok(OrderStatus::Ready));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{"business_id":"b1","user_id":"u1","items":[{"item_id":"p1","quantity":2}]}"#,
        )
        .unwrap();
        assert_eq!(request.items[0], CreateItemRequest::new("p1", 2));
        assert!(request.notes.is_empty());
    }
}
