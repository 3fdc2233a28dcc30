use crate::domain::{Order, OrderStatus, Payment};

/// Custom actions for Order entities.
///
/// Orders are never patched or deleted; every mutation after creation goes
/// through one of these.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Compare-and-set on the status.
    ///
    /// Applied only if the stored status still equals `expected`.
    TransitionStatus { expected: OrderStatus, next: OrderStatus },
    /// Replaces the payment record of the order.
    RecordPayment(Payment),
}

#[derive(Debug, Clone)]
pub enum OrderActionResult {
    Transitioned(Order),
    /// The stored status moved on since the caller read it.
    StatusMismatch { found: OrderStatus },
    PaymentRecorded(Order),
}
