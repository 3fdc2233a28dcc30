use crate::domain::GroupOrder;

#[derive(Debug, Clone)]
pub enum GroupOrderAction {
    /// Marks one person's share paid. Paying an already-paid share is a no-op.
    MarkSharePaid { person_id: String, method: String },
}

#[derive(Debug, Clone)]
pub enum GroupOrderActionResult {
    SharePaid {
        group: GroupOrder,
        /// True only for the payment that completed the group.
        completed_now: bool,
    },
    UnknownShare(String),
}
