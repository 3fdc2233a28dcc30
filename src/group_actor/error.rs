use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::error::ErrorKind;
use crate::order_actor::OrderError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GroupOrderError {
    #[error("Group order not found: {0}")]
    NotFound(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Group order {group_id} has no share for person {person_id}")]
    ShareNotFound { group_id: String, person_id: String },
    #[error("Order {0} already has a group order")]
    AlreadyExists(String),
    #[error("Divisions must be between 2 and 10, got {0}")]
    InvalidDivisions(u32),
    #[error("Order {0} is cancelled and cannot be split")]
    OrderCancelled(String),
    #[error("Group order validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl GroupOrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GroupOrderError::NotFound(_)
            | GroupOrderError::OrderNotFound(_)
            | GroupOrderError::ShareNotFound { .. } => ErrorKind::NotFound,
            GroupOrderError::AlreadyExists(_)
            | GroupOrderError::InvalidDivisions(_)
            | GroupOrderError::OrderCancelled(_)
            | GroupOrderError::ValidationError(_) => ErrorKind::Validation,
            GroupOrderError::Order(e) => e.kind(),
            GroupOrderError::ActorCommunicationError(_) => ErrorKind::Transient,
        }
    }
}

impl From<FrameworkError> for GroupOrderError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => GroupOrderError::NotFound(id),
            FrameworkError::Conflict(key) => {
                GroupOrderError::AlreadyExists(key.trim_start_matches("order:").to_string())
            }
            FrameworkError::Rejected(msg) => GroupOrderError::ValidationError(msg),
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => {
                GroupOrderError::ActorCommunicationError(e.to_string())
            }
        }
    }
}
