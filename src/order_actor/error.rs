use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::catalog_actor::CatalogError;
use crate::domain::OrderStatus;
use crate::error::ErrorKind;
use crate::search::SearchError;
use super::state_machine::IllegalTransition;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Business not found: {0}")]
    BusinessNotFound(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    #[error("Order {id} is {found}, expected {expected}")]
    StatusConflict {
        id: String,
        expected: OrderStatus,
        found: OrderStatus,
    },
    #[error("Item #{position} ({item_id}) failed: {source}")]
    Item {
        position: usize,
        item_id: String,
        #[source]
        source: CatalogError,
    },
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("Search error: {0}")]
    Search(#[from] SearchError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound(_) | OrderError::BusinessNotFound(_) => ErrorKind::NotFound,
            OrderError::ValidationError(_)
            | OrderError::IllegalTransition(_)
            | OrderError::StatusConflict { .. }
            | OrderError::Search(SearchError::InvalidQuery(_)) => ErrorKind::Validation,
            OrderError::Item { source, .. } => source.kind(),
            OrderError::Upstream(_) | OrderError::Search(_) | OrderError::ActorCommunicationError(_) => {
                ErrorKind::Transient
            }
        }
    }
}

impl From<FrameworkError> for OrderError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            FrameworkError::Rejected(msg) | FrameworkError::Conflict(msg) => OrderError::ValidationError(msg),
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => {
                OrderError::ActorCommunicationError(e.to_string())
            }
        }
    }
}
