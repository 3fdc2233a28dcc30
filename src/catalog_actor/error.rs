use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Catalog item not found: {0}")]
    NotFound(String),
    #[error("Item {item_id} has no variant '{variant}'")]
    UnknownVariant { item_id: String, variant: String },
    #[error("Item {item_id} has no modifier '{modifier}'")]
    UnknownModifier { item_id: String, modifier: String },
    #[error("Catalog validation error: {0}")]
    ValidationError(String),
    #[error("Catalog call timed out: {0}")]
    Timeout(String),
    #[error("Catalog transport error: {0}")]
    Transport(String),
    #[error("Catalog returned an unexpected response: {0}")]
    Upstream(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::UnknownVariant { .. }
            | CatalogError::UnknownModifier { .. }
            | CatalogError::ValidationError(_) => ErrorKind::Validation,
            CatalogError::Timeout(_)
            | CatalogError::Transport(_)
            | CatalogError::Upstream(_)
            | CatalogError::ActorCommunicationError(_) => ErrorKind::Transient,
        }
    }
}

impl From<FrameworkError> for CatalogError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => CatalogError::NotFound(id),
            FrameworkError::Rejected(msg) | FrameworkError::Conflict(msg) => CatalogError::ValidationError(msg),
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => {
                CatalogError::ActorCommunicationError(e.to_string())
            }
        }
    }
}
