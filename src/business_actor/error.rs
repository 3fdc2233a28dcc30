use thiserror::Error;

use crate::actor_framework::FrameworkError;

/// Errors that can occur while checking or managing businesses.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BusinessError {
    #[error("Business validation error: {0}")]
    ValidationError(String),
    #[error("Business lookup timed out")]
    Timeout,
    #[error("Users service error: {0}")]
    Upstream(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for BusinessError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::Rejected(msg) | FrameworkError::Conflict(msg) => BusinessError::ValidationError(msg),
            other => BusinessError::ActorCommunicationError(other.to_string()),
        }
    }
}
