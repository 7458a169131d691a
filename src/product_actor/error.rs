use crate::actor_framework::{FrameworkError, ReconcileError};
use crate::remote::RemoteError;
use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Product {0} has an operation in flight")]
    OperationInFlight(String),
    #[error("{0}")]
    InsufficientStock(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Product request failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for ProductError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => ProductError::NotFound(id),
            FrameworkError::OperationInFlight(id) => ProductError::OperationInFlight(id),
            FrameworkError::Rejected(reason) => ProductError::InsufficientStock(reason),
            other => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}

impl From<ReconcileError> for ProductError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Framework(e) => e.into(),
            ReconcileError::Remote(e) => e.into(),
        }
    }
}
