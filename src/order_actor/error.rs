use crate::actor_framework::{FrameworkError, ReconcileError};
use crate::product_actor::ProductError;
use crate::remote::RemoteError;
use crate::validation::ValidationError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order or product {0} has an operation in flight")]
    OperationInFlight(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("{0}")]
    InsufficientStock(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Order request failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("Order request failed, stock adjustment was reverted: {0}")]
    StockRestored(RemoteError),
    #[error("Order request failed after stock of product {product_id} was adjusted by {stock_delta}: {order_error}")]
    PartialFailure {
        product_id: String,
        stock_delta: i64,
        order_error: RemoteError,
    },
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            FrameworkError::OperationInFlight(id) => OrderError::OperationInFlight(id),
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}

impl From<ReconcileError> for OrderError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Framework(e) => e.into(),
            ReconcileError::Remote(e) => e.into(),
        }
    }
}

/// Failures of the stock step, seen from the order that triggered it.
impl From<ProductError> for OrderError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::NotFound(id) => OrderError::InvalidProduct(id),
            ProductError::OperationInFlight(id) => OrderError::OperationInFlight(id),
            ProductError::InsufficientStock(reason) => OrderError::InsufficientStock(reason),
            ProductError::Validation(e) => OrderError::Validation(e),
            ProductError::Remote(e) => OrderError::Remote(e),
            ProductError::ActorCommunicationError(msg) => OrderError::ActorCommunicationError(msg),
        }
    }
}
