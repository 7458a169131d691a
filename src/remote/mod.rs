//! The REST collaborator: a collection-oriented store of JSON records.

mod http;
mod memory;

pub use http::HttpStore;
pub use memory::{Gate, MemoryStore, StoreOp};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Remote collections the admin tool works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Orders,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Orders => "orders",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Remote store answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Could not decode {collection} record: {message}")]
    Decode { collection: Collection, message: String },
    #[error("Could not encode {collection} record: {message}")]
    Encode { collection: Collection, message: String },
    #[error("Injected failure: {op} on {collection}")]
    Injected { collection: Collection, op: StoreOp },
}

/// Contract of the remote store. Every call is terminal on failure; callers
/// never retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, RemoteError>;

    async fn create(&self, collection: Collection, record: Value) -> Result<Value, RemoteError>;

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<Value, RemoteError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError>;
}

pub fn encode<T: Serialize>(collection: Collection, record: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(record).map_err(|e| RemoteError::Encode {
        collection,
        message: e.to_string(),
    })
}

pub fn decode<T: DeserializeOwned>(collection: Collection, value: Value) -> Result<T, RemoteError> {
    serde_json::from_value(value).map_err(|e| RemoteError::Decode {
        collection,
        message: e.to_string(),
    })
}

pub fn decode_all<T: DeserializeOwned>(
    collection: Collection,
    values: Vec<Value>,
) -> Result<Vec<T>, RemoteError> {
    values.into_iter().map(|v| decode(collection, v)).collect()
}
