use super::{Collection, RemoteError, RemoteStore};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Create,
    Update,
    Delete,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOp::List => "list",
            StoreOp::Create => "create",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Pauses one remote call until released.
///
/// `entered` fires once the call has reached the store; the call then waits
/// for `release`. Both are permit-based, so notifying before anyone waits is
/// not lost.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct State {
    collections: HashMap<Collection, Vec<Value>>,
    next_server_id: Option<u64>,
    // successful calls still allowed before the op starts failing
    failures: HashMap<(Collection, StoreOp), usize>,
    gates: HashMap<(Collection, StoreOp), Arc<Gate>>,
    calls: HashMap<(Collection, StoreOp), usize>,
}

/// In-process [`RemoteStore`] with failure injection, for tests and the demo.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// A store that keeps whatever id the client sent on create.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that assigns its own sequential ids on create, starting at `first`.
    pub fn with_server_ids(first: u64) -> Self {
        let store = Self::default();
        store.lock().next_server_id = Some(first);
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a panicking test thread must not poison the store for the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn seed<T: Serialize>(&self, collection: Collection, records: &[T]) {
        let values = records
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();
        self.lock().collections.insert(collection, values);
    }

    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.lock()
            .collections
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, collection: Collection, id: &str) -> Option<Value> {
        self.records(collection)
            .into_iter()
            .find(|v| id_of(v).as_deref() == Some(id))
    }

    /// Makes every subsequent `op` on `collection` fail.
    pub fn fail(&self, collection: Collection, op: StoreOp) {
        self.fail_after(collection, op, 0);
    }

    /// Lets `successes` more calls through, then fails every later one.
    pub fn fail_after(&self, collection: Collection, op: StoreOp, successes: usize) {
        self.lock().failures.insert((collection, op), successes);
    }

    pub fn recover(&self, collection: Collection, op: StoreOp) {
        self.lock().failures.remove(&(collection, op));
    }

    /// Holds the next `op` on `collection` until the returned gate is released.
    pub fn gate(&self, collection: Collection, op: StoreOp) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.lock().gates.insert((collection, op), gate.clone());
        gate
    }

    pub fn calls(&self, collection: Collection, op: StoreOp) -> usize {
        self.lock().calls.get(&(collection, op)).copied().unwrap_or(0)
    }

    async fn enter(&self, collection: Collection, op: StoreOp) -> Result<(), RemoteError> {
        let gate = {
            let mut state = self.lock();
            *state.calls.entry((collection, op)).or_default() += 1;
            state.gates.remove(&(collection, op))
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut state = self.lock();
        match state.failures.get_mut(&(collection, op)) {
            Some(0) => {
                debug!(%collection, %op, "Injecting failure");
                Err(RemoteError::Injected { collection, op })
            }
            Some(successes) => {
                *successes -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn not_found(collection: Collection, id: &str) -> RemoteError {
    RemoteError::Status {
        status: 404,
        url: format!("memory://{collection}/{id}"),
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, RemoteError> {
        self.enter(collection, StoreOp::List).await?;
        Ok(self.records(collection))
    }

    async fn create(
        &self,
        collection: Collection,
        mut record: Value,
    ) -> Result<Value, RemoteError> {
        self.enter(collection, StoreOp::Create).await?;
        let mut state = self.lock();
        if let Some(next) = state.next_server_id.as_mut() {
            if let Some(fields) = record.as_object_mut() {
                fields.insert("id".to_string(), Value::String(next.to_string()));
            }
            *next += 1;
        }
        state
            .collections
            .entry(collection)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<Value, RemoteError> {
        self.enter(collection, StoreOp::Update).await?;
        let mut state = self.lock();
        let slot = state
            .collections
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|v| id_of(v).as_deref() == Some(id))
            .ok_or_else(|| not_found(collection, id))?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError> {
        self.enter(collection, StoreOp::Delete).await?;
        let mut state = self.lock();
        let records = state.collections.entry(collection).or_default();
        let index = records
            .iter()
            .position(|v| id_of(v).as_deref() == Some(id))
            .ok_or_else(|| not_found(collection, id))?;
        records.remove(index);
        Ok(())
    }
}
