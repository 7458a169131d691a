use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Display};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::remote::{self, Collection, RemoteError, RemoteStore};
use crate::view::Searchable;

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any record must implement to be mirrored by a [`ResourceActor`].
pub trait Entity:
    Clone + Debug + Serialize + DeserializeOwned + Searchable + Send + Sync + 'static
{
    /// Validated input for a new record, lacking an id.
    type Draft: Send + Sync + Debug;
    /// In-place mutation applied optimistically and reverted on failure.
    type Action: Send + Sync + Debug;

    /// Remote collection the records live in.
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Construct the full record from a provisional id and a draft.
    fn from_draft(id: String, draft: Self::Draft) -> Self;

    /// Apply a domain action. An `Err` rejects it with nothing changed.
    fn handle_action(&mut self, action: Self::Action) -> Result<(), String>;
}

/// How provisional ids are generated for optimistic inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// One past the largest numeric id known locally.
    #[default]
    Sequential,
    /// Current time in milliseconds, bumped past any id already taken.
    Timestamp,
}

impl IdStrategy {
    fn next_id<'a>(self, taken: impl Iterator<Item = &'a str> + Clone) -> String {
        let max_numeric = taken.clone().filter_map(|id| id.parse::<u64>().ok()).max();
        // None once the largest numeric id is u64::MAX
        let successor = match self {
            IdStrategy::Sequential => max_numeric.map_or(Some(1), |max| max.checked_add(1)),
            IdStrategy::Timestamp => {
                let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
                max_numeric.map_or(Some(now), |max| max.checked_add(1).map(|next| next.max(now)))
            }
        };
        let start = successor.unwrap_or(1);
        let is_free = |candidate: &u64| {
            let candidate = candidate.to_string();
            !taken.clone().any(|id| id == candidate)
        };
        (start..=u64::MAX)
            .chain(1..start)
            .find(is_free)
            .map_or_else(|| format!("local-{}", taken.clone().count()), |n| n.to_string())
    }
}

/// Ticket of one optimistic operation awaiting settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId(pub(crate) u64);

impl Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op_{}", self.0)
    }
}

/// How a pending operation ended. An operation is pending from its `Begin*`
/// request, which hands out a [`Pending`], until it is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Committed,
    RolledBack,
}

/// What the remote side said about a pending operation.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Accepted. Carries the record the store returned, if it returned one.
    Committed(Option<T>),
    RolledBack,
}

/// An optimistic operation that has been applied locally and is awaiting
/// settlement into [`OpState::Committed`] or [`OpState::RolledBack`].
#[derive(Debug, Clone)]
pub struct Pending<T> {
    pub op: OpId,
    /// The record as inserted or mutated, or the record removed by a delete.
    pub record: T,
}

/// Final word on a settled operation.
#[derive(Debug, Clone)]
pub struct Settlement<T> {
    pub state: OpState,
    /// The record as it now stands locally (for deletes, the removed record).
    pub record: T,
}

/// Versioned copy of the local list.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub version: u64,
    pub records: Vec<T>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Operation already in flight for: {0}")]
    OperationInFlight(String),
    #[error("Unknown or settled operation: {0}")]
    UnknownOperation(OpId),
    #[error("Action rejected: {0}")]
    Rejected(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped the response")]
    ActorDropped,
}

/// Failure of a full reconcile round trip (local apply, remote call, settle).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReconcileError {
    #[error(transparent)]
    Framework(#[from] FrameworkError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    List {
        respond_to: Response<Snapshot<T>>,
    },
    Get {
        id: String,
        respond_to: Response<Option<T>>,
    },
    Replace {
        records: Vec<T>,
        respond_to: Response<u64>,
    },
    BeginCreate {
        draft: T::Draft,
        respond_to: Response<Pending<T>>,
    },
    BeginDelete {
        id: String,
        respond_to: Response<Pending<T>>,
    },
    BeginAction {
        id: String,
        action: T::Action,
        respond_to: Response<Pending<T>>,
    },
    Settle {
        op: OpId,
        outcome: Outcome<T>,
        respond_to: Response<Settlement<T>>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

#[derive(Debug)]
enum OpKind<T> {
    Create,
    /// `preceding` holds the ids that came before the record, nearest last.
    Delete { preceding: Vec<String>, record: T },
    Action { previous: T },
}

#[derive(Debug)]
struct PendingOp<T> {
    id: String,
    kind: OpKind<T>,
}

/// Owns one collection's ordered list. Every mutation goes through its
/// mailbox, so the list is only ever touched from this task.
pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    records: Vec<T>,
    version: u64,
    pending: HashMap<OpId, PendingOp<T>>,
    in_flight: HashSet<String>,
    next_op: u64,
    id_strategy: IdStrategy,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(buffer_size: usize, id_strategy: IdStrategy) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            records: Vec::new(),
            version: 0,
            pending: HashMap::new(),
            in_flight: HashSet::new(),
            next_op: 1,
            id_strategy,
        };
        (actor, ResourceClient::new(sender))
    }

    #[instrument(name = "resource_actor", skip(self), fields(collection = %T::COLLECTION))]
    pub async fn run(mut self) {
        info!("Actor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::List { respond_to } => {
                    let _ = respond_to.send(Ok(self.snapshot()));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let record = self.position(&id).map(|i| self.records[i].clone());
                    let _ = respond_to.send(Ok(record));
                }
                ResourceRequest::Replace { records, respond_to } => {
                    let _ = respond_to.send(self.handle_replace(records));
                }
                ResourceRequest::BeginCreate { draft, respond_to } => {
                    let _ = respond_to.send(Ok(self.handle_begin_create(draft)));
                }
                ResourceRequest::BeginDelete { id, respond_to } => {
                    let _ = respond_to.send(self.handle_begin_delete(id));
                }
                ResourceRequest::BeginAction { id, action, respond_to } => {
                    let _ = respond_to.send(self.handle_begin_action(id, action));
                }
                ResourceRequest::Settle { op, outcome, respond_to } => {
                    let _ = respond_to.send(self.handle_settle(op, outcome));
                }
            }
        }
        info!(pending = self.pending.len(), "Actor stopped");
    }

    fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            version: self.version,
            records: self.records.clone(),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    fn track(&mut self, id: String, kind: OpKind<T>) -> OpId {
        let op = OpId(self.next_op);
        self.next_op += 1;
        self.in_flight.insert(id.clone());
        self.pending.insert(op, PendingOp { id, kind });
        self.version += 1;
        op
    }

    fn guard(&self, id: &str) -> Result<(), FrameworkError> {
        if self.in_flight.contains(id) {
            warn!(id, "Operation already in flight");
            return Err(FrameworkError::OperationInFlight(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    fn handle_replace(&mut self, records: Vec<T>) -> Result<u64, FrameworkError> {
        if let Some(busy) = self.in_flight.iter().next() {
            return Err(FrameworkError::OperationInFlight(busy.clone()));
        }
        self.records = records;
        self.version += 1;
        info!(version = self.version, "List replaced");
        Ok(self.version)
    }

    #[instrument(skip(self, draft))]
    fn handle_begin_create(&mut self, draft: T::Draft) -> Pending<T> {
        let taken = self
            .records
            .iter()
            .map(|r| r.id())
            .chain(self.in_flight.iter().map(String::as_str));
        let id = self.id_strategy.next_id(taken);
        let record = T::from_draft(id.clone(), draft);
        self.records.push(record.clone());
        let op = self.track(id.clone(), OpKind::Create);
        debug!(%op, provisional_id = %id, "Optimistic insert");
        Pending { op, record }
    }

    #[instrument(skip(self))]
    fn handle_begin_delete(&mut self, id: String) -> Result<Pending<T>, FrameworkError> {
        self.guard(&id)?;
        let index = self
            .position(&id)
            .ok_or_else(|| FrameworkError::NotFound(id.clone()))?;
        let preceding = self.records[..index]
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        let record = self.records.remove(index);
        let op = self.track(
            id,
            OpKind::Delete {
                preceding,
                record: record.clone(),
            },
        );
        debug!(%op, index, "Optimistic delete");
        Ok(Pending { op, record })
    }

    #[instrument(skip(self))]
    fn handle_begin_action(
        &mut self,
        id: String,
        action: T::Action,
    ) -> Result<Pending<T>, FrameworkError> {
        self.guard(&id)?;
        let index = self
            .position(&id)
            .ok_or_else(|| FrameworkError::NotFound(id.clone()))?;
        let previous = self.records[index].clone();
        self.records[index]
            .handle_action(action)
            .map_err(FrameworkError::Rejected)?;
        let record = self.records[index].clone();
        let op = self.track(id, OpKind::Action { previous });
        debug!(%op, "Optimistic update");
        Ok(Pending { op, record })
    }

    #[instrument(skip(self, outcome))]
    fn handle_settle(
        &mut self,
        op: OpId,
        outcome: Outcome<T>,
    ) -> Result<Settlement<T>, FrameworkError> {
        let PendingOp { id, kind } = self
            .pending
            .remove(&op)
            .ok_or(FrameworkError::UnknownOperation(op))?;
        self.in_flight.remove(&id);

        let settlement = match (kind, outcome) {
            (OpKind::Create, Outcome::Committed(returned)) => Settlement {
                state: OpState::Committed,
                record: self.commit_create(id, returned)?,
            },
            (OpKind::Create, Outcome::RolledBack) => {
                let index = self.position(&id).ok_or(FrameworkError::NotFound(id))?;
                let record = self.records.remove(index);
                self.version += 1;
                Settlement {
                    state: OpState::RolledBack,
                    record,
                }
            }
            (OpKind::Delete { record, .. }, Outcome::Committed(_)) => Settlement {
                state: OpState::Committed,
                record,
            },
            (OpKind::Delete { preceding, record }, Outcome::RolledBack) => {
                // after the nearest surviving predecessor, so relative order holds
                let index = preceding
                    .iter()
                    .rev()
                    .find_map(|id| self.position(id))
                    .map_or(0, |i| i + 1);
                self.records.insert(index, record.clone());
                self.version += 1;
                Settlement {
                    state: OpState::RolledBack,
                    record,
                }
            }
            (OpKind::Action { .. }, Outcome::Committed(_)) => {
                let index = self.position(&id).ok_or(FrameworkError::NotFound(id))?;
                Settlement {
                    state: OpState::Committed,
                    record: self.records[index].clone(),
                }
            }
            (OpKind::Action { previous }, Outcome::RolledBack) => {
                if let Some(index) = self.position(&id) {
                    self.records[index] = previous.clone();
                    self.version += 1;
                }
                Settlement {
                    state: OpState::RolledBack,
                    record: previous,
                }
            }
        };

        match settlement.state {
            OpState::RolledBack => error!(%op, id = settlement.record.id(), "Rolled back"),
            OpState::Committed => info!(%op, id = settlement.record.id(), "Committed"),
        }
        Ok(settlement)
    }

    /// Swaps the provisional id for the one the store assigned.
    fn commit_create(
        &mut self,
        provisional: String,
        returned: Option<T>,
    ) -> Result<T, FrameworkError> {
        let index = self
            .position(&provisional)
            .ok_or_else(|| FrameworkError::NotFound(provisional.clone()))?;
        let durable = returned
            .map(|r| r.id().to_string())
            .filter(|id| !id.is_empty() && *id != provisional);
        if let Some(durable) = durable {
            if self.position(&durable).is_some() {
                warn!(
                    %provisional,
                    %durable,
                    "Server id already used locally; keeping provisional id"
                );
            } else {
                debug!(%provisional, %durable, "Reconciled provisional id");
                self.records[index].set_id(durable);
                self.version += 1;
            }
        }
        Ok(self.records[index].clone())
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Debug)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub(crate) fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn call<R>(
        &self,
        make: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(make(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn list(&self) -> Result<Snapshot<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::List { respond_to }).await
    }

    pub async fn get(&self, id: String) -> Result<Option<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn replace(&self, records: Vec<T>) -> Result<u64, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Replace { records, respond_to })
            .await
    }

    pub async fn begin_create(&self, draft: T::Draft) -> Result<Pending<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::BeginCreate { draft, respond_to })
            .await
    }

    pub async fn begin_delete(&self, id: String) -> Result<Pending<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::BeginDelete { id, respond_to })
            .await
    }

    pub async fn begin_action(
        &self,
        id: String,
        action: T::Action,
    ) -> Result<Pending<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::BeginAction {
            id,
            action,
            respond_to,
        })
        .await
    }

    pub async fn settle(
        &self,
        op: OpId,
        outcome: Outcome<T>,
    ) -> Result<Settlement<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Settle {
            op,
            outcome,
            respond_to,
        })
        .await
    }

    /// Rolls `op` back. Failing to do so is only logged; the caller is
    /// already reporting the failure that caused the rollback.
    pub async fn abandon(&self, op: OpId) {
        if let Err(e) = self.settle(op, Outcome::RolledBack).await {
            error!(%op, error = %e, "Rollback could not be applied");
        }
    }

    async fn roll_back(&self, op: OpId, cause: ReconcileError) -> ReconcileError {
        self.abandon(op).await;
        cause
    }

    /// Replaces the local list with the remote collection.
    #[instrument(skip(self, remote), fields(collection = %T::COLLECTION))]
    pub async fn refresh(&self, remote: &dyn RemoteStore) -> Result<usize, ReconcileError> {
        let values = remote.list(T::COLLECTION).await?;
        let records: Vec<T> = remote::decode_all(T::COLLECTION, values)?;
        let count = records.len();
        self.replace(records).await?;
        Ok(count)
    }

    /// Optimistic create: insert locally, post, roll back on failure.
    #[instrument(skip(self, remote), fields(collection = %T::COLLECTION))]
    pub async fn create(
        &self,
        remote: &dyn RemoteStore,
        draft: T::Draft,
    ) -> Result<T, ReconcileError> {
        let pending = self.begin_create(draft).await?;
        let returned = match self.post(remote, &pending.record).await {
            Ok(returned) => returned,
            Err(e) => {
                error!(id = pending.record.id(), error = %e, "Remote create failed");
                return Err(self.roll_back(pending.op, e.into()).await);
            }
        };
        let settled = self
            .settle(pending.op, Outcome::Committed(returned))
            .await?;
        Ok(settled.record)
    }

    /// Posts a freshly inserted record. An unreadable response still counts
    /// as success; the provisional id is kept.
    pub async fn post(
        &self,
        remote: &dyn RemoteStore,
        record: &T,
    ) -> Result<Option<T>, RemoteError> {
        let body = remote::encode(T::COLLECTION, record)?;
        let created = remote.create(T::COLLECTION, body).await?;
        match remote::decode::<T>(T::COLLECTION, created) {
            Ok(returned) => {
                debug!(id = returned.id(), "Remote create returned record");
                Ok(Some(returned))
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable create response");
                Ok(None)
            }
        }
    }

    /// Optimistic delete: remove locally, delete remotely, reinsert on failure.
    #[instrument(skip(self, remote), fields(collection = %T::COLLECTION))]
    pub async fn delete(&self, remote: &dyn RemoteStore, id: String) -> Result<T, ReconcileError> {
        let pending = self.begin_delete(id).await?;
        if let Err(e) = remote.delete(T::COLLECTION, pending.record.id()).await {
            error!(id = pending.record.id(), error = %e, "Remote delete failed");
            return Err(self.roll_back(pending.op, e.into()).await);
        }
        let settled = self.settle(pending.op, Outcome::Committed(None)).await?;
        Ok(settled.record)
    }

    /// Optimistic in-place update: apply the action locally, push the full
    /// record, restore the previous record on failure.
    #[instrument(skip(self, remote), fields(collection = %T::COLLECTION))]
    pub async fn apply(
        &self,
        remote: &dyn RemoteStore,
        id: String,
        action: T::Action,
    ) -> Result<T, ReconcileError> {
        let pending = self.begin_action(id, action).await?;
        let pushed = match remote::encode(T::COLLECTION, &pending.record) {
            Ok(body) => remote.update(T::COLLECTION, pending.record.id(), body).await,
            Err(e) => Err(e),
        };
        if let Err(e) = pushed {
            error!(id = pending.record.id(), error = %e, "Remote update failed");
            return Err(self.roll_back(pending.op, e.into()).await);
        }
        let settled = self.settle(pending.op, Outcome::Committed(None)).await?;
        Ok(settled.record)
    }
}

// =============================================================================
// 5. TESTS
// =============================================================================
