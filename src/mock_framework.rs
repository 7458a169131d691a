//! # Mock Framework
//!
//! Utilities for testing clients without a running actor.
//!
//! Use [`create_mock_client`] to get a client and the receiving end of its
//! mailbox, then answer each request with helpers like [`expect_begin_create`]
//! or [`expect_settle`].

use crate::actor_framework::{
    Entity, FrameworkError, OpId, Outcome, Pending, ResourceClient, ResourceRequest, Settlement,
    Snapshot,
};
use tokio::sync::{mpsc, oneshot};

pub type Responder<R> = oneshot::Sender<Result<R, FrameworkError>>;

/// Creates a client whose requests land on the returned receiver.
///
/// The test plays the actor: it reads each request, checks it, and answers
/// with whatever result the scenario needs.
pub fn create_mock_client<T: Entity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<Responder<Snapshot<T>>> {
    match receiver.recv().await {
        Some(ResourceRequest::List { respond_to }) => Some(respond_to),
        _ => None,
    }
}

pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(String, Responder<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

pub async fn expect_begin_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Draft, Responder<Pending<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::BeginCreate { draft, respond_to }) => Some((draft, respond_to)),
        _ => None,
    }
}

pub async fn expect_begin_delete<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(String, Responder<Pending<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::BeginDelete { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

pub async fn expect_begin_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(String, T::Action, Responder<Pending<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::BeginAction {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

pub async fn expect_settle<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(OpId, Outcome<T>, Responder<Settlement<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Settle {
            op,
            outcome,
            respond_to,
        }) => Some((op, outcome, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::OpState;
    use crate::clients::ProductClient;
    use crate::domain::{Product, ProductDraft};
    use crate::product_actor::{ProductAction, ProductError};
    use crate::remote::{Collection, MemoryStore, StoreOp};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Product>(10);
        let store = Arc::new(MemoryStore::new());
        let product_client = ProductClient::new(client, store.clone());

        let create_task = tokio::spawn(async move {
            product_client
                .create_product(ProductDraft::new("Lamp", 12.5, 4))
                .await
        });

        let (draft, responder) = expect_begin_create(&mut receiver)
            .await
            .expect("Expected BeginCreate request");
        assert_eq!(draft.name, "Lamp");
        let record = Product::new("1", draft.name, draft.price, draft.remaining);
        responder
            .send(Ok(Pending {
                op: OpId(1),
                record: record.clone(),
            }))
            .unwrap();

        let (op, outcome, responder) = expect_settle(&mut receiver)
            .await
            .expect("Expected Settle request");
        assert_eq!(op, OpId(1));
        assert!(matches!(outcome, Outcome::Committed(Some(ref p)) if p.id == "1"));
        responder
            .send(Ok(Settlement {
                state: OpState::Committed,
                record: record.clone(),
            }))
            .unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok(record));
        assert_eq!(store.records(Collection::Products).len(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_rolls_back_failed_update() {
        let (client, mut receiver) = create_mock_client::<Product>(10);
        let store = Arc::new(MemoryStore::new());
        store.fail(Collection::Products, StoreOp::Update);
        let product_client = ProductClient::new(client, store.clone());

        let task = tokio::spawn(async move {
            product_client
                .adjust_stock("1".to_string(), ProductAction::ReserveStock(2))
                .await
        });

        let (id, action, responder) = expect_begin_action(&mut receiver)
            .await
            .expect("Expected BeginAction request");
        assert_eq!(id, "1");
        assert!(matches!(action, ProductAction::ReserveStock(2)));
        responder
            .send(Ok(Pending {
                op: OpId(7),
                record: Product::new("1", "Lamp", 12.5, 2),
            }))
            .unwrap();

        let (op, outcome, responder) = expect_settle(&mut receiver)
            .await
            .expect("Expected Settle request");
        assert_eq!(op, OpId(7));
        assert!(matches!(outcome, Outcome::RolledBack));
        responder
            .send(Ok(Settlement {
                state: OpState::RolledBack,
                record: Product::new("1", "Lamp", 12.5, 4),
            }))
            .unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ProductError::Remote(_))));
    }

    #[tokio::test]
    async fn test_mock_client_surfaces_not_found() {
        let (client, mut receiver) = create_mock_client::<Product>(10);
        let store = Arc::new(MemoryStore::new());
        let product_client = ProductClient::new(client, store.clone());

        let task = tokio::spawn(async move { product_client.delete_product("7".into()).await });

        let (id, responder) = expect_begin_delete(&mut receiver)
            .await
            .expect("Expected BeginDelete request");
        responder.send(Err(FrameworkError::NotFound(id))).unwrap();

        let result = task.await.unwrap();
        assert_eq!(result, Err(ProductError::NotFound("7".into())));
        assert_eq!(store.calls(Collection::Products, StoreOp::Delete), 0);
    }
}
