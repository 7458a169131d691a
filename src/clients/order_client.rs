use crate::actor_framework::{Outcome, ResourceClient};
use crate::app_system::PartialFailurePolicy;
use crate::clients::ProductClient;
use crate::domain::{Order, OrderDraft};
use crate::order_actor::OrderError;
use crate::product_actor::ProductAction;
use crate::remote::{Collection, RemoteError, RemoteStore};
use crate::validation::OrderForm;
use crate::view::{self, OrderRow};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Client for the Orders list.
///
/// Every order create or delete also moves the referenced product's stock,
/// so this client drives two lists and two remote collections per call:
/// 1. apply the order change locally
/// 2. move the product's stock locally and push the product
/// 3. push the order change
///
/// A failure in step 2 rolls back both local changes. A failure in step 3
/// leaves the remote product adjusted; [`PartialFailurePolicy`] decides
/// whether a compensating stock update is issued.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    product_client: ProductClient,
    remote: Arc<dyn RemoteStore>,
    policy: PartialFailurePolicy,
}

impl_client_methods!(OrderClient, Order, OrderError, order);

impl OrderClient {
    pub fn new(
        inner: ResourceClient<Order>,
        product_client: ProductClient,
        remote: Arc<dyn RemoteStore>,
        policy: PartialFailurePolicy,
    ) -> Self {
        Self {
            inner,
            product_client,
            remote,
            policy,
        }
    }

    /// Validates raw input against the current products, then creates the order.
    #[instrument(skip(self, form))]
    pub async fn add_order(&self, form: &OrderForm) -> Result<Order, OrderError> {
        let products = self
            .product_client
            .list_products()
            .await
            .map_err(OrderError::from)?;
        let draft = form.validate(&products.records)?;
        self.create_order(draft).await
    }

    #[instrument(
        fields(product_id = %draft.product_id, quantity = draft.quantity, amount = draft.amount),
        skip(self, draft)
    )]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<Order, OrderError> {
        info!("Processing create_order request");

        // Step 1: Optimistic insert
        let pending = self.inner.begin_create(draft).await?;
        let order = pending.record.clone();

        // Step 2: Reserve stock
        let reserve = ProductAction::ReserveStock(order.quantity);
        if let Err(e) = self
            .product_client
            .adjust_stock(order.product_id.clone(), reserve)
            .await
        {
            error!(error = %e, "Stock reservation failed");
            self.inner.abandon(pending.op).await;
            return Err(e.into());
        }

        // Step 3: Post the order
        let returned = match self.inner.post(self.remote.as_ref(), &order).await {
            Ok(returned) => returned,
            Err(e) => {
                error!(error = %e, "Remote order create failed");
                self.inner.abandon(pending.op).await;
                return Err(self.after_partial_failure(&order.product_id, reserve, e).await);
            }
        };

        let settled = self
            .inner
            .settle(pending.op, Outcome::Committed(returned))
            .await?;
        info!(order_id = %settled.record.id, "Order created successfully");
        Ok(settled.record)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: String) -> Result<Order, OrderError> {
        info!("Processing delete_order request");

        // Step 1: Optimistic delete
        let pending = self.inner.begin_delete(id).await?;
        let order = pending.record.clone();

        // Step 2: Release stock, if the product is still around
        let release = ProductAction::ReleaseStock(order.quantity);
        let product = self
            .product_client
            .get_product(order.product_id.clone())
            .await;
        let stock_moved = match product {
            Ok(Some(_)) => {
                if let Err(e) = self
                    .product_client
                    .adjust_stock(order.product_id.clone(), release)
                    .await
                {
                    error!(error = %e, "Stock release failed");
                    self.inner.abandon(pending.op).await;
                    return Err(e.into());
                }
                true
            }
            Ok(None) => {
                warn!(product_id = %order.product_id, "Product unknown; skipping stock release");
                false
            }
            Err(e) => {
                self.inner.abandon(pending.op).await;
                return Err(e.into());
            }
        };

        // Step 3: Delete the order remotely
        if let Err(e) = self.remote.delete(Collection::Orders, &order.id).await {
            error!(error = %e, "Remote order delete failed");
            self.inner.abandon(pending.op).await;
            if !stock_moved {
                return Err(OrderError::Remote(e));
            }
            return Err(self.after_partial_failure(&order.product_id, release, e).await);
        }

        let settled = self.inner.settle(pending.op, Outcome::Committed(None)).await?;
        info!(order_id = %settled.record.id, "Order deleted successfully");
        Ok(settled.record)
    }

    /// The stock step went through but the order call did not.
    async fn after_partial_failure(
        &self,
        product_id: &str,
        applied: ProductAction,
        order_error: RemoteError,
    ) -> OrderError {
        let partial = OrderError::PartialFailure {
            product_id: product_id.to_string(),
            stock_delta: applied.delta(),
            order_error: order_error.clone(),
        };
        match self.policy {
            PartialFailurePolicy::Report => {
                warn!(
                    product_id,
                    stock_delta = applied.delta(),
                    "Stock left adjusted after failed order call"
                );
                partial
            }
            PartialFailurePolicy::Compensate => {
                warn!(product_id, "Reverting stock adjustment");
                match self
                    .product_client
                    .adjust_stock(product_id.to_string(), applied.inverse())
                    .await
                {
                    Ok(_) => OrderError::StockRestored(order_error),
                    Err(e) => {
                        error!(product_id, error = %e, "Compensating stock update failed");
                        partial
                    }
                }
            }
        }
    }

    /// Orders joined to their product names, filtered by product name.
    #[instrument(skip(self))]
    pub async fn order_rows(&self, query: &str) -> Result<Vec<OrderRow>, OrderError> {
        let (orders, products) = tokio::try_join!(
            async { self.list_orders().await },
            async { self.product_client.list_products().await.map_err(OrderError::from) },
        )?;
        let rows = view::join_product_names(&orders.records, &products.records);
        Ok(view::filter(&rows, query))
    }
}
