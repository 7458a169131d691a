use super::AdminConfig;
use crate::actor_framework::ResourceActor;
use crate::clients::{OrderClient, ProductClient};
use crate::domain::{Order, Product};
use crate::order_actor::OrderError;
use crate::remote::RemoteStore;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Starts the product and order actors, wires them to the remote store, and
/// handles shutdown.
pub struct AdminSystem {
    pub product_client: ProductClient,
    pub order_client: OrderClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl AdminSystem {
    #[instrument(name = "admin_system", skip(config, remote))]
    pub fn start(config: &AdminConfig, remote: Arc<dyn RemoteStore>) -> Self {
        info!("Starting admin system");

        let (product_actor, product_resource_client) =
            ResourceActor::<Product>::new(config.actor_buffer, config.id_strategy);
        let product_client = ProductClient::new(product_resource_client, remote.clone());
        let product_handle = tokio::spawn(product_actor.run());

        let (order_actor, order_resource_client) =
            ResourceActor::<Order>::new(config.actor_buffer, config.id_strategy);
        let order_client = OrderClient::new(
            order_resource_client,
            product_client.clone(),
            remote,
            config.partial_failure,
        );
        let order_handle = tokio::spawn(order_actor.run());

        Self {
            product_client,
            order_client,
            handles: vec![product_handle, order_handle],
        }
    }

    /// Loads both lists from the remote store concurrently.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(usize, usize), OrderError> {
        let (products, orders) = tokio::try_join!(
            async { self.product_client.refresh_products().await.map_err(OrderError::from) },
            self.order_client.refresh_orders(),
        )?;
        info!(products, orders, "Lists loaded");
        Ok((products, orders))
    }

    /// Drops every client, which closes the mailboxes, then waits for the
    /// actors to drain.
    #[instrument(skip(self))]
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down admin system");
        drop(self.order_client);
        drop(self.product_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Actor task failed");
                return Err(format!("Actor task failed: {e:?}"));
            }
        }

        info!("Admin system shutdown complete");
        Ok(())
    }
}
