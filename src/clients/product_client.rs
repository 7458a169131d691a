use crate::actor_framework::ResourceClient;
use crate::domain::{Product, ProductDraft};
use crate::product_actor::{ProductAction, ProductError};
use crate::remote::RemoteStore;
use crate::validation::ProductForm;
use std::sync::Arc;
use tracing::{info, instrument};

/// Client for the Products list and its remote collection.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
    remote: Arc<dyn RemoteStore>,
}

impl_client_methods!(ProductClient, Product, ProductError, product);

impl ProductClient {
    pub fn new(inner: ResourceClient<Product>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { inner, remote }
    }

    /// Validates raw input, then creates the product.
    #[instrument(skip(self, form))]
    pub async fn add_product(&self, form: &ProductForm) -> Result<Product, ProductError> {
        let draft = form.validate()?;
        self.create_product(draft).await
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, ProductError> {
        let product = self.inner.create(self.remote.as_ref(), draft).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: String) -> Result<Product, ProductError> {
        let product = self.inner.delete(self.remote.as_ref(), id).await?;
        info!(product_id = %product.id, "Product deleted");
        Ok(product)
    }

    /// Moves stock locally and pushes the full product record.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        id: String,
        action: ProductAction,
    ) -> Result<Product, ProductError> {
        let product = self.inner.apply(self.remote.as_ref(), id, action).await?;
        info!(product_id = %product.id, remaining = product.remaining, "Stock adjusted");
        Ok(product)
    }
}
