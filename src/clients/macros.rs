/// Read-side methods shared by the typed clients: lookup, versioned listing,
/// search, and reloading from the remote collection.
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            #[allow(dead_code)]
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: String) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.get(id).await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<list_ $entity_name_snake s>](&self) -> Result<crate::actor_framework::Snapshot<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.list().await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<search_ $entity_name_snake s>](&self, query: &str) -> Result<Vec<$entity>, $error> {
                    let snapshot = self.[<list_ $entity_name_snake s>]().await?;
                    Ok(crate::view::filter(&snapshot.records, query))
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<refresh_ $entity_name_snake s>](&self) -> Result<usize, $error> {
                    tracing::debug!("Reloading from remote");
                    self.inner.refresh(self.remote.as_ref()).await.map_err(<$error>::from)
                }
            }
        }
    };
}
