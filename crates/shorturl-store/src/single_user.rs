use crate::deleter::DeleteTicket;
use crate::store::{StoreStats, UrlStore};
use shorturl_core::{
    BatchDeleteStatus, BatchItem, BatchResult, PutStatus, Resolution, ShortCode, StoreError,
    UserUrl,
};

/// Namespace used when callers are not scoped per user.
pub const DEFAULT_OWNER: &str = "default";

/// [`UrlStore`] bound to the [`DEFAULT_OWNER`] namespace.
///
/// Every call is made on behalf of one owner token, which defaults to the
/// owner itself. Transports that identify callers by cookie create one
/// façade per token with [`SingleUserStore::with_token`] or call the store
/// directly.
pub struct SingleUserStore {
    store: UrlStore,
    token: String,
}

impl SingleUserStore {
    pub fn new(store: UrlStore) -> Self {
        Self::with_token(store, DEFAULT_OWNER)
    }

    pub fn with_token(store: UrlStore, token: impl Into<String>) -> Self {
        Self {
            store,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The wrapped store, for per-owner calls.
    pub fn store(&self) -> &UrlStore {
        &self.store
    }

    pub async fn put(&self, url: &str) -> Result<(PutStatus, ShortCode), StoreError> {
        self.store.put_for_owner(DEFAULT_OWNER, &self.token, url).await
    }

    pub async fn get(&self, key: &str) -> Resolution {
        self.store.get_for_owner(DEFAULT_OWNER, key).await
    }

    pub async fn delete(&self, key: &str) -> Result<DeleteTicket, StoreError> {
        self.store
            .delete_for_owner(DEFAULT_OWNER, &self.token, key)
            .await
    }

    pub async fn list(&self, base_url: &str) -> Vec<UserUrl> {
        self.store
            .list_for_owner(DEFAULT_OWNER, &self.token, base_url)
            .await
    }

    pub async fn put_batch(
        &self,
        base_url: &str,
        items: Vec<BatchItem>,
    ) -> Result<(PutStatus, Vec<BatchResult>), StoreError> {
        self.store
            .put_batch_for_owner(DEFAULT_OWNER, &self.token, base_url, items)
            .await
    }

    pub async fn delete_batch(
        &self,
        keys: &[String],
    ) -> Result<(BatchDeleteStatus, Vec<DeleteTicket>), StoreError> {
        self.store
            .delete_batch_for_owner(DEFAULT_OWNER, &self.token, keys)
            .await
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub async fn shutdown(self) {
        self.store.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deleter::DeleteOutcome;

    #[tokio::test]
    async fn facade_binds_default_owner() {
        let facade = SingleUserStore::new(UrlStore::in_memory().await);

        let (status, key) = facade.put("http://a.test").await.unwrap();
        assert_eq!(status, PutStatus::Created);
        assert_eq!(key.as_str(), "1");

        assert_eq!(
            facade.store().get_for_owner(DEFAULT_OWNER, "1").await,
            Resolution::Active("http://a.test".to_string())
        );
        assert_eq!(
            facade.store().get_for_owner("someone-else", "1").await,
            Resolution::NotFound
        );
    }

    #[tokio::test]
    async fn tokens_share_the_namespace_but_not_listings() {
        let store = UrlStore::in_memory().await;
        store
            .put_for_owner(DEFAULT_OWNER, "alice", "http://alice.test")
            .await
            .unwrap();
        let facade = SingleUserStore::with_token(store, "bob");
        facade.put("http://bob.test").await.unwrap();

        assert_eq!(facade.get("1").await, Resolution::Active("http://alice.test".to_string()));
        let listed = facade.list("http://s.test").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_url, "http://bob.test");
    }

    #[tokio::test]
    async fn facade_delete_settles() {
        let facade = SingleUserStore::new(UrlStore::in_memory().await);
        facade.put("http://a.test").await.unwrap();

        let ticket = facade.delete("1").await.unwrap();
        assert_eq!(ticket.wait().await, Some(DeleteOutcome::Deleted));
        assert_eq!(facade.get("1").await, Resolution::Deleted("http://a.test".to_string()));
    }
}
