use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::cache::{cache_key, Cache};
use crate::catalog_actor::CatalogError;
use crate::domain::{CatalogItem, CatalogItemPatch, Quote, QuoteRequest};
use super::{CatalogClient, CatalogWriter};

const ITEM_ENTITY: &str = "item";

/// Read-through cache of item details in front of a catalog client.
///
/// Cache failures never fail a read; the catalog is asked directly instead.
/// Quotes are not cached.
#[derive(Clone)]
pub struct CachedCatalog<C> {
    inner: C,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl<C> CachedCatalog<C> {
    pub fn new(inner: C, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drops the cached detail of one item.
    pub async fn invalidate(&self, item_id: &str) {
        if let Err(e) = self.cache.delete(&cache_key(ITEM_ENTITY, item_id)).await {
            warn!(item_id = %item_id, error = %e, "Failed to invalidate cached item");
        }
    }

    async fn cached(&self, key: &str) -> Option<CatalogItem> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                None
            }
        }
    }
}

#[async_trait]
impl<C: CatalogClient> CatalogClient for CachedCatalog<C> {
    #[instrument(skip(self))]
    async fn get_item_detail(&self, item_id: &str) -> Result<CatalogItem, CatalogError> {
        let key = cache_key(ITEM_ENTITY, item_id);
        if let Some(item) = self.cached(&key).await {
            debug!("Cache hit");
            return Ok(item);
        }

        let item = self.inner.get_item_detail(item_id).await?;
        match serde_json::to_vec(&item) {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(&key, bytes, self.ttl).await {
                    warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to encode item for cache"),
        }
        Ok(item)
    }

    async fn get_quote(&self, item_id: &str, request: &QuoteRequest) -> Result<Quote, CatalogError> {
        self.inner.get_quote(item_id, request).await
    }
}

/// Writes go to the catalog first; the cached entry is then deleted, never
/// overwritten with the written value.
#[async_trait]
impl<C: CatalogWriter> CatalogWriter for CachedCatalog<C> {
    async fn update_item(&self, item_id: &str, patch: CatalogItemPatch) -> Result<CatalogItem, CatalogError> {
        let item = self.inner.update_item(item_id, patch).await?;
        self.invalidate(item_id).await;
        Ok(item)
    }

    async fn delete_item(&self, item_id: &str) -> Result<(), CatalogError> {
        self.inner.delete_item(item_id).await?;
        self.invalidate(item_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    use crate::cache::MemoryCache;

    struct CountingCatalog {
        item: Mutex<CatalogItem>,
        detail_calls: AtomicU32,
    }

    impl CountingCatalog {
        fn new() -> Self {
            Self {
                item: Mutex::new(CatalogItem {
                    id: "item_1".into(),
                    name: "Burger".into(),
                    base_price: Decimal::new(1500, 2),
                    variants: vec![],
                    modifiers: vec![],
                }),
                detail_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogClient for CountingCatalog {
        async fn get_item_detail(&self, item_id: &str) -> Result<CatalogItem, CatalogError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            let item = self.item.lock().await.clone();
            if item.id == item_id {
                Ok(item)
            } else {
                Err(CatalogError::NotFound(item_id.to_string()))
            }
        }

        async fn get_quote(&self, _item_id: &str, _request: &QuoteRequest) -> Result<Quote, CatalogError> {
            Ok(Quote { total_price: self.item.lock().await.base_price })
        }
    }

    #[async_trait]
    impl CatalogWriter for CountingCatalog {
        async fn update_item(&self, _item_id: &str, patch: CatalogItemPatch) -> Result<CatalogItem, CatalogError> {
            let mut item = self.item.lock().await;
            if let Some(price) = patch.base_price {
                item.base_price = price;
            }
            Ok(item.clone())
        }

        async fn delete_item(&self, item_id: &str) -> Result<(), CatalogError> {
            self.item.lock().await.id = format!("deleted-{}", item_id);
            Ok(())
        }
    }

    fn cached(cache: Arc<MemoryCache>) -> CachedCatalog<CountingCatalog> {
        CachedCatalog::new(CountingCatalog::new(), cache, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_read_through() {
        let cache = Arc::new(MemoryCache::new());
        let catalog = cached(cache.clone());

        catalog.get_item_detail("item_1").await.unwrap();
        catalog.get_item_detail("item_1").await.unwrap();

        assert_eq!(catalog.inner().detail_calls.load(Ordering::SeqCst), 1);
        assert!(cache.get("item:item_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_invalidates_instead_of_writing() {
        let cache = Arc::new(MemoryCache::new());
        let catalog = cached(cache.clone());
        catalog.get_item_detail("item_1").await.unwrap();

        let patch = CatalogItemPatch { base_price: Some(Decimal::new(1800, 2)), ..Default::default() };
        catalog.update_item("item_1", patch).await.unwrap();
        assert!(cache.get("item:item_1").await.unwrap().is_none());

        let fresh = catalog.get_item_detail("item_1").await.unwrap();
        assert_eq!(fresh.base_price, Decimal::new(1800, 2));
        assert_eq!(catalog.inner().detail_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_invalidates() {
        let cache = Arc::new(MemoryCache::new());
        let catalog = cached(cache.clone());
        catalog.get_item_detail("item_1").await.unwrap();

        catalog.delete_item("item_1").await.unwrap();
        assert!(matches!(
            catalog.get_item_detail("item_1").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = Arc::new(MemoryCache::new());
        let catalog = cached(cache.clone());
        assert!(catalog.get_item_detail("nope").await.is_err());
        assert_eq!(cache.len(), 0);
    }
}
