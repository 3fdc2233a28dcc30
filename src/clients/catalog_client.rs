use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::catalog_actor::{CatalogAction, CatalogActionResult, CatalogError};
use crate::domain::{CatalogItem, CatalogItemCreate, CatalogItemPatch, Quote, QuoteRequest};

/// Read side of the catalog used while pricing order lines.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn get_item_detail(&self, item_id: &str) -> Result<CatalogItem, CatalogError>;

    async fn get_quote(&self, item_id: &str, request: &QuoteRequest) -> Result<Quote, CatalogError>;
}

/// Write side of the catalog. Only the in-process catalog supports it.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn update_item(&self, item_id: &str, patch: CatalogItemPatch) -> Result<CatalogItem, CatalogError>;

    async fn delete_item(&self, item_id: &str) -> Result<(), CatalogError>;
}

/// Client for the in-process catalog actor.
#[derive(Clone)]
pub struct CatalogItemClient {
    inner: ResourceClient<CatalogItem>,
}

impl CatalogItemClient {
    #[instrument(skip(self))]
    pub async fn create_item(&self, params: CatalogItemCreate) -> Result<CatalogItem, CatalogError> {
        debug!("Sending request");
        self.inner.create(params).await.map_err(CatalogError::from)
    }
}

#[async_trait]
impl CatalogClient for CatalogItemClient {
    async fn get_item_detail(&self, item_id: &str) -> Result<CatalogItem, CatalogError> {
        self.get_item(item_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(item_id.to_string()))
    }

    #[instrument(skip(self, request))]
    async fn get_quote(&self, item_id: &str, request: &QuoteRequest) -> Result<Quote, CatalogError> {
        debug!("Sending request");
        let action = CatalogAction::Quote {
            variant: request.variant.clone(),
            modifiers: request.modifiers.clone(),
        };
        match self.inner.perform_action(item_id.to_string(), action).await? {
            CatalogActionResult::Quoted(quote) => Ok(quote),
            CatalogActionResult::UnknownVariant(variant) => Err(CatalogError::UnknownVariant {
                item_id: item_id.to_string(),
                variant,
            }),
            CatalogActionResult::UnknownModifier(modifier) => Err(CatalogError::UnknownModifier {
                item_id: item_id.to_string(),
                modifier,
            }),
        }
    }
}

#[async_trait]
impl CatalogWriter for CatalogItemClient {
    #[instrument(skip(self, patch))]
    async fn update_item(&self, item_id: &str, patch: CatalogItemPatch) -> Result<CatalogItem, CatalogError> {
        debug!("Sending request");
        self.inner.update(item_id.to_string(), patch).await.map_err(CatalogError::from)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, item_id: &str) -> Result<(), CatalogError> {
        debug!("Sending request");
        self.inner.delete(item_id.to_string()).await.map_err(CatalogError::from)
    }
}

impl_basic_client!(CatalogItemClient, CatalogItem, CatalogError, item);
