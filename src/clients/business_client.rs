use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::business_actor::BusinessError;
use crate::domain::{Business, BusinessCreate, BusinessPatch};

/// Answers whether a business may receive orders.
#[async_trait]
pub trait BusinessValidator: Send + Sync {
    async fn exists(&self, business_id: &str) -> Result<bool, BusinessError>;
}

/// Client for the in-process business directory.
#[derive(Clone)]
pub struct BusinessClient {
    inner: ResourceClient<Business>,
}

impl BusinessClient {
    #[instrument(skip(self))]
    pub async fn create_business(&self, name: &str) -> Result<Business, BusinessError> {
        debug!("Sending request");
        let params = BusinessCreate { name: name.to_string() };
        self.inner.create(params).await.map_err(BusinessError::from)
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, id: &str, active: bool) -> Result<Business, BusinessError> {
        debug!("Sending request");
        let patch = BusinessPatch {
            active: Some(active),
            ..Default::default()
        };
        self.inner.update(id.to_string(), patch).await.map_err(BusinessError::from)
    }
}

#[async_trait]
impl BusinessValidator for BusinessClient {
    /// Inactive businesses count as missing.
    async fn exists(&self, business_id: &str) -> Result<bool, BusinessError> {
        Ok(self.get_business(business_id).await?.is_some_and(|b| b.active))
    }
}

impl_basic_client!(BusinessClient, Business, BusinessError, business);
