//! HTTP adapters for the external catalog and users services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::business_actor::BusinessError;
use crate::catalog_actor::CatalogError;
use crate::domain::{CatalogItem, Quote, QuoteRequest};
use super::{BusinessValidator, CatalogClient};

fn http_client(timeout: Duration) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

fn catalog_transport_error(item_id: &str, e: reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        CatalogError::Timeout(item_id.to_string())
    } else {
        CatalogError::Transport(e.to_string())
    }
}

/// Catalog service client.
///
/// - `GET {base}/products/{id}` returns the item detail
/// - `POST {base}/products/{id}/quote` returns `{total_price}`
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        Ok(Self {
            client: http_client(timeout).map_err(CatalogError::Transport)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        item_id: &str,
        response: reqwest::Response,
    ) -> Result<T, CatalogError> {
        let status = response.status();
        match status {
            s if s.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| CatalogError::Upstream(format!("invalid body: {}", e))),
            StatusCode::NOT_FOUND => Err(CatalogError::NotFound(item_id.to_string())),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                Err(CatalogError::ValidationError(body))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(CatalogError::Upstream(format!(
                    "HTTP {} - {}",
                    status,
                    body.chars().take(200).collect::<String>()
                )))
            }
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self))]
    async fn get_item_detail(&self, item_id: &str) -> Result<CatalogItem, CatalogError> {
        debug!("Sending request");
        let response = self
            .client
            .get(format!("{}/products/{}", self.base_url, item_id))
            .send()
            .await
            .map_err(|e| catalog_transport_error(item_id, e))?;
        Self::read_json(item_id, response).await
    }

    #[instrument(skip(self, request))]
    async fn get_quote(&self, item_id: &str, request: &QuoteRequest) -> Result<Quote, CatalogError> {
        debug!("Sending request");
        let response = self
            .client
            .post(format!("{}/products/{}/quote", self.base_url, item_id))
            .json(request)
            .send()
            .await
            .map_err(|e| catalog_transport_error(item_id, e))?;
        Self::read_json(item_id, response).await
    }
}

/// Users service client. `GET {base}/businesses/{id}/exists` answers 200 or 404.
#[derive(Clone)]
pub struct HttpBusinessValidator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBusinessValidator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BusinessError> {
        Ok(Self {
            client: http_client(timeout).map_err(BusinessError::Upstream)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BusinessValidator for HttpBusinessValidator {
    #[instrument(skip(self))]
    async fn exists(&self, business_id: &str) -> Result<bool, BusinessError> {
        debug!("Sending request");
        let response = self
            .client
            .get(format!("{}/businesses/{}/exists", self.base_url, business_id))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BusinessError::Timeout
                } else {
                    BusinessError::Upstream(e.to_string())
                }
            })?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(BusinessError::Upstream(format!("HTTP {}", status))),
        }
    }
}
