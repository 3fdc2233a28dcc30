use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::actor_framework::{Page, PageRequest};
use crate::catalog_actor::CatalogError;
use crate::domain::{
    CreateItemRequest, CreateOrderRequest, ItemLine, ModifierSnapshot, Order, OrderCreate, OrderFilter, OrderStatus,
    QuoteRequest, VariantSnapshot,
};
use crate::events::{EventAction, EventPublisher};
use crate::order_actor::{check_transition, OrderError};
use crate::search::{SearchIndex, SearchQuery};
use super::{BusinessValidator, CatalogClient, OrderStoreClient};

const REINDEX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct AssemblySettings {
    /// Bound on each catalog or business call.
    pub call_timeout: Duration,
    /// Caps concurrent enrichment tasks per order. `None` runs every item at once.
    pub max_parallel_items: Option<usize>,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            max_parallel_items: None,
        }
    }
}

/// Client for creating and driving orders.
///
/// This client handles the orchestration: it validates the business, prices
/// every line concurrently against the catalog, persists the order and emits
/// the fact that keeps the search index in step.
#[derive(Clone)]
pub struct OrderClient {
    store: OrderStoreClient,
    catalog: Arc<dyn CatalogClient>,
    businesses: Arc<dyn BusinessValidator>,
    publisher: Arc<dyn EventPublisher>,
    index: Arc<dyn SearchIndex>,
    settings: AssemblySettings,
    limiter: Option<Arc<Semaphore>>,
}

impl OrderClient {
    pub fn new(
        store: OrderStoreClient,
        catalog: Arc<dyn CatalogClient>,
        businesses: Arc<dyn BusinessValidator>,
        publisher: Arc<dyn EventPublisher>,
        index: Arc<dyn SearchIndex>,
        settings: AssemblySettings,
    ) -> Self {
        let limiter = settings
            .max_parallel_items
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            store,
            catalog,
            businesses,
            publisher,
            index,
            settings,
            limiter,
        }
    }

    #[instrument(skip(self, request), fields(business_id = %request.business_id, items = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
        info!("Processing create_order request (Client Side)");

        // Step 1: Validate input before any external call
        validate_request(&request)?;

        // Step 2: Validate business
        match timeout(self.settings.call_timeout, self.businesses.exists(&request.business_id)).await {
            Ok(Ok(true)) => debug!("Business validation successful"),
            Ok(Ok(false)) => {
                error!("Business not found");
                return Err(OrderError::BusinessNotFound(request.business_id.clone()));
            }
            Ok(Err(e)) => {
                error!(error = %e, "Business validation failed");
                return Err(OrderError::Upstream(format!("Business validation failed: {}", e)));
            }
            Err(_) => {
                error!("Business validation timed out");
                return Err(OrderError::Upstream("Business validation timed out".to_string()));
            }
        }

        // Step 3: Price every line concurrently
        let items = self.enrich_items(&request.items).await?;

        let total = Order::items_total(&items)
            .ok_or_else(|| OrderError::ValidationError("order total is out of range".to_string()))?;

        // Step 4: Persist
        let order = self
            .store
            .create(OrderCreate {
                business_id: request.business_id,
                branch_id: request.branch_id,
                user_id: request.user_id,
                table: request.table,
                items,
                total,
                notes: request.notes,
            })
            .await?;
        info!(order_id = %order.id, total = %order.total, "Order created");

        // Step 5: Emit the fact; the order stands even if this fails
        self.publish(EventAction::OrderCreated, &order.id).await;
        Ok(order)
    }

    /// Fans out one task per line and re-assembles results in input order.
    ///
    /// Every task runs to completion; if any failed, the error of the lowest
    /// failing position is returned.
    async fn enrich_items(&self, items: &[CreateItemRequest]) -> Result<Vec<ItemLine>, OrderError> {
        let (tx, mut rx) = mpsc::channel(items.len().max(1));
        let mut handles = Vec::with_capacity(items.len());

        for (position, item) in items.iter().cloned().enumerate() {
            let tx = tx.clone();
            let catalog = Arc::clone(&self.catalog);
            let limiter = self.limiter.clone();
            let call_timeout = self.settings.call_timeout;
            let span = tracing::debug_span!("enrich_item", position, item_id = %item.item_id);

            handles.push(tokio::spawn(
                async move {
                    let _permit = match limiter {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    let result = enrich_item(catalog.as_ref(), &item, call_timeout).await;
                    let _ = tx.send((position, result)).await;
                }
                .instrument(span),
            ));
        }
        drop(tx);

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = %e, "Enrichment task failed");
            }
        }

        let mut slots: Vec<Option<Result<ItemLine, CatalogError>>> = (0..items.len()).map(|_| None).collect();
        while let Some((position, result)) = rx.recv().await {
            slots[position] = Some(result);
        }

        let mut lines = Vec::with_capacity(items.len());
        for (position, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(line)) => lines.push(line),
                Some(Err(source)) => {
                    warn!(position, error = %source, "Item enrichment failed");
                    return Err(OrderError::Item {
                        position,
                        item_id: items[position].item_id.clone(),
                        source,
                    });
                }
                None => {
                    return Err(OrderError::Upstream(format!("Enrichment of item #{} was aborted", position)));
                }
            }
        }
        Ok(lines)
    }

    /// Moves an order to `next`, publishing the matching fact.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &str, next: OrderStatus) -> Result<Order, OrderError> {
        let current = self.get_order(id).await?;
        check_transition(current.status, next)?;

        let order = self.store.transition(id, current.status, next).await?;
        info!(from = %current.status, to = %next, "Order status changed");

        let action = if next == OrderStatus::Cancelled {
            EventAction::OrderCancelled
        } else {
            EventAction::OrderStatusChanged
        };
        self.publish(action, id).await;
        Ok(order)
    }

    pub async fn cancel_order(&self, id: &str) -> Result<Order, OrderError> {
        self.update_status(id, OrderStatus::Cancelled).await
    }

    pub async fn get_order(&self, id: &str) -> Result<Order, OrderError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    pub async fn list_orders(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, OrderError> {
        self.store.list(filter, page).await
    }

    /// Queries the index and re-hydrates the hits from the store.
    ///
    /// Ids the store no longer knows are skipped.
    #[instrument(skip(self))]
    pub async fn search_orders(&self, query: &SearchQuery) -> Result<Vec<Order>, OrderError> {
        let ids = self.index.query(query).await?;
        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_order(&id).await? {
                Some(order) => orders.push(order),
                None => debug!(order_id = %id, "Indexed order missing from store, skipping"),
            }
        }
        Ok(orders)
    }

    /// Republishes `order_created` for every stored order.
    ///
    /// Returns how many facts were published; failures are logged and skipped.
    #[instrument(skip(self))]
    pub async fn reindex_all(&self) -> Result<usize, OrderError> {
        let mut published = 0;
        let mut page_number = 1;

        loop {
            let page = self
                .store
                .list(OrderFilter::default(), PageRequest::new(page_number, REINDEX_PAGE_SIZE))
                .await?;
            for order in &page.results {
                match self.publisher.publish(EventAction::OrderCreated, &order.id).await {
                    Ok(()) => published += 1,
                    Err(e) => warn!(order_id = %order.id, error = %e, "Failed to republish order"),
                }
            }
            if page.results.len() < REINDEX_PAGE_SIZE || page_number * REINDEX_PAGE_SIZE >= page.total {
                break;
            }
            page_number += 1;
        }

        info!(published, "Reindex complete");
        Ok(published)
    }

    async fn publish(&self, action: EventAction, order_id: &str) {
        if let Err(e) = self.publisher.publish(action, order_id).await {
            warn!(
                action = %action,
                order_id = %order_id,
                error = %e,
                "Failed to publish event; index will lag until the next reindex"
            );
        }
    }
}

fn validate_request(request: &CreateOrderRequest) -> Result<(), OrderError> {
    if request.business_id.trim().is_empty() {
        return Err(OrderError::ValidationError("business_id is required".to_string()));
    }
    if request.user_id.trim().is_empty() {
        return Err(OrderError::ValidationError("user_id is required".to_string()));
    }
    if request.items.is_empty() {
        return Err(OrderError::ValidationError("at least one item is required".to_string()));
    }
    for (position, item) in request.items.iter().enumerate() {
        if item.item_id.trim().is_empty() {
            return Err(OrderError::ValidationError(format!("item #{} has no item_id", position)));
        }
        if item.quantity == 0 {
            return Err(OrderError::ValidationError(format!("item #{} must have quantity >= 1", position)));
        }
    }
    Ok(())
}

/// Fetches the detail, freezes the chosen options and prices one line.
async fn enrich_item(
    catalog: &dyn CatalogClient,
    item: &CreateItemRequest,
    call_timeout: Duration,
) -> Result<ItemLine, CatalogError> {
    let detail = timeout(call_timeout, catalog.get_item_detail(&item.item_id))
        .await
        .map_err(|_| CatalogError::Timeout(item.item_id.clone()))??;

    let variant = match &item.variant {
        Some(name) => {
            let option = detail.variant(name).ok_or_else(|| CatalogError::UnknownVariant {
                item_id: item.item_id.clone(),
                variant: name.clone(),
            })?;
            Some(VariantSnapshot {
                name: option.name.clone(),
                additional_price: option.additional_price,
            })
        }
        None => None,
    };

    let modifiers = item
        .modifiers
        .iter()
        .map(|name| {
            detail
                .modifier(name)
                .map(|option| ModifierSnapshot {
                    name: option.name.clone(),
                    additional_price: option.additional_price,
                })
                .ok_or_else(|| CatalogError::UnknownModifier {
                    item_id: item.item_id.clone(),
                    modifier: name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let request = QuoteRequest {
        variant: item.variant.clone(),
        modifiers: item.modifiers.clone(),
    };
    let quote = timeout(call_timeout, catalog.get_quote(&item.item_id, &request))
        .await
        .map_err(|_| CatalogError::Timeout(item.item_id.clone()))??;
    let subtotal = quote
        .total_price
        .checked_mul(Decimal::from(item.quantity))
        .ok_or_else(|| CatalogError::ValidationError(format!("line total for {} is out of range", item.item_id)))?;

    Ok(ItemLine {
        item_id: item.item_id.clone(),
        name: detail.name,
        base_price: detail.base_price,
        quantity: item.quantity,
        variant,
        modifiers,
        unit_price: quote.total_price,
        subtotal,
    })
}
