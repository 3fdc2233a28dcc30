mod domain;
mod clients;
mod config;
mod error;

mod app_system;

#[cfg(test)]
mod mock_framework;

mod actor_framework;
mod business_actor;
mod catalog_actor;
mod group_actor;
mod order_actor;

mod cache;
mod events;
mod index_sync;
mod search;

use rust_decimal::Decimal;
use tracing::{error, info, warn, Instrument};

use crate::actor_framework::PageRequest;
use crate::app_system::{setup_tracing, OrderSystem};
use crate::clients::CatalogWriter;
use crate::config::Config;
use crate::domain::{
    CatalogItemCreate, CatalogItemPatch, CreateItemRequest, CreateOrderRequest, OrderFilter, OrderStatus, PriceOption,
};
use crate::search::SearchQuery;

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = Config::load().map_err(|e| e.to_string())?;

    // Setup tracing once for the entire application
    setup_tracing(&config.log_level);

    info!("Starting orders service");

    let system = OrderSystem::start(&config).map_err(|e| e.to_string())?;

    if system.local_catalog.is_some() && system.local_businesses.is_some() {
        let span = tracing::info_span!("demo");
        if let Err(e) = run_demo(&system).instrument(span).await {
            error!(error = %e, "Demo flow failed");
        }
    } else {
        info!("External services configured, waiting for ctrl-c");
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
        }
    }

    // Shutdown system gracefully
    let stats = system.shutdown().await.map_err(|e| e.to_string())?;
    info!(
        indexed = stats.indexed,
        ignored = stats.ignored,
        requeued = stats.requeued,
        rejected = stats.rejected,
        "Application completed successfully"
    );
    Ok(())
}

/// Seeds the in-process collaborators and walks orders through the main flows.
async fn run_demo(system: &OrderSystem) -> Result<(), String> {
    let (Some(catalog), Some(businesses)) = (&system.local_catalog, &system.local_businesses) else {
        return Err("demo needs the in-process catalog and business directory".to_string());
    };

    let business = businesses.create_business("Taqueria Central").await.map_err(|e| e.to_string())?;
    let tacos = catalog
        .inner()
        .create_item(CatalogItemCreate {
            name: "Tacos".into(),
            base_price: Decimal::new(1500, 2),
            variants: vec![PriceOption::new("large", Decimal::new(200, 2))],
            modifiers: vec![],
        })
        .await
        .map_err(|e| e.to_string())?;
    let burger = catalog
        .inner()
        .create_item(CatalogItemCreate {
            name: "Burger".into(),
            base_price: Decimal::new(2000, 2),
            variants: vec![],
            modifiers: vec![
                PriceOption::new("cheese", Decimal::new(300, 2)),
                PriceOption::new("bacon", Decimal::new(200, 2)),
            ],
        })
        .await
        .map_err(|e| e.to_string())?;
    info!(business_id = %business.id, "Seeded catalog");

    let request = CreateOrderRequest {
        business_id: business.id.clone(),
        user_id: "user_demo".into(),
        table: "T4".into(),
        items: vec![
            CreateItemRequest::new(tacos.id.as_str(), 2).with_variant("large"),
            CreateItemRequest::new(burger.id.as_str(), 1)
                .with_modifier("cheese")
                .with_modifier("bacon"),
        ],
        notes: "no onions".into(),
        ..Default::default()
    };

    let span = tracing::info_span!("order_processing");
    let order = async {
        info!("Processing order through order system");
        system.order_client.create_order(request.clone()).await
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;
    info!(order_id = %order.id, total = %order.total, "Order processed successfully");

    let order = system
        .order_client
        .update_status(&order.id, OrderStatus::Accepted)
        .await
        .map_err(|e| e.to_string())?;
    info!(order_id = %order.id, status = %order.status, "Order accepted");

    let group = system
        .group_client
        .create_group_order(&order.id, 2, vec!["Ana".into()])
        .await
        .map_err(|e| e.to_string())?;
    for share in &group.shares {
        info!(person = %share.display_name, amount = %share.amount, link = %share.payment_link, "Share created");
    }
    for share in &group.shares {
        system
            .group_client
            .update_share_payment(&group.id, &share.person_id, "card")
            .await
            .map_err(|e| e.to_string())?;
    }
    if let Some(settled) = system
        .group_client
        .get_group_order_by_order(&order.id)
        .await
        .map_err(|e| e.to_string())?
    {
        info!(group_id = %settled.id, completed = settled.completed, "Group order settled");
    }

    for next in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Delivered] {
        system
            .order_client
            .update_status(&order.id, next)
            .await
            .map_err(|e| e.to_string())?;
    }
    match system.order_client.cancel_order(&order.id).await {
        Ok(_) => warn!("Delivered order was cancelled"),
        Err(e) => info!(error = %e, kind = %e.kind(), "Delivered order is final"),
    }

    // A price change reaches the next order through the cache.
    let patch = CatalogItemPatch {
        base_price: Some(Decimal::new(1600, 2)),
        ..Default::default()
    };
    catalog.update_item(&tacos.id, patch).await.map_err(|e| e.to_string())?;
    let second = system.order_client.create_order(request.clone()).await.map_err(|e| e.to_string())?;
    info!(order_id = %second.id, total = %second.total, "Repriced order created");
    let cancelled = system.order_client.cancel_order(&second.id).await.map_err(|e| e.to_string())?;
    info!(order_id = %cancelled.id, status = %cancelled.status, "Order cancelled");

    // The index is fed by the consumer, so give it a moment to catch up.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let query = SearchQuery::new("tacos").filter("business_id", business.id.as_str());
    match system.order_client.search_orders(&query).await {
        Ok(found) => info!(hits = found.len(), "Search completed"),
        Err(e) => warn!(error = %e, "Search failed"),
    }

    let page = system
        .order_client
        .list_orders(OrderFilter::default(), PageRequest::default())
        .await
        .map_err(|e| e.to_string())?;
    info!(total = page.total, "Listed orders");
    let reindexed = system.order_client.reindex_all().await.map_err(|e| e.to_string())?;
    info!(reindexed, "Index rebuilt from the store");

    catalog.delete_item(&burger.id).await.map_err(|e| e.to_string())?;
    match system.order_client.create_order(request.clone()).await {
        Ok(_) => warn!("Order priced a deleted item"),
        Err(e) => info!(error = %e, kind = %e.kind(), "Deleted item refused"),
    }

    businesses.set_active(&business.id, false).await.map_err(|e| e.to_string())?;
    match system.order_client.create_order(request).await {
        Ok(_) => warn!("Inactive business accepted an order"),
        Err(e) => info!(error = %e, kind = %e.kind(), "Inactive business refused"),
    }
    Ok(())
}
