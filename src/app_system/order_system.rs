use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::actor_framework::ResourceActor;
use crate::cache::{Cache, MemoryCache};
use crate::clients::{
    AssemblySettings, BusinessClient, BusinessValidator, CachedCatalog, CatalogClient, CatalogItemClient,
    GroupOrderClient, HttpBusinessValidator, HttpCatalogClient, OrderClient, OrderStoreClient,
};
use crate::config::Config;
use crate::domain::{Business, CatalogItem, GroupOrder, Order};
use crate::events::{
    channel_queue, AmqpPublisher, AmqpSource, ChannelPublisher, ChannelSource, EventPublisher, EventSource,
};
use crate::index_sync::{IndexSyncConsumer, SyncStats};
use crate::search::{MemoryIndex, SearchIndex, SolrIndex};
use super::SystemError;

const ACTOR_BUFFER: usize = 64;

fn next_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// The main application system that orchestrates all actors.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
/// Collaborators with a configured URL talk to the real service; the rest run
/// in-process, and their admin clients are exposed as `local_*`.
pub struct OrderSystem {
    pub order_client: OrderClient,
    pub group_client: GroupOrderClient,
    pub local_catalog: Option<CachedCatalog<CatalogItemClient>>,
    pub local_businesses: Option<BusinessClient>,
    order_store: OrderStoreClient,
    shutdown: CancellationToken,
    consumer: JoinHandle<SyncStats>,
    handles: Vec<JoinHandle<()>>,
}

impl OrderSystem {
    /// Starts every actor and the index sync consumer. Must run inside a tokio runtime.
    pub fn start(config: &Config) -> Result<Self, SystemError> {
        info!("Starting order system");
        let timeout = config.services.http_timeout();
        let mut handles = Vec::new();

        // 1. Order store
        let (order_actor, order_resource) = ResourceActor::<Order>::new("orders", ACTOR_BUFFER, next_uuid);
        handles.push(tokio::spawn(order_actor.run()));
        let order_store = OrderStoreClient::new(order_resource);

        // 2. Catalog behind the detail cache
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let ttl = config.cache.ttl();
        let (catalog, local_catalog): (Arc<dyn CatalogClient>, _) = match &config.services.catalog_url {
            Some(url) => {
                info!(url = %url, "Using HTTP catalog");
                let http = HttpCatalogClient::new(url.as_str(), timeout)?;
                (Arc::new(CachedCatalog::new(http, cache, ttl)), None)
            }
            None => {
                info!("Using in-process catalog");
                let (actor, resource) = ResourceActor::<CatalogItem>::new("catalog", ACTOR_BUFFER, next_uuid);
                handles.push(tokio::spawn(actor.run()));
                let cached = CachedCatalog::new(CatalogItemClient::new(resource), cache, ttl);
                (Arc::new(cached.clone()), Some(cached))
            }
        };

        // 3. Business validation
        let (businesses, local_businesses): (Arc<dyn BusinessValidator>, _) = match &config.services.users_url {
            Some(url) => {
                info!(url = %url, "Using HTTP users service");
                (Arc::new(HttpBusinessValidator::new(url.as_str(), timeout)?), None)
            }
            None => {
                info!("Using in-process business directory");
                let (actor, resource) = ResourceActor::<Business>::new("businesses", ACTOR_BUFFER, next_uuid);
                handles.push(tokio::spawn(actor.run()));
                let client = BusinessClient::new(resource);
                (Arc::new(client.clone()), Some(client))
            }
        };

        // 4. Event queue
        let queue = config.messaging.queue.as_str();
        let (publisher, source): (Arc<dyn EventPublisher>, Box<dyn EventSource>) = match &config.messaging.amqp_url {
            Some(url) => {
                info!(queue = %queue, "Using AMQP queue");
                (
                    Arc::new(AmqpPublisher::new(url.as_str(), queue)),
                    Box::new(AmqpSource::new(url.as_str(), queue)),
                )
            }
            None => {
                info!("Using in-process queue");
                let (publisher, source): (ChannelPublisher, ChannelSource) = channel_queue();
                (Arc::new(publisher), Box::new(source))
            }
        };

        // 5. Search index
        let index: Arc<dyn SearchIndex> = match &config.services.solr_url {
            Some(url) => {
                info!(url = %url, "Using Solr index");
                Arc::new(SolrIndex::new(url.as_str(), timeout)?)
            }
            None => {
                info!("Using in-process search index");
                Arc::new(MemoryIndex::new())
            }
        };

        // 6. Group orders
        let (group_actor, group_resource) = ResourceActor::<GroupOrder>::new("group_orders", ACTOR_BUFFER, next_uuid);
        handles.push(tokio::spawn(group_actor.run()));
        let group_client = GroupOrderClient::new(group_resource, order_store.clone(), publisher.clone());

        // 7. Index sync consumer
        let shutdown = CancellationToken::new();
        let consumer = IndexSyncConsumer::new(source, Arc::new(order_store.clone()), index.clone(), shutdown.clone());
        let consumer = tokio::spawn(consumer.run());

        // 8. Assembly engine
        let settings = AssemblySettings {
            call_timeout: timeout,
            max_parallel_items: config.assembly.max_parallel_items,
        };
        let order_client = OrderClient::new(order_store.clone(), catalog, businesses, publisher, index, settings);

        Ok(Self {
            order_client,
            group_client,
            local_catalog,
            local_businesses,
            order_store,
            shutdown,
            consumer,
            handles,
        })
    }

    /// Stops the consumer first, then every actor, and waits for all of them.
    pub async fn shutdown(self) -> Result<SyncStats, SystemError> {
        info!("Shutting down system...");

        self.shutdown.cancel();
        let stats = self
            .consumer
            .await
            .map_err(|e| SystemError::Shutdown(format!("index sync consumer: {}", e)))?;

        if let Err(e) = self.group_client.shutdown().await {
            warn!(error = %e, "Group order actor already stopped");
        }
        if let Err(e) = self.order_store.shutdown().await {
            warn!(error = %e, "Order actor already stopped");
        }
        if let Some(catalog) = &self.local_catalog {
            if let Err(e) = catalog.inner().shutdown().await {
                warn!(error = %e, "Catalog actor already stopped");
            }
        }
        if let Some(businesses) = &self.local_businesses {
            if let Err(e) = businesses.shutdown().await {
                warn!(error = %e, "Business actor already stopped");
            }
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(SystemError::Shutdown(format!("actor task: {}", e)));
            }
        }

        info!("System shutdown complete.");
        Ok(stats)
    }
}
