use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, and Actions)
// =============================================================================

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;
    type Filter: Send + Sync + Debug + Default;

    /// Get the ID of the entity
    fn id(&self) -> &Self::Id;

    /// Construct the full Entity from the ID and creation parameters
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, String>;

    /// Secondary key that must be unique across the store.
    ///
    /// The actor checks it while processing the Create message, so two
    /// concurrent creates for the same key cannot both succeed.
    fn unique_key(&self) -> Option<String> {
        None
    }

    /// Whether this entity is selected by a List filter
    fn matches(&self, _filter: &Self::Filter) -> bool {
        true
    }

    /// Listing order. Ties are broken by nothing, so override when order matters.
    fn list_cmp(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), String>;
    fn on_delete(&self) -> Result<(), String> {
        Ok(())
    }

    // --- Action Handler ---

    /// Handle a custom domain-specific action.
    ///
    /// Returning `Err` must leave the entity untouched.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, String>;
}

/// Errors produced by the actor layer itself (not by domain logic).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unique key already taken: {0}")]
    Conflict(String),
    #[error("Rejected by entity: {0}")]
    Rejected(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped the response")]
    ActorDropped,
}

/// Pagination request. Values below 1 fall back to page 1 / limit 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: if limit == 0 { Self::DEFAULT_LIMIT } else { limit },
        }
    }

    fn skip(&self) -> usize {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub page: usize,
    pub limit: usize,
    /// Number of entities matching the filter, across all pages
    pub total: usize,
    pub results: Vec<T>,
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    GetByKey {
        key: String,
        respond_to: Response<Option<T>>,
    },
    List {
        filter: T::Filter,
        page: PageRequest,
        respond_to: Response<Page<T>>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    Shutdown,
    #[cfg(test)]
    Count {
        respond_to: Response<usize>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// Owns every entity of one type and serialises all access to them.
///
/// Because messages are handled one at a time, each request (including the
/// compare-and-set style actions) is atomic with respect to every other.
pub struct ResourceActor<T: Entity> {
    name: &'static str,
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    unique_index: HashMap<String, T::Id>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        name: &'static str,
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            name,
            receiver,
            store: HashMap::new(),
            unique_index: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    pub async fn run(mut self) {
        info!(actor = self.name, "ResourceActor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let _ = respond_to.send(self.handle_create(params));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.store.get(&id).cloned()));
                }
                ResourceRequest::GetByKey { key, respond_to } => {
                    let item = self
                        .unique_index
                        .get(&key)
                        .and_then(|id| self.store.get(id))
                        .cloned();
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::List { filter, page, respond_to } => {
                    let _ = respond_to.send(Ok(self.handle_list(&filter, page)));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => item
                            .on_update(patch)
                            .map(|_| item.clone())
                            .map_err(FrameworkError::Rejected),
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(&id));
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => item.handle_action(action).map_err(FrameworkError::Rejected),
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Shutdown => {
                    info!(actor = self.name, "ResourceActor shutting down");
                    break;
                }
                #[cfg(test)]
                ResourceRequest::Count { respond_to } => {
                    let _ = respond_to.send(Ok(self.store.len()));
                }
            }
        }
        info!(actor = self.name, entities = self.store.len(), "ResourceActor stopped");
    }

    fn handle_create(&mut self, params: T::CreateParams) -> Result<T, FrameworkError> {
        let id = (self.next_id_fn)();
        let mut item = T::from_create_params(id.clone(), params).map_err(FrameworkError::Rejected)?;

        let key = item.unique_key();
        if let Some(key) = &key {
            if self.unique_index.contains_key(key) {
                warn!(actor = self.name, key = %key, "Create rejected, unique key taken");
                return Err(FrameworkError::Conflict(key.clone()));
            }
        }

        item.on_create().map_err(FrameworkError::Rejected)?;

        if let Some(key) = key {
            self.unique_index.insert(key, id.clone());
        }
        self.store.insert(id.clone(), item.clone());
        debug!(actor = self.name, id = %id, "Entity created");
        Ok(item)
    }

    fn handle_list(&self, filter: &T::Filter, page: PageRequest) -> Page<T> {
        let mut matching: Vec<&T> = self.store.values().filter(|item| item.matches(filter)).collect();
        matching.sort_by(|a, b| a.list_cmp(b));

        Page {
            page: page.page,
            limit: page.limit,
            total: matching.len(),
            results: matching
                .into_iter()
                .skip(page.skip())
                .take(page.limit)
                .cloned()
                .collect(),
        }
    }

    fn handle_delete(&mut self, id: &T::Id) -> Result<(), FrameworkError> {
        let item = self
            .store
            .get(id)
            .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;
        item.on_delete().map_err(FrameworkError::Rejected)?;

        if let Some(key) = item.unique_key() {
            self.unique_index.remove(&key);
        }
        self.store.remove(id);
        Ok(())
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn get_by_key(&self, key: String) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::GetByKey { key, respond_to }).await
    }

    pub async fn list(&self, filter: T::Filter, page: PageRequest) -> Result<Page<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::List { filter, page, respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }

    /// Ask the actor to stop after the messages already queued.
    pub async fn shutdown(&self) -> Result<(), FrameworkError> {
        self.sender
            .send(ResourceRequest::Shutdown)
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<usize, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Count { respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
    use std::sync::Arc;

    // --- Domain Definition ---

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: String,
        seat: String,
        rank: u32,
        used: bool,
    }

    #[derive(Debug)]
    struct TicketCreate {
        seat: String,
        rank: u32,
    }

    #[derive(Debug, Default)]
    struct TicketFilter {
        unused_only: bool,
    }

    #[derive(Debug)]
    enum TicketAction {
        Use,
    }

    impl Entity for Ticket {
        type Id = String;
        type CreateParams = TicketCreate;
        type Patch = u32;
        type Action = TicketAction;
        type ActionResult = bool;
        type Filter = TicketFilter;

        fn id(&self) -> &String {
            &self.id
        }

        fn from_create_params(id: String, params: TicketCreate) -> Result<Self, String> {
            if params.seat.is_empty() {
                return Err("seat is required".to_string());
            }
            Ok(Self {
                id,
                seat: params.seat,
                rank: params.rank,
                used: false,
            })
        }

        fn unique_key(&self) -> Option<String> {
            Some(format!("seat:{}", self.seat))
        }

        fn matches(&self, filter: &TicketFilter) -> bool {
            !filter.unused_only || !self.used
        }

        fn list_cmp(&self, other: &Self) -> Ordering {
            self.rank.cmp(&other.rank)
        }

        fn on_update(&mut self, rank: u32) -> Result<(), String> {
            self.rank = rank;
            Ok(())
        }

        fn on_delete(&self) -> Result<(), String> {
            if self.used {
                return Err("used tickets are kept".to_string());
            }
            Ok(())
        }

        fn handle_action(&mut self, action: TicketAction) -> Result<bool, String> {
            match action {
                TicketAction::Use => {
                    if self.used {
                        Ok(false)
                    } else {
                        self.used = true;
                        Ok(true)
                    }
                }
            }
        }
    }

    fn start() -> ResourceClient<Ticket> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("ticket_{}", counter.fetch_add(1, AtomicOrdering::SeqCst));
        let (actor, client) = ResourceActor::new("tickets", 10, next_id);
        tokio::spawn(actor.run());
        client
    }

    fn create(seat: &str, rank: u32) -> TicketCreate {
        TicketCreate { seat: seat.into(), rank }
    }

    #[tokio::test]
    async fn test_resource_actor_with_actions() {
        let client = start();

        let ticket = client.create(create("A1", 1)).await.unwrap();
        assert_eq!(ticket.id, "ticket_1");

        let changed = client.perform_action(ticket.id.clone(), TicketAction::Use).await.unwrap();
        assert!(changed);
        let changed_again = client.perform_action(ticket.id.clone(), TicketAction::Use).await.unwrap();
        assert!(!changed_again);

        let stored = client.get(ticket.id.clone()).await.unwrap().unwrap();
        assert!(stored.used);
    }

    #[tokio::test]
    async fn test_unique_key_conflict_is_atomic() {
        let client = start();
        let first = client.clone();
        let second = client.clone();

        let (a, b) = tokio::join!(first.create(create("B2", 1)), second.create(create("B2", 2)));
        let conflicts = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(FrameworkError::Conflict(_))))
            .count();
        assert_eq!(conflicts, 1);
        assert_eq!(client.count().await.unwrap(), 1);

        let by_key = client.get_by_key("seat:B2".into()).await.unwrap();
        assert!(by_key.is_some());
    }

    #[tokio::test]
    async fn test_rejected_create_is_not_stored() {
        let client = start();
        let result = client.create(create("", 1)).await;
        assert_eq!(result, Err(FrameworkError::Rejected("seat is required".into())));
        assert_eq!(client.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_pages() {
        let client = start();
        for (seat, rank) in [("C3", 3), ("C1", 1), ("C2", 2), ("C4", 4)] {
            client.create(create(seat, rank)).await.unwrap();
        }
        let used = client.get_by_key("seat:C2".into()).await.unwrap().unwrap();
        client.perform_action(used.id, TicketAction::Use).await.unwrap();

        let page = client
            .list(TicketFilter { unused_only: true }, PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let seats: Vec<_> = page.results.iter().map(|t| t.seat.as_str()).collect();
        assert_eq!(seats, vec!["C1", "C3"]);

        let second = client
            .list(TicketFilter { unused_only: true }, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results[0].seat, "C4");
    }

    #[tokio::test]
    async fn test_delete_hook_and_missing_ids() {
        let client = start();
        let ticket = client.create(create("D1", 1)).await.unwrap();
        client.perform_action(ticket.id.clone(), TicketAction::Use).await.unwrap();

        let refused = client.delete(ticket.id.clone()).await;
        assert!(matches!(refused, Err(FrameworkError::Rejected(_))));

        let missing = client.update("ticket_99".into(), 5).await;
        assert_eq!(missing, Err(FrameworkError::NotFound("ticket_99".into())));
    }

    #[tokio::test]
    async fn test_shutdown_closes_actor() {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("ticket_{}", counter.fetch_add(1, AtomicOrdering::SeqCst));
        let (actor, client) = ResourceActor::<Ticket>::new("tickets", 10, next_id);
        let handle = tokio::spawn(actor.run());

        client.shutdown().await.unwrap();
        handle.await.unwrap();

        let result = client.get("ticket_1".into()).await;
        assert_eq!(result, Err(FrameworkError::ActorClosed));
    }

    #[test]
    fn test_page_request_defaults() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(3, 25).skip(), 50);
    }
}
