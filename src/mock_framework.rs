//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_create`] or [`expect_action`] to assert behavior.

use crate::actor_framework::{Entity, FrameworkError, Page, PageRequest, ResourceClient, ResourceRequest};
use tokio::sync::{mpsc, oneshot};

type Responder<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Creates a mock client and a receiver for asserting requests.
///
/// # Testing Strategy
/// When testing the logic of a typed client (e.g. `OrderStoreClient`) there is no need
/// to spin up a full `ResourceActor`.
///
/// The mock client sends its messages to a channel we control (`receiver`), so a test can
/// inspect each request and answer it with whatever success, failure or delay it needs.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Responder<T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Responder<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Filter, PageRequest, Responder<Page<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List { filter, page, respond_to }) => Some((filter, page, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Responder<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Business, BusinessCreate};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Business>(10);

        // Test Create
        let create_task = tokio::spawn(async move {
            client
                .create(BusinessCreate {
                    name: "Test".to_string(),
                })
                .await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name, "Test");
        let business = Business {
            id: "biz_1".to_string(),
            name: payload.name,
            active: true,
        };
        responder.send(Ok(business.clone())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok(business));
    }

    #[tokio::test]
    async fn test_mock_list_passes_filter_and_page() {
        let (client, mut receiver) = create_mock_client::<Business>(10);

        let list_task = tokio::spawn(async move { client.list((), PageRequest::new(2, 5)).await });

        let ((), page, responder) = expect_list(&mut receiver).await.expect("Expected List request");
        assert_eq!((page.page, page.limit), (2, 5));
        responder
            .send(Ok(Page {
                page: page.page,
                limit: page.limit,
                total: 0,
                results: vec![],
            }))
            .unwrap();

        let result = list_task.await.unwrap().unwrap();
        assert_eq!(result.total, 0);
    }
}
