//! # Mock Framework
//!
//! Utilities for testing a service against a stand-in for one of its
//! collaborators.
//!
//! Use [`create_mock_catalog`] or [`create_mock_order_client`] to get a client
//! and the receiver its requests land on. Then use helpers like
//! [`expect_decrement`] or [`expect_place_order`] to assert on the request
//! and answer it.

use tokio::sync::mpsc;

use crate::catalog_actor::CatalogClient;
use crate::domain::{CartItem, PlacedOrder};
use crate::error::{CatalogError, OrderError};
use crate::messages::{CatalogRequest, OrderRequest, ServiceResponse};
use crate::order_actor::OrderClient;

/// Creates a catalog client whose requests arrive on the returned receiver.
///
/// # Testing Strategy
/// The service under test gets a real client, so it runs unchanged. The test
/// reads each request off the channel and decides the answer, which makes
/// failures and orderings deterministic.
pub fn create_mock_catalog(buffer_size: usize) -> (CatalogClient, mpsc::Receiver<CatalogRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (CatalogClient::new(sender), receiver)
}

/// Creates an order client whose requests arrive on the returned receiver.
pub fn create_mock_order_client(buffer_size: usize) -> (OrderClient, mpsc::Receiver<OrderRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (OrderClient::new(sender), receiver)
}

/// Helper to verify that the next message is a DecrementStock request
pub async fn expect_decrement(
    receiver: &mut mpsc::Receiver<CatalogRequest>,
) -> Option<(Vec<CartItem>, ServiceResponse<(), CatalogError>)> {
    match receiver.recv().await {
        Some(CatalogRequest::DecrementStock { items, respond_to }) => Some((items, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a PlaceOrder request
pub async fn expect_place_order(
    receiver: &mut mpsc::Receiver<OrderRequest>,
) -> Option<(Vec<CartItem>, String, ServiceResponse<PlacedOrder, OrderError>)> {
    match receiver.recv().await {
        Some(OrderRequest::PlaceOrder {
            items,
            delivery_address,
            respond_to,
            ..
        }) => Some((items, delivery_address, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatUser;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_mock_order_client() {
        let (client, mut receiver) = create_mock_order_client(10);
        let item = CartItem {
            name: "Crocin".into(),
            unit_price: Decimal::new(30, 0),
            quantity: 1,
        };

        let place_task = tokio::spawn({
            let item = item.clone();
            async move {
                client
                    .place_order(ChatUser::new("1", "Test"), vec![item], "Somewhere".into())
                    .await
            }
        });

        let (items, address, responder) = expect_place_order(&mut receiver)
            .await
            .expect("Expected PlaceOrder request");
        assert_eq!(address, "Somewhere");
        let placed = PlacedOrder {
            order_id: "ORD_1".into(),
            total: Decimal::new(30, 0),
            items,
        };
        responder.send(Ok(placed.clone())).unwrap();

        let result = place_task.await.unwrap();
        assert_eq!(result, Ok(placed));
    }

    #[tokio::test]
    async fn closed_mock_surfaces_communication_error() {
        let (client, receiver) = create_mock_catalog(1);
        drop(receiver);

        let result = client.search("crocin".into()).await;

        assert!(matches!(result, Err(CatalogError::ActorCommunicationError(_))));
    }
}
