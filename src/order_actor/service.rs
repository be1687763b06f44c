use chrono::Local;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use super::ledger::OrderLedger;
use crate::catalog_actor::CatalogClient;
use crate::domain::{CartItem, ChatUser, PlacedOrder};
use crate::error::OrderError;
use crate::messages::{OrderRequest, ServiceResponse};

/// Root service for checkout.
///
/// Placing an order is two independent file writes: the ledger append, then
/// the catalog stock update through [`CatalogClient`]. There is no
/// transaction spanning them; if the second fails the order stands and the
/// catalog keeps its old stock.
pub struct OrderService {
    receiver: mpsc::Receiver<OrderRequest>,
    ledger: OrderLedger,
    catalog_client: CatalogClient,
}

impl OrderService {
    pub fn new(buffer_size: usize, ledger: OrderLedger, catalog_client: CatalogClient) -> (Self, OrderClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            ledger,
            catalog_client,
        };
        let client = OrderClient::new(sender);
        (service, client)
    }

    #[instrument(name = "order_service", skip(self))]
    pub async fn run(mut self) {
        info!(ledger = %self.ledger.path().display(), "OrderService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                OrderRequest::PlaceOrder {
                    user,
                    items,
                    delivery_address,
                    respond_to,
                } => {
                    self.handle_place_order(user, items, delivery_address, respond_to)
                        .await;
                }
                OrderRequest::Shutdown => {
                    info!("OrderService shutting down");
                    break;
                }
            }
        }

        info!("OrderService stopped");
    }

    /// 1. Reject an empty cart
    /// 2. Append the lines to the ledger
    /// 3. Decrement catalog stock via CatalogService
    #[instrument(
        fields(user_id = %user.id, lines = items.len()),
        skip(self, user, items, delivery_address, respond_to)
    )]
    async fn handle_place_order(
        &mut self,
        user: ChatUser,
        items: Vec<CartItem>,
        delivery_address: String,
        respond_to: ServiceResponse<PlacedOrder, OrderError>,
    ) {
        info!("Processing place_order request");

        if items.is_empty() {
            warn!("Refusing to place an empty order");
            send_error!(respond_to, OrderError::EmptyCart);
        }

        let order_id = match self
            .ledger
            .append_order(&items, &user, &delivery_address, Local::now())
        {
            Ok(order_id) => order_id,
            Err(e) => {
                error!(error = %e, "Ledger append failed");
                send_error!(respond_to, e);
            }
        };

        if let Err(e) = self.catalog_client.decrement_stock(items.clone()).await {
            error!(order_id = %order_id, error = %e, "Stock update failed after order was recorded");
        }

        let total = items.iter().map(CartItem::subtotal).sum();
        info!(order_id = %order_id, total = %total, "Order placed successfully");
        let _ = respond_to.send(Ok(PlacedOrder {
            order_id,
            items,
            total,
        }));
    }
}

#[derive(Clone)]
pub struct OrderClient {
    sender: mpsc::Sender<OrderRequest>,
}

impl OrderClient {
    pub fn new(sender: mpsc::Sender<OrderRequest>) -> Self {
        Self { sender }
    }
}

client_shutdown!(OrderClient, OrderRequest);
client_method!(OrderClient => fn place_order(user: ChatUser, items: Vec<CartItem>, delivery_address: String) -> PlacedOrder as OrderRequest::PlaceOrder, Error = OrderError);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;
    use crate::messages::CatalogRequest;
    use crate::mock_framework::{create_mock_catalog, expect_decrement};
    use rust_decimal::Decimal;

    fn crocin(quantity: u32) -> CartItem {
        CartItem {
            name: "Crocin".into(),
            unit_price: Decimal::new(300, 1),
            quantity,
        }
    }

    fn start(catalog_client: CatalogClient) -> (tempfile::TempDir, OrderLedger, OrderClient) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = OrderLedger::new(dir.path().join("orders.csv"));
        let (service, client) = OrderService::new(10, ledger.clone(), catalog_client);
        tokio::spawn(service.run());
        (dir, ledger, client)
    }

    #[tokio::test]
    async fn place_order_appends_then_decrements_stock() {
        let (catalog_client, mut catalog_rx) = create_mock_catalog(10);
        let (_dir, ledger, client) = start(catalog_client);
        let user = ChatUser::new("42", "Asha Rao");

        let task = tokio::spawn(async move {
            client
                .place_order(user, vec![crocin(5)], "221B Baker St".into())
                .await
        });

        let (items, responder) = expect_decrement(&mut catalog_rx)
            .await
            .expect("Expected stock decrement");
        assert_eq!(items, vec![crocin(5)]);
        // ledger is already written by the time stock is touched
        assert_eq!(ledger.read_all().unwrap().len(), 1);
        responder.send(Ok(())).unwrap();

        let placed = task.await.unwrap().unwrap();
        assert_eq!(placed.total, Decimal::new(150, 0));

        let records = ledger.read_all().unwrap();
        assert_eq!(records[0].order_id, placed.order_id);
        assert_eq!(records[0].total_price, Decimal::new(150, 0));
        assert_eq!(records[0].status, OrderStatus::Pending);
    }

    /// The two writes are not atomic: a failed stock update leaves the order
    /// recorded while the catalog still shows the old stock.
    #[tokio::test]
    async fn failed_stock_update_leaves_order_recorded() {
        let (catalog_client, mut catalog_rx) = create_mock_catalog(10);
        let (_dir, ledger, client) = start(catalog_client);
        let user = ChatUser::new("42", "Asha Rao");

        let task = tokio::spawn(async move {
            client.place_order(user, vec![crocin(1)], "A".into()).await
        });

        match catalog_rx.recv().await {
            Some(CatalogRequest::DecrementStock { respond_to, .. }) => drop(respond_to),
            other => panic!("Unexpected request: {:?}", other),
        }

        assert!(task.await.unwrap().is_ok());
        assert_eq!(ledger.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_order_never_reaches_ledger_or_catalog() {
        let (catalog_client, mut catalog_rx) = create_mock_catalog(10);
        let (_dir, ledger, client) = start(catalog_client);

        let result = client
            .place_order(ChatUser::new("42", "Asha Rao"), Vec::new(), "A".into())
            .await;

        assert_eq!(result, Err(OrderError::EmptyCart));
        assert!(!ledger.path().exists());
        assert!(catalog_rx.try_recv().is_err());
    }
}
