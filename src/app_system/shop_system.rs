use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::catalog_actor::{CatalogClient, CatalogService, CatalogStore};
use crate::config::AppConfig;
use crate::order_actor::{OrderClient, OrderLedger, OrderService};
use crate::session_actor::{SessionRegistry, SessionRegistryClient};

const BUFFER_SIZE: usize = 100;

/// Starts the actor system, wires clients into their dependents and shuts
/// everything down in dependency order.
pub struct ShopSystem {
    pub catalog_client: CatalogClient,
    pub order_client: OrderClient,
    pub session_registry: SessionRegistryClient,
    handles: Vec<JoinHandle<()>>,
}

impl ShopSystem {
    /// **Startup Order:**
    /// 1. CatalogService (no dependencies)
    /// 2. OrderService with the catalog client
    /// 3. SessionRegistry with both clients
    #[instrument(name = "shop_system", skip(config))]
    pub fn new(config: &AppConfig) -> Self {
        let mut handles = Vec::new();

        info!("Starting shop system");

        let store = CatalogStore::open(&config.dataset_path, config.default_stock);
        let (catalog_service, catalog_client) = CatalogService::new(BUFFER_SIZE, store);
        handles.push(tokio::spawn(catalog_service.run()));

        let ledger = OrderLedger::new(&config.orders_path);
        let (order_service, order_client) = OrderService::new(BUFFER_SIZE, ledger, catalog_client.clone());
        handles.push(tokio::spawn(order_service.run()));

        let (registry, session_registry) = SessionRegistry::new(
            BUFFER_SIZE,
            catalog_client.clone(),
            order_client.clone(),
            config.results_limit,
        );
        handles.push(tokio::spawn(registry.run()));

        info!("Shop system started successfully");

        Self {
            catalog_client,
            order_client,
            session_registry,
            handles,
        }
    }

    /// **Shutdown Order:** sessions first (they call orders and the
    /// catalog), then orders (it calls the catalog), then the catalog.
    /// Errors are logged and shutdown continues.
    #[instrument(skip(self))]
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down shop system");

        let _ = self.session_registry.shutdown().await;
        let _ = self.order_client.shutdown().await;
        let _ = self.catalog_client.shutdown().await;

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Service shutdown error");
            }
        }

        info!("Shop system shutdown complete");
        Ok(())
    }
}
