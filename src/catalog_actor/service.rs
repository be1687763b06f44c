use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use super::search::search;
use super::store::CatalogStore;
use crate::domain::{CartItem, CatalogEntry};
use crate::error::CatalogError;
use crate::messages::{CatalogRequest, ServiceResponse};

/// Owns the bot's in-memory catalog.
///
/// The backing file is re-read on every search and before every stock
/// decrement, so edits made to the dataset by other processes are picked up
/// between requests. Nothing guards the file against concurrent writers.
pub struct CatalogService {
    receiver: mpsc::Receiver<CatalogRequest>,
    store: CatalogStore,
}

impl CatalogService {
    pub fn new(buffer_size: usize, store: CatalogStore) -> (Self, CatalogClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self { receiver, store };
        let client = CatalogClient::new(sender);
        (service, client)
    }

    #[instrument(name = "catalog_service", skip(self))]
    pub async fn run(mut self) {
        info!(entries = self.store.entries().len(), "CatalogService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CatalogRequest::Search { query, respond_to } => {
                    self.handle_search(query, respond_to);
                }
                CatalogRequest::GetEntry { name, respond_to } => {
                    self.handle_get_entry(name, respond_to);
                }
                CatalogRequest::DecrementStock { items, respond_to } => {
                    self.handle_decrement_stock(items, respond_to);
                }
                CatalogRequest::Shutdown => {
                    info!("CatalogService shutting down");
                    break;
                }
                #[cfg(test)]
                CatalogRequest::Reload { respond_to } => {
                    let _ = respond_to.send(self.store.reload());
                }
            }
        }

        info!("CatalogService stopped");
    }

    #[instrument(fields(query = %query), skip(self, respond_to))]
    fn handle_search(&mut self, query: String, respond_to: ServiceResponse<Vec<CatalogEntry>, CatalogError>) {
        debug!("Processing search request");

        if let Err(e) = self.store.reload() {
            warn!(error = %e, "Catalog reload failed, searching previous contents");
        }

        let results = search(&query, self.store.entries());
        info!(matches = results.len(), "Search completed");

        let _ = respond_to.send(Ok(results));
    }

    #[instrument(fields(medicine = %name), skip(self, respond_to))]
    fn handle_get_entry(&self, name: String, respond_to: ServiceResponse<Option<CatalogEntry>, CatalogError>) {
        debug!("Processing get_entry request");

        let entry = self.store.get(&name).cloned();
        match &entry {
            Some(entry) => debug!(stock = entry.quantity, "Entry found"),
            None => debug!("Entry not found"),
        }

        let _ = respond_to.send(Ok(entry));
    }

    /// Read-modify-write of the catalog file for a finalized order.
    #[instrument(fields(lines = items.len()), skip(self, items, respond_to))]
    fn handle_decrement_stock(&mut self, items: Vec<CartItem>, respond_to: ServiceResponse<(), CatalogError>) {
        debug!("Processing decrement_stock request");

        if let Err(e) = self.store.reload() {
            error!(error = %e, "Catalog reload failed before stock update");
            send_error!(respond_to, e);
        }

        for item in &items {
            match self.store.decrement(&item.name, item.quantity) {
                Ok(remaining) => info!(medicine = %item.name, ordered = item.quantity, remaining, "Stock decremented"),
                Err(e) => warn!(error = %e, "Ordered medicine missing from catalog"),
            }
        }

        let result = self.store.persist();
        if let Err(e) = &result {
            error!(error = %e, "Catalog persist failed");
        }
        let _ = respond_to.send(result);
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    sender: mpsc::Sender<CatalogRequest>,
}

impl CatalogClient {
    pub fn new(sender: mpsc::Sender<CatalogRequest>) -> Self {
        Self { sender }
    }
}

client_shutdown!(CatalogClient, CatalogRequest);
client_method!(CatalogClient => fn search(query: String) -> Vec<CatalogEntry> as CatalogRequest::Search, Error = CatalogError);
client_method!(CatalogClient => fn get_entry(name: String) -> Option<CatalogEntry> as CatalogRequest::GetEntry, Error = CatalogError);
client_method!(CatalogClient => fn decrement_stock(items: Vec<CartItem>) -> () as CatalogRequest::DecrementStock, Error = CatalogError);
#[cfg(test)]
client_method!(CatalogClient => fn reload() -> usize as CatalogRequest::Reload, Error = CatalogError);
