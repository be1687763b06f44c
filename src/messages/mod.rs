use tokio::sync::oneshot;

use crate::domain::{CartItem, CatalogEntry, ChatEvent, ChatUser, PlacedOrder};
use crate::error::{CatalogError, OrderError, SessionError};
use crate::session_actor::Reply;
#[cfg(test)]
use crate::session_actor::Session;

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed message enums for actor communication. Each variant includes parameters
/// and a oneshot channel for responses.

#[derive(Debug)]
pub enum CatalogRequest {
    Search {
        query: String,
        respond_to: ServiceResponse<Vec<CatalogEntry>, CatalogError>,
    },
    GetEntry {
        name: String,
        respond_to: ServiceResponse<Option<CatalogEntry>, CatalogError>,
    },
    DecrementStock {
        items: Vec<CartItem>,
        respond_to: ServiceResponse<(), CatalogError>,
    },
    Shutdown,
    #[cfg(test)]
    Reload {
        respond_to: ServiceResponse<usize, CatalogError>,
    },
}

#[derive(Debug)]
pub enum OrderRequest {
    PlaceOrder {
        user: ChatUser,
        items: Vec<CartItem>,
        delivery_address: String,
        respond_to: ServiceResponse<PlacedOrder, OrderError>,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum SessionRequest {
    Handle {
        event: ChatEvent,
        respond_to: ServiceResponse<Reply, SessionError>,
    },
    Shutdown,
    #[cfg(test)]
    Inspect {
        respond_to: ServiceResponse<Session, SessionError>,
    },
}

#[derive(Debug)]
pub enum RegistryRequest {
    Dispatch {
        session_id: i64,
        event: ChatEvent,
        respond_to: ServiceResponse<Reply, SessionError>,
    },
    Shutdown,
    #[cfg(test)]
    SessionCount {
        respond_to: ServiceResponse<usize, SessionError>,
    },
}
