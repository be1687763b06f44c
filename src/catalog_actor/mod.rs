//! Medicine catalog: flat-file store, search ranking and the service that owns both.

pub mod search;
pub mod service;
pub mod store;

pub use service::*;
pub use store::{restock_file, CatalogStore, DEFAULT_STOCK};
