//! Order placement: the ledger repository and the root service that
//! coordinates it with the catalog.

pub mod ledger;
pub mod service;

pub use ledger::OrderLedger;
pub use service::*;
