//! Order-status dashboard served over HTTP.
//!
//! Reads and rewrites the ledger file directly through its own
//! [`OrderLedger`] handle; nothing is shared in memory with the chat side.

pub mod error;
pub mod handlers;
pub mod overview;
pub mod views;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::watch;
use tracing::info;

use crate::error::AppError;
use crate::order_actor::OrderLedger;

#[derive(Clone)]
pub struct DashboardState {
    pub ledger: OrderLedger,
}

pub fn router(ledger: OrderLedger) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/orders", get(handlers::orders))
        .route("/order/:order_id", get(handlers::order_detail))
        .route("/update_status/:order_id", post(handlers::update_status))
        .route("/get_customers", get(handlers::get_customers))
        .with_state(DashboardState { ledger })
}

/// Serves the dashboard on `addr` until `shutdown` flips to true.
pub async fn serve(addr: SocketAddr, ledger: OrderLedger, mut shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Dashboard listening");

    axum::serve(listener, router(ledger))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    info!("Dashboard stopped");
    Ok(())
}
