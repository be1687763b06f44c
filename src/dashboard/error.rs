use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use super::views::error_page;
use crate::error::OrderError;

/// Dashboard request failures with their HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error(transparent)]
    Ledger(OrderError),
}

impl From<OrderError> for DashboardError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStatus(status) => DashboardError::InvalidStatus(status),
            other => DashboardError::Ledger(other),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DashboardError::InvalidStatus(status) => (
                StatusCode::BAD_REQUEST,
                format!(
                    "'{}' is not a valid status. Use pending, completed or cancelled.",
                    status
                ),
            ),
            DashboardError::Ledger(e) => {
                tracing::error!(error = %e, "Ledger access failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The orders file could not be read or written. Try again shortly.".to_string(),
                )
            }
        };

        (status, Html(error_page(&message))).into_response()
    }
}
