use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::error::DashboardError;
use super::overview::{build_overview, OrderFilter};
use super::views::{self, Notice};
use super::DashboardState;
use crate::domain::OrderStatus;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub date: Option<String>,
    pub name: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomersQuery {
    #[serde(default)]
    pub term: String,
}

/// `GET /`
pub async fn index() -> Redirect {
    Redirect::to("/orders")
}

/// `GET /orders?date=&name=`: orders grouped by status with completed
/// revenue. An unreadable date is reported and ignored.
#[instrument(skip(state))]
pub async fn orders(
    State(state): State<DashboardState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Html<String>, DashboardError> {
    let mut notices: Vec<Notice> = query.notice.as_deref().and_then(Notice::from_code).into_iter().collect();

    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                notices.push(Notice::InvalidDate);
                None
            }
        },
        None => None,
    };
    let name = query
        .name
        .as_deref()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty());
    let filter = OrderFilter { date, name };

    let records = state.ledger.read_all()?;
    let overview = build_overview(&records, &filter);
    Ok(Html(views::orders_page(&overview, &filter, &notices)))
}

/// `GET /order/:id`: line items of one order; unknown ids go back to the list.
#[instrument(skip(state))]
pub async fn order_detail(
    State(state): State<DashboardState>,
    Path(order_id): Path<String>,
) -> Result<Response, DashboardError> {
    let items = state.ledger.order_items(&order_id)?;
    if items.is_empty() {
        warn!("Order not found");
        return Ok(not_found_redirect().into_response());
    }
    Ok(Html(views::order_detail_page(&order_id, &items)).into_response())
}

/// `POST /update_status/:id` with form field `status`.
#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<DashboardState>,
    Path(order_id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, DashboardError> {
    let status: OrderStatus = form.status.parse()?;

    let updated = state.ledger.update_status(&order_id, status)?;
    if updated == 0 {
        warn!("Status update for unknown order");
        return Ok(not_found_redirect());
    }

    info!(rows = updated, status = %status, "Order status updated");
    Ok(Redirect::to(&format!("/orders?notice={}", Notice::Updated.code())))
}

/// `GET /get_customers?term=`: distinct customer names for autocomplete.
/// Read failures answer with an empty list.
#[instrument(skip(state))]
pub async fn get_customers(
    State(state): State<DashboardState>,
    Query(query): Query<CustomersQuery>,
) -> Json<Vec<String>> {
    match state.ledger.customers(&query.term) {
        Ok(names) => Json(names),
        Err(e) => {
            warn!(error = %e, "Customer lookup failed");
            Json(Vec::new())
        }
    }
}

fn not_found_redirect() -> Redirect {
    Redirect::to(&format!("/orders?notice={}", Notice::NotFound.code()))
}
