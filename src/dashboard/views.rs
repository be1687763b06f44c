//! Server-rendered HTML for the dashboard pages.

use std::fmt::Write;

use rust_decimal::Decimal;

use super::overview::{OrderFilter, Overview};
use crate::domain::{OrderRecord, OrderStatus, ORDER_DATE_FORMAT};
use crate::order_actor::OrderLedger;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}table{border-collapse:collapse;width:100%;margin-bottom:2em}\
td,th{border:1px solid #ccc;padding:.4em;text-align:left}.notice{background:#ffe;padding:.6em;border:1px solid #cc8}";

/// Short messages carried across a redirect in the `notice` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Updated,
    NotFound,
    InvalidDate,
}

impl Notice {
    pub fn code(&self) -> &'static str {
        match self {
            Notice::Updated => "updated",
            Notice::NotFound => "not_found",
            Notice::InvalidDate => "invalid_date",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "updated" => Some(Notice::Updated),
            "not_found" => Some(Notice::NotFound),
            "invalid_date" => Some(Notice::InvalidDate),
            _ => None,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Notice::Updated => "Order status updated",
            Notice::NotFound => "Order not found",
            Notice::InvalidDate => "Invalid date format",
        }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Percent-encodes a path segment.
pub fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

fn money(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}

fn page(title: &str, notices: &[Notice], body: &str) -> String {
    let mut html = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>",
        escape(title),
        STYLE
    );
    for notice in notices {
        let _ = write!(html, "<p class=\"notice\">{}</p>", notice.message());
    }
    html.push_str(body);
    html.push_str("</body></html>");
    html
}

pub fn orders_page(overview: &Overview, filter: &OrderFilter, notices: &[Notice]) -> String {
    let mut body = String::from("<h1>Orders</h1>");

    let date = filter.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    let name = filter.name.as_deref().unwrap_or_default();
    let _ = write!(
        body,
        "<form method=\"get\" action=\"/orders\">\
         <input type=\"date\" name=\"date\" value=\"{}\"> \
         <input type=\"text\" name=\"name\" value=\"{}\" placeholder=\"Customer name\" list=\"customers\"> \
         <button type=\"submit\">Filter</button> <a href=\"/orders\">Reset</a></form>",
        escape(&date),
        escape(name)
    );
    let _ = write!(
        body,
        "<p>Revenue from completed orders: <strong>{}</strong></p>",
        money(overview.completed_revenue)
    );

    for status in OrderStatus::ALL {
        let orders = overview.orders(status);
        let _ = write!(body, "<h2>{} ({})</h2>", title_case(status), orders.len());
        if orders.is_empty() {
            body.push_str("<p>No orders.</p>");
            continue;
        }

        body.push_str(
            "<table><tr><th>Order</th><th>Customer</th><th>Date</th><th>Total</th>\
             <th>Delivery address</th><th>Status</th></tr>",
        );
        for order in orders {
            let id = escape(&order.order_id);
            let segment = encode_segment(&order.order_id);
            let _ = write!(
                body,
                "<tr><td><a href=\"/order/{segment}\">{id}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&order.user_name),
                order.placed_at.format(ORDER_DATE_FORMAT),
                money(order.total),
                escape(order.delivery_address.as_deref().unwrap_or_default()),
                status_form(&segment, order.status),
            );
        }
        body.push_str("</table>");
    }

    page("Orders", notices, &body)
}

pub fn order_detail_page(order_id: &str, items: &[OrderRecord]) -> String {
    let mut body = format!("<p><a href=\"/orders\">&larr; All orders</a></p><h1>Order {}</h1>", escape(order_id));

    if let Some(first) = items.first() {
        let _ = write!(
            body,
            "<p>Customer: {}<br>Placed: {}<br>Delivery address: {}</p>",
            escape(&first.user_name),
            escape(&first.order_date),
            escape(first.delivery_address.as_deref().unwrap_or_default())
        );
    }

    body.push_str("<table><tr><th>Medicine</th><th>Quantity</th><th>Unit price</th><th>Total</th><th>Status</th></tr>");
    for item in items {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&item.medicine_name),
            item.quantity,
            money(item.price_per_unit),
            money(item.total_price),
            item.status
        );
    }
    let _ = write!(
        body,
        "</table><p>Order total: <strong>{}</strong></p>",
        money(OrderLedger::order_total(items))
    );

    page(&format!("Order {}", order_id), &[], &body)
}

pub fn error_page(message: &str) -> String {
    page("Error", &[], &format!("<h1>Something went wrong</h1><p>{}</p>", escape(message)))
}

fn status_form(segment: &str, current: OrderStatus) -> String {
    let mut form = format!("<form method=\"post\" action=\"/update_status/{}\"><select name=\"status\">", segment);
    for status in OrderStatus::ALL {
        let selected = if status == current { " selected" } else { "" };
        let _ = write!(form, "<option value=\"{}\"{}>{}</option>", status, selected, status);
    }
    form.push_str("</select> <button type=\"submit\">Update</button></form>");
    form
}

fn title_case(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Completed => "Completed",
        OrderStatus::Cancelled => "Cancelled",
    }
}
