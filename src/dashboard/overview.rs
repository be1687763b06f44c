//! Filtering and grouping of ledger rows for the orders page.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{OrderRecord, OrderStatus, OrderSummary};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub date: Option<NaiveDate>,
    /// Lowercased substring of the customer name.
    pub name: Option<String>,
}

impl OrderFilter {
    fn keeps(&self, record: &OrderRecord) -> bool {
        if let Some(date) = self.date {
            if record.placed_at().map(|at| at.date()) != Some(date) {
                return false;
            }
        }
        match &self.name {
            Some(name) => record.user_name.to_lowercase().contains(name.as_str()),
            None => true,
        }
    }
}

/// The orders page: order groups split by status, newest first, plus the
/// revenue of completed lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    pub pending: Vec<OrderSummary>,
    pub completed: Vec<OrderSummary>,
    pub cancelled: Vec<OrderSummary>,
    pub completed_revenue: Decimal,
}

impl Overview {
    pub fn orders(&self, status: OrderStatus) -> &[OrderSummary] {
        match status {
            OrderStatus::Pending => &self.pending,
            OrderStatus::Completed => &self.completed,
            OrderStatus::Cancelled => &self.cancelled,
        }
    }
}

/// Revenue counts completed lines individually. Grouping takes each order's
/// first line as authoritative for name, status and address; an order whose
/// lines carry no readable date is left out of the groups.
pub fn build_overview(records: &[OrderRecord], filter: &OrderFilter) -> Overview {
    let kept: Vec<&OrderRecord> = records.iter().filter(|record| filter.keeps(record)).collect();

    let completed_revenue = kept
        .iter()
        .filter(|record| record.status == OrderStatus::Completed)
        .map(|record| record.total_price)
        .sum();

    let mut groups: Vec<Vec<&OrderRecord>> = Vec::new();
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for record in kept {
        match index_of.get(record.order_id.as_str()) {
            Some(&index) => groups[index].push(record),
            None => {
                index_of.insert(record.order_id.as_str(), groups.len());
                groups.push(vec![record]);
            }
        }
    }

    let mut summaries: Vec<OrderSummary> = groups.into_iter().filter_map(summarize).collect();
    summaries.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));

    let mut overview = Overview {
        completed_revenue,
        ..Overview::default()
    };
    for summary in summaries {
        match summary.status {
            OrderStatus::Pending => overview.pending.push(summary),
            OrderStatus::Completed => overview.completed.push(summary),
            OrderStatus::Cancelled => overview.cancelled.push(summary),
        }
    }
    overview
}

fn summarize(lines: Vec<&OrderRecord>) -> Option<OrderSummary> {
    let first = *lines.first()?;
    let placed_at = lines.iter().find_map(|line| line.placed_at())?;
    Some(OrderSummary {
        order_id: first.order_id.clone(),
        user_name: first.user_name.clone(),
        placed_at,
        total: lines.iter().map(|line| line.total_price).sum(),
        status: first.status,
        delivery_address: first.delivery_address.clone(),
    })
}
