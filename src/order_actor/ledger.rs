//! Append-only order ledger stored as CSV, one row per cart line.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::catalog_actor::store::{parse_price, parse_quantity};
use crate::domain::{CartItem, ChatUser, OrderRecord, OrderStatus, ORDER_DATE_FORMAT};
use crate::error::OrderError;

pub const LEDGER_HEADER: [&str; 10] = [
    "order_id",
    "user_id",
    "user_name",
    "medicine_name",
    "quantity",
    "price_per_unit",
    "total_price",
    "order_date",
    "status",
    "delivery_address",
];

/// `ORD_<date>_<time>_<microseconds>_<user id>`.
pub fn generate_order_id(user_id: &str, at: DateTime<Local>) -> String {
    format!("ORD_{}_{}", at.format("%Y%m%d_%H%M%S_%6f"), user_id)
}

/// Raw ledger row. Every column is optional so rows written by older
/// versions, or edited by hand, still load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LedgerRow {
    order_id: String,
    user_id: String,
    user_name: String,
    medicine_name: String,
    quantity: String,
    price_per_unit: String,
    total_price: String,
    order_date: String,
    status: String,
    delivery_address: String,
}

impl LedgerRow {
    fn into_record(self) -> Option<OrderRecord> {
        if self.order_id.trim().is_empty() {
            return None;
        }
        let status = match self.status.trim() {
            "" => OrderStatus::Pending,
            raw => raw.parse().unwrap_or_else(|_| {
                warn!(order_id = %self.order_id, status = raw, "Unknown status, treating as pending");
                OrderStatus::Pending
            }),
        };
        let delivery_address = self.delivery_address.trim();

        Some(OrderRecord {
            order_id: self.order_id.trim().to_string(),
            user_id: self.user_id,
            user_name: self.user_name,
            medicine_name: self.medicine_name,
            quantity: parse_quantity(&self.quantity),
            price_per_unit: parse_price(&self.price_per_unit),
            total_price: parse_price(&self.total_price),
            order_date: self.order_date,
            status,
            delivery_address: (!delivery_address.is_empty()).then(|| delivery_address.to_string()),
        })
    }
}

/// Handle on the ledger file. Cheap to clone; every call goes to disk.
#[derive(Debug, Clone)]
pub struct OrderLedger {
    path: PathBuf,
}

impl OrderLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with its header row when it does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), OrderError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(LEDGER_HEADER)?;
        writer.flush()?;
        info!(path = %self.path.display(), "Created order ledger");
        Ok(())
    }

    /// Adds the `status` and `delivery_address` columns to ledgers written
    /// before they existed. Returns whether the file was rewritten.
    pub fn migrate(&self) -> Result<bool, OrderError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let (mut headers, mut rows) = self.read_raw()?;

        let mut added = Vec::new();
        for (column, default) in [("status", OrderStatus::Pending.as_str()), ("delivery_address", "")] {
            if headers.iter().any(|h| h == column) {
                continue;
            }
            let width = headers.len();
            headers.push_field(column);
            for row in &mut rows {
                let mut fields: Vec<&str> = row.iter().collect();
                fields.resize(width, "");
                fields.push(default);
                *row = StringRecord::from(fields);
            }
            added.push(column);
        }

        if added.is_empty() {
            return Ok(false);
        }
        self.write_raw(&headers, &rows)?;
        info!(columns = ?added, "Migrated order ledger");
        Ok(true)
    }

    /// Appends one row per cart line, all sharing a freshly generated order id.
    pub fn append_order(
        &self,
        items: &[CartItem],
        user: &ChatUser,
        delivery_address: &str,
        placed_at: DateTime<Local>,
    ) -> Result<String, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        self.ensure_exists()?;

        let order_id = generate_order_id(&user.id, placed_at);
        let order_date = placed_at.format(ORDER_DATE_FORMAT).to_string();
        let delivery_address = delivery_address.trim();

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for item in items {
            writer.serialize(OrderRecord {
                order_id: order_id.clone(),
                user_id: user.id.clone(),
                user_name: user.name.clone(),
                medicine_name: item.name.clone(),
                quantity: item.quantity,
                price_per_unit: item.unit_price,
                total_price: item.subtotal().round_dp(2),
                order_date: order_date.clone(),
                status: OrderStatus::Pending,
                delivery_address: (!delivery_address.is_empty()).then(|| delivery_address.to_string()),
            })?;
        }
        writer.flush()?;

        info!(order_id = %order_id, lines = items.len(), "Order appended to ledger");
        Ok(order_id)
    }

    /// Every valid row, in file order. A missing file is an empty ledger.
    pub fn read_all(&self) -> Result<Vec<OrderRecord>, OrderError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for row in reader.deserialize::<LedgerRow>() {
            match row {
                Ok(row) => records.extend(row.into_record()),
                Err(e) => warn!(error = %e, "Skipping unreadable ledger row"),
            }
        }
        debug!(rows = records.len(), "Ledger read");
        Ok(records)
    }

    /// The lines of one order.
    pub fn order_items(&self, order_id: &str) -> Result<Vec<OrderRecord>, OrderError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|record| record.order_id == order_id)
            .collect())
    }

    /// Sets `status` on every row of `order_id` and returns how many rows
    /// were rewritten. An unknown id touches nothing and returns zero.
    pub fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<usize, OrderError> {
        if !self.path.exists() {
            return Ok(0);
        }
        self.migrate()?;
        let (headers, mut rows) = self.read_raw()?;
        let column = |name: &str| headers.iter().position(|h| h == name);
        let (Some(id_column), Some(status_column)) = (column("order_id"), column("status")) else {
            return Err(OrderError::Persistence("ledger header is missing order_id or status".into()));
        };

        let mut affected = 0;
        for row in &mut rows {
            if row.get(id_column).map(str::trim) != Some(order_id) {
                continue;
            }
            let mut fields: Vec<&str> = row.iter().collect();
            fields.resize(fields.len().max(status_column + 1), "");
            fields[status_column] = status.as_str();
            *row = StringRecord::from(fields);
            affected += 1;
        }

        if affected == 0 {
            debug!(order_id, "No ledger rows for order");
            return Ok(0);
        }
        self.write_raw(&headers, &rows)?;
        info!(order_id, status = %status, rows = affected, "Order status updated");
        Ok(affected)
    }

    /// Distinct customer names containing `term` (case-insensitive), in
    /// first-seen order.
    pub fn customers(&self, term: &str) -> Result<Vec<String>, OrderError> {
        let term = term.trim().to_lowercase();
        let mut seen = HashSet::new();
        Ok(self
            .read_all()?
            .into_iter()
            .map(|record| record.user_name)
            .filter(|name| !name.trim().is_empty() && name.to_lowercase().contains(&term))
            .filter(|name| seen.insert(name.clone()))
            .collect())
    }

    /// Sum of `total_price` for one order's lines.
    pub fn order_total(records: &[OrderRecord]) -> Decimal {
        records.iter().map(|record| record.total_price).sum()
    }

    fn read_raw(&self) -> Result<(StringRecord, Vec<StringRecord>), OrderError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok((headers, rows))
    }

    fn write_raw(&self, headers: &StringRecord, rows: &[StringRecord]) -> Result<(), OrderError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ledger() -> (tempfile::TempDir, OrderLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = OrderLedger::new(dir.path().join("data").join("orders.csv"));
        (dir, ledger)
    }

    fn item(name: &str, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            name: name.into(),
            unit_price: price,
            quantity,
        }
    }

    fn at(second: u32, micro: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, second)
            .single()
            .unwrap()
            + chrono::Duration::microseconds(i64::from(micro))
    }

    #[test]
    fn order_id_has_microsecond_resolution() {
        let first = generate_order_id("42", at(0, 1));
        let second = generate_order_id("42", at(0, 2));
        assert_eq!(first, "ORD_20240309_140500_000001_42");
        assert_ne!(first, second);
    }

    #[test]
    fn ensure_exists_writes_header_once() {
        let (_dir, ledger) = ledger();
        ledger.ensure_exists().unwrap();
        ledger.ensure_exists().unwrap();
        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(contents, format!("{}\n", LEDGER_HEADER.join(",")));
    }

    #[test]
    fn appended_lines_share_one_pending_order() {
        let (_dir, ledger) = ledger();
        let user = ChatUser::new("42", "Asha Rao");
        let items = vec![
            item("Crocin", Decimal::new(300, 1), 2),
            item("Dolo 650", Decimal::new(3133, 2), 3),
            item("Azithral 500", Decimal::new(1195, 1), 1),
        ];

        let order_id = ledger
            .append_order(&items, &user, "221B Baker St", at(1, 0))
            .unwrap();
        let records = ledger.read_all().unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.order_id == order_id));
        assert!(records.iter().all(|r| r.status == OrderStatus::Pending));
        assert!(records.iter().all(|r| r.user_id == "42"));
        assert!(records
            .iter()
            .all(|r| r.delivery_address.as_deref() == Some("221B Baker St")));
        assert!(records.iter().all(|r| r.order_date == "2024-03-09 14:05:01"));
        assert_eq!(records[1].total_price, Decimal::new(9399, 2));
    }

    #[test]
    fn empty_order_is_rejected_without_touching_the_file() {
        let (_dir, ledger) = ledger();
        let user = ChatUser::new("42", "Asha Rao");
        assert_eq!(
            ledger.append_order(&[], &user, "somewhere", at(0, 0)),
            Err(OrderError::EmptyCart)
        );
        assert!(!ledger.path().exists());
    }

    #[test]
    fn status_update_touches_only_matching_order() {
        let (_dir, ledger) = ledger();
        let user = ChatUser::new("42", "Asha Rao");
        let first = ledger
            .append_order(&[item("Crocin", Decimal::new(30, 0), 1), item("Dolo", Decimal::new(2, 0), 1)], &user, "A", at(2, 0))
            .unwrap();
        let second = ledger
            .append_order(&[item("Crocin", Decimal::new(30, 0), 1)], &user, "B", at(3, 0))
            .unwrap();

        assert_eq!(ledger.update_status(&first, OrderStatus::Completed), Ok(2));

        let records = ledger.read_all().unwrap();
        for record in &records {
            let expected = if record.order_id == first {
                OrderStatus::Completed
            } else {
                OrderStatus::Pending
            };
            assert_eq!(record.status, expected, "order {}", record.order_id);
        }
        assert!(records.iter().any(|r| r.order_id == second));
    }

    #[test]
    fn unknown_order_status_update_is_a_no_op() {
        let (_dir, ledger) = ledger();
        let user = ChatUser::new("42", "Asha Rao");
        ledger
            .append_order(&[item("Crocin", Decimal::new(30, 0), 1)], &user, "A", at(4, 0))
            .unwrap();
        let before = std::fs::read_to_string(ledger.path()).unwrap();

        assert_eq!(ledger.update_status("ORD_missing", OrderStatus::Cancelled), Ok(0));
        assert_eq!(std::fs::read_to_string(ledger.path()).unwrap(), before);
    }

    #[test]
    fn migrate_adds_missing_columns() {
        let (_dir, ledger) = ledger();
        std::fs::create_dir_all(ledger.path().parent().unwrap()).unwrap();
        std::fs::write(
            ledger.path(),
            "order_id,user_id,user_name,medicine_name,quantity,price_per_unit,total_price,order_date\n\
             ORD_1,7,Ravi,Crocin,2,30.0,60.0,2024-01-02 10:00:00\n",
        )
        .unwrap();

        assert_eq!(ledger.migrate(), Ok(true));
        assert_eq!(ledger.migrate(), Ok(false));

        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(contents.starts_with(&LEDGER_HEADER.join(",")));
        assert!(contents.contains("2024-01-02 10:00:00,pending,"));

        let records = ledger.read_all().unwrap();
        assert_eq!(records[0].status, OrderStatus::Pending);
        assert_eq!(records[0].delivery_address, None);
    }

    #[test]
    fn legacy_rows_without_status_read_as_pending() {
        let (_dir, ledger) = ledger();
        std::fs::create_dir_all(ledger.path().parent().unwrap()).unwrap();
        std::fs::write(
            ledger.path(),
            "order_id,user_id,user_name,medicine_name,quantity,price_per_unit,total_price,order_date\n\
             ORD_1,7,Ravi,Crocin,2.0,30.0,60.0,2024-01-02 10:00:00\n\
             ,7,Ravi,Orphan,1,1,1,2024-01-02 10:00:00\n",
        )
        .unwrap();

        let records = ledger.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 2);
        assert_eq!(records[0].status, OrderStatus::Pending);
    }

    #[test]
    fn customers_are_distinct_and_filtered() {
        let (_dir, ledger) = ledger();
        let items = [item("Crocin", Decimal::new(30, 0), 1)];
        ledger.append_order(&items, &ChatUser::new("1", "Asha Rao"), "A", at(5, 0)).unwrap();
        ledger.append_order(&items, &ChatUser::new("1", "Asha Rao"), "A", at(6, 0)).unwrap();
        ledger.append_order(&items, &ChatUser::new("2", "Ravi Kumar"), "B", at(7, 0)).unwrap();

        assert_eq!(ledger.customers("").unwrap(), vec!["Asha Rao", "Ravi Kumar"]);
        assert_eq!(ledger.customers("RAV").unwrap(), vec!["Ravi Kumar"]);
        assert!(ledger.customers("zed").unwrap().is_empty());
    }
}
