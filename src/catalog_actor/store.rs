//! Flat-file catalog repository.
//!
//! The dataset is a CSV with at least `name`, a `price…` column,
//! `manufacturer_name`, `type`, `pack_size_label` and `short_composition1`.
//! `short_composition2`, `quantity` and `Is_discontinued` are optional.
//! Rows are kept as raw bytes, including rows that are not valid UTF-8 and
//! never become entries, so that persisting only ever changes `quantity`.

use std::ops::RangeInclusive;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ByteRecord, StringRecord};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::CatalogEntry;
use crate::error::CatalogError;

/// Stock assigned to every row of a dataset that has no `quantity` column.
pub const DEFAULT_STOCK: u32 = 100;

const CURRENCY_MARKERS: [&str; 5] = ["₹", "Rs.", "Rs", "INR", "$"];
const QUANTITY_COLUMN: &str = "quantity";

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Default)]
struct Columns {
    name: usize,
    price: Option<usize>,
    manufacturer: Option<usize>,
    category: Option<usize>,
    package_size: Option<usize>,
    composition1: Option<usize>,
    composition2: Option<usize>,
    quantity: Option<usize>,
    discontinued: Option<usize>,
}

impl Columns {
    fn resolve(headers: &ByteRecord) -> Result<Self, CatalogError> {
        let names: Vec<Cow<'_, str>> = headers.iter().map(String::from_utf8_lossy).collect();
        let find = |wanted: &str| {
            names
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(wanted))
        };
        let name = find("name")
            .ok_or_else(|| CatalogError::Persistence("dataset has no `name` column".to_string()))?;

        Ok(Self {
            name,
            price: names
                .iter()
                .position(|header| header.trim().to_ascii_lowercase().starts_with("price")),
            manufacturer: find("manufacturer_name"),
            category: find("type"),
            package_size: find("pack_size_label"),
            composition1: find("short_composition1"),
            composition2: find("short_composition2"),
            quantity: find(QUANTITY_COLUMN),
            discontinued: find("is_discontinued"),
        })
    }
}

/// In-memory image of the catalog file.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    default_stock: u32,
    headers: ByteRecord,
    rows: Vec<ByteRecord>,
    columns: Columns,
    entries: Vec<CatalogEntry>,
    /// `row_of[i]` is the index in `rows` that `entries[i]` came from.
    row_of: Vec<usize>,
}

impl CatalogStore {
    /// An empty store bound to `path`; nothing is read until [`reload`](Self::reload).
    pub fn new(path: impl Into<PathBuf>, default_stock: u32) -> Self {
        Self {
            path: path.into(),
            default_stock,
            headers: ByteRecord::new(),
            rows: Vec::new(),
            columns: Columns::default(),
            entries: Vec::new(),
            row_of: Vec::new(),
        }
    }

    /// Loads the catalog, substituting an empty one when the file cannot be
    /// read or parsed.
    pub fn open(path: impl Into<PathBuf>, default_stock: u32) -> Self {
        let mut store = Self::new(path, default_stock);
        match store.reload() {
            Ok(count) => info!(path = %store.path.display(), entries = count, "Catalog loaded"),
            Err(e) => warn!(path = %store.path.display(), error = %e, "Catalog unreadable, starting empty"),
        }
        store
    }

    /// Re-reads the backing file, discarding the previous contents.
    ///
    /// A missing file yields an empty catalog. On a read or parse error the
    /// current contents are kept and the error is returned.
    pub fn reload(&mut self) -> Result<usize, CatalogError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Catalog file missing");
            self.replace(ByteRecord::new(), Vec::new(), Columns::default(), Vec::new(), Vec::new());
            return Ok(0);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let headers = reader.byte_headers()?.clone();
        let columns = Columns::resolve(&headers)?;

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            match record {
                Ok(record) => rows.push(record),
                Err(e) => warn!(error = %e, "Skipping unreadable catalog row"),
            }
        }

        let mut entries = Vec::with_capacity(rows.len());
        let mut row_of = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let row = match StringRecord::from_byte_record(row.clone()) {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "Catalog row is not valid UTF-8, leaving it out of the catalog");
                    continue;
                }
            };
            if let Some(entry) = parse_entry(&row, &columns, self.default_stock) {
                entries.push(entry);
                row_of.push(index);
            }
        }

        let count = entries.len();
        self.replace(headers, rows, columns, entries, row_of);
        Ok(count)
    }

    fn replace(
        &mut self,
        headers: ByteRecord,
        rows: Vec<ByteRecord>,
        columns: Columns,
        entries: Vec<CatalogEntry>,
        row_of: Vec<usize>,
    ) {
        self.headers = headers;
        self.rows = rows;
        self.columns = columns;
        self.entries = entries;
        self.row_of = row_of;
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// First entry whose name matches exactly.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Lowers the stock of every entry named `name` by `quantity`, stopping at
    /// zero. Returns the remaining stock of the first such entry.
    pub fn decrement(&mut self, name: &str, quantity: u32) -> Result<u32, CatalogError> {
        let mut remaining = None;
        for entry in self.entries.iter_mut().filter(|entry| entry.name == name) {
            entry.quantity = entry.quantity.saturating_sub(quantity);
            remaining.get_or_insert(entry.quantity);
        }
        remaining.ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    /// Assigns each entry a random stock level drawn from `range`.
    pub fn randomize_stock(&mut self, range: RangeInclusive<u32>, rng: &mut impl Rng) {
        for entry in &mut self.entries {
            entry.quantity = rng.gen_range(range.clone());
        }
    }

    /// Writes the catalog back to its file, adding a `quantity` column when
    /// the dataset did not have one.
    pub fn persist(&mut self) -> Result<(), CatalogError> {
        if self.headers.is_empty() {
            debug!("Nothing to persist for an empty catalog");
            return Ok(());
        }

        let quantity_column = match self.columns.quantity {
            Some(index) => index,
            None => {
                let index = self.headers.len();
                self.headers.push_field(QUANTITY_COLUMN.as_bytes());
                let stock = self.default_stock.to_string();
                for row in &mut self.rows {
                    *row = with_field(row, index, stock.as_bytes());
                }
                self.columns.quantity = Some(index);
                index
            }
        };

        for (entry, &row_index) in self.entries.iter().zip(&self.row_of) {
            let row = &mut self.rows[row_index];
            *row = with_field(row, quantity_column, entry.quantity.to_string().as_bytes());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        writer.write_byte_record(&self.headers)?;
        for row in &self.rows {
            writer.write_byte_record(row)?;
        }
        writer.flush()?;

        info!(path = %self.path.display(), rows = self.rows.len(), "Catalog persisted");
        Ok(())
    }
}

/// Copy of `row` with field `index` set to `value`, padding short rows.
fn with_field(row: &ByteRecord, index: usize, value: &[u8]) -> ByteRecord {
    let mut fields: Vec<&[u8]> = row.iter().collect();
    if fields.len() <= index {
        fields.resize(index + 1, &[]);
    }
    fields[index] = value;
    ByteRecord::from(fields)
}

/// Builds an entry from a decoded row; rows without a name are skipped.
fn parse_entry(row: &StringRecord, columns: &Columns, default_stock: u32) -> Option<CatalogEntry> {
    let text = |index: Option<usize>| {
        index
            .and_then(|i| row.get(i))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let name = text(Some(columns.name));
    if name.is_empty() {
        return None;
    }

    let composition2 = text(columns.composition2);
    Some(CatalogEntry {
        name,
        price: parse_price(&text(columns.price)),
        quantity: match columns.quantity {
            Some(_) => parse_quantity(&text(columns.quantity)),
            None => default_stock,
        },
        manufacturer: text(columns.manufacturer),
        category: text(columns.category),
        package_size: text(columns.package_size),
        composition1: text(columns.composition1),
        composition2: (!composition2.is_empty()).then_some(composition2),
        discontinued: parse_flag(&text(columns.discontinued)),
    })
}

/// Coerces a price carrying currency markers anywhere in it into a
/// non-negative decimal. Anything unparseable becomes zero.
pub fn parse_price(raw: &str) -> Decimal {
    let mut text = raw.to_string();
    for marker in CURRENCY_MARKERS {
        text = text.replace(marker, "");
    }
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map(|price| price.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

/// Coerces integer or float text into a non-negative stock count.
pub fn parse_quantity(raw: &str) -> u32 {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return value.clamp(0, i64::from(u32::MAX)) as u32;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value.min(f64::from(u32::MAX)).floor() as u32,
        _ => 0,
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

/// Rewrites a dataset with random stock levels.
pub fn restock_file(path: &Path, min: u32, max: u32) -> Result<usize, CatalogError> {
    if min > max {
        return Err(CatalogError::InvalidStockRange { min, max });
    }
    if !path.exists() {
        return Err(CatalogError::Persistence(format!(
            "dataset not found: {}",
            path.display()
        )));
    }

    let mut store = CatalogStore::new(path, DEFAULT_STOCK);
    let count = store.reload()?;
    store.randomize_stock(min..=max, &mut rand::thread_rng());
    store.persist()?;
    Ok(count)
}
