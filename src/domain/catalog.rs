use rust_decimal::Decimal;

/// One medicine row of the catalog.
///
/// Built only by the catalog store, which normalizes the raw dataset:
/// text is trimmed, `price` is a non-negative decimal with currency markers
/// stripped and `quantity` is clamped at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub manufacturer: String,
    pub category: String,
    pub package_size: String,
    pub composition1: String,
    pub composition2: Option<String>,
    pub discontinued: bool,
}

impl CatalogEntry {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            manufacturer: String::new(),
            category: String::new(),
            package_size: String::new(),
            composition1: String::new(),
            composition2: None,
            discontinued: false,
        }
    }

    /// Both composition fields joined by `", "` when the second is present.
    pub fn composition(&self) -> String {
        match &self.composition2 {
            Some(second) if !second.is_empty() => format!("{}, {}", self.composition1, second),
            _ => self.composition1.clone(),
        }
    }

    /// Whether the entry should be offered to a customer.
    pub fn is_available(&self) -> bool {
        self.quantity > 0 && !self.discontinued
    }
}
