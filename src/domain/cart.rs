use rust_decimal::Decimal;

use crate::domain::CatalogEntry;
use crate::error::CartError;

/// A line of a cart. `unit_price` is a snapshot taken on the first add.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Result of a successful [`Cart::add_item`].
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added(CartItem),
    Merged(CartItem),
}

impl AddOutcome {
    pub fn item(&self) -> &CartItem {
        match self {
            AddOutcome::Added(item) | AddOutcome::Merged(item) => item,
        }
    }
}

/// Per-session cart. Holds at most one line per medicine name, in the order
/// the lines were first added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units of `entry`, merging into an existing line.
    ///
    /// # Errors
    /// - `InvalidQuantity` when `quantity` is zero.
    /// - `OutOfStock` when the resulting line quantity would exceed the
    ///   entry's current stock. The cart is left unchanged.
    pub fn add_item(&mut self, entry: &CatalogEntry, quantity: u32) -> Result<AddOutcome, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let in_cart = self.quantity_of(&entry.name);
        let wanted = in_cart.checked_add(quantity).unwrap_or(u32::MAX);
        if wanted > entry.quantity {
            return Err(CartError::OutOfStock {
                name: entry.name.clone(),
                requested: quantity,
                in_cart,
                available: entry.quantity,
            });
        }

        match self.items.iter_mut().find(|item| item.name == entry.name) {
            Some(existing) => {
                existing.quantity = wanted;
                Ok(AddOutcome::Merged(existing.clone()))
            }
            None => {
                let item = CartItem {
                    name: entry.name.clone(),
                    unit_price: entry.price,
                    quantity,
                };
                self.items.push(item.clone());
                Ok(AddOutcome::Added(item))
            }
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of line subtotals at full precision.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Snapshot of the lines to be ordered.
    ///
    /// # Errors
    /// `EmptyCart` when there is nothing to order.
    pub fn checkout(&self) -> Result<Vec<CartItem>, CartError> {
        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        Ok(self.items.clone())
    }

    pub fn quantity_of(&self, name: &str) -> u32 {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.quantity)
            .unwrap_or(0)
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crocin() -> CatalogEntry {
        CatalogEntry::new("Crocin", Decimal::new(300, 1), 5)
    }

    #[test]
    fn adding_twice_merges_into_one_line() {
        let mut cart = Cart::new();
        let entry = crocin();

        assert!(matches!(cart.add_item(&entry, 2), Ok(AddOutcome::Added(_))));
        let outcome = cart.add_item(&entry, 3).unwrap();

        assert!(matches!(outcome, AddOutcome::Merged(_)));
        assert_eq!(outcome.item().quantity, 5);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of("Crocin"), 5);
    }

    #[test]
    fn exceeding_stock_on_merge_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        let entry = crocin();
        cart.add_item(&entry, 3).unwrap();
        let before = cart.clone();

        let err = cart.add_item(&entry, 3).unwrap_err();

        assert_eq!(
            err,
            CartError::OutOfStock {
                name: "Crocin".into(),
                requested: 3,
                in_cart: 3,
                available: 5,
            }
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn first_add_above_stock_is_rejected() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.add_item(&crocin(), 6),
            Err(CartError::OutOfStock { in_cart: 0, .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut cart = Cart::new();
        assert_eq!(cart.add_item(&crocin(), 0), Err(CartError::InvalidQuantity(0)));
    }

    #[test]
    fn price_is_not_refreshed_on_merge() {
        let mut cart = Cart::new();
        let mut entry = crocin();
        cart.add_item(&entry, 1).unwrap();

        entry.price = Decimal::new(450, 1);
        cart.add_item(&entry, 1).unwrap();

        assert_eq!(cart.items()[0].unit_price, Decimal::new(300, 1));
        assert_eq!(cart.total(), Decimal::new(60, 0));
    }

    #[test]
    fn total_keeps_full_precision() {
        let mut cart = Cart::new();
        let entry = CatalogEntry::new("Dolo 650", Decimal::new(30333, 3), 10);
        cart.add_item(&entry, 3).unwrap();
        assert_eq!(cart.total(), Decimal::new(90999, 3));
    }

    #[test]
    fn checkout_requires_items_and_clear_empties() {
        let mut cart = Cart::new();
        assert_eq!(cart.checkout(), Err(CartError::EmptyCart));

        cart.add_item(&crocin(), 1).unwrap();
        assert_eq!(cart.checkout().unwrap().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.checkout(), Err(CartError::EmptyCart));
    }
}
