//! Reply text and keyboards for every turn of the chat flow.

use rust_decimal::Decimal;

use super::tokens::ButtonToken;
use crate::domain::{AddOutcome, Cart, CatalogEntry, PlacedOrder};

const LIST_NAME_WIDTH: usize = 30;
const QUANTITY_CHOICES: [(u32, &str); 5] = [(1, "1️⃣"), (2, "2️⃣"), (3, "3️⃣"), (4, "4️⃣"), (5, "5️⃣")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: ButtonToken) -> Self {
        Self {
            label: label.into(),
            token: token.to_string(),
        }
    }
}

/// Outgoing message: text plus rows of inline buttons (possibly none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            buttons,
        }
    }

    #[cfg(test)]
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().flatten().map(|button| button.token.as_str())
    }
}

/// Two-decimal rupee amount. Rounding happens here and nowhere earlier.
pub fn money(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}

pub fn welcome() -> Reply {
    Reply::text(
        "Welcome to MediSearch! 🏥\n\n\
         I can help you find and order medicines. You can:\n\n\
         🔍 Search by:\n\
         • Medicine name\n\
         • Salt composition\n\
         • Therapeutic class\n\n\
         🛒 Shopping:\n\
         • Add medicines to cart\n\
         • View cart with /cart\n\
         • Place orders\n\n\
         Send me any search term to begin!\n\
         Use /help for more details.",
    )
}

pub fn help() -> Reply {
    Reply::text(
        "📖 How to use MediSearch:\n\n\
         🔍 Search Medicines:\n\
         • Type medicine name (e.g., \"Crocin\")\n\
         • Type salt name (e.g., \"Paracetamol\")\n\
         • Type category (e.g., \"Antibiotic\")\n\n\
         🛒 Shopping Commands:\n\
         • Pick a quantity on any medicine to add it\n\
         • Use /cart to view your cart\n\
         • Clear cart or place order from cart view\n\n\
         🛍️ Order Process:\n\
         1. Search for medicines\n\
         2. Add items to cart\n\
         3. Review cart with /cart\n\
         4. Click \"Place Order\" and send your address",
    )
}

pub fn no_results() -> Reply {
    Reply::text(
        "I couldn't find any medicines matching your query.\n\
         Try searching by:\n\
         • Medicine name\n\
         • Composition\n\
         • Type",
    )
}

/// `shown` is the already-truncated list; `total_found` counts every
/// available match.
pub fn search_results(query: &str, total_found: usize, shown: &[CatalogEntry]) -> Reply {
    let buttons = shown
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let name: String = entry.name.chars().take(LIST_NAME_WIDTH).collect();
            let label = format!("{} - {} (Stock: {})", name, money(entry.price), entry.quantity);
            vec![Button::new(label, ButtonToken::Medicine(index))]
        })
        .collect();

    Reply::with_buttons(
        format!(
            "Found {} medicines matching '{}'.\nShowing first {} results. Click for details:",
            total_found,
            query,
            shown.len()
        ),
        buttons,
    )
}

pub fn detail(index: usize, entry: &CatalogEntry) -> Reply {
    let text = format!(
        "💊 Medicine Details:\n\n\
         Name: {}\n\
         Price: {}\n\
         Stock Available: {} units\n\
         Composition: {}\n\
         Package Size: {}\n\
         Manufacturer: {}\n\
         Type: {}\n\n\
         📦 Select quantity to add to cart:",
        entry.name,
        money(entry.price),
        entry.quantity,
        entry.composition(),
        entry.package_size,
        entry.manufacturer,
        entry.category,
    );

    let quantities = QUANTITY_CHOICES
        .iter()
        .map(|(quantity, label)| {
            Button::new(
                *label,
                ButtonToken::Add {
                    index,
                    quantity: *quantity,
                },
            )
        })
        .collect();

    Reply::with_buttons(text, vec![quantities, vec![view_cart_button()]])
}

pub fn added(outcome: &AddOutcome) -> Reply {
    let text = match outcome {
        AddOutcome::Added(item) => format!("Added {}x {} to cart!", item.quantity, item.name),
        AddOutcome::Merged(item) => format!("Updated quantity to {}x {} in cart!", item.quantity, item.name),
    };
    Reply::with_buttons(
        format!("{}\nUse /cart to view or checkout.", text),
        vec![vec![view_cart_button()]],
    )
}

pub fn out_of_stock(requested: u32, in_cart: u32, available: u32) -> Reply {
    if in_cart == 0 {
        Reply::text(format!("Sorry, only {} units available in stock.", available))
    } else {
        Reply::text(format!(
            "Cannot add {} more units. You already have {} in cart and only {} available in stock.",
            requested, in_cart, available
        ))
    }
}

pub fn cart(cart: &Cart) -> Reply {
    if cart.is_empty() {
        return empty_cart();
    }

    let mut text = String::from("🛒 Your Cart:\n\n");
    for item in cart.items() {
        text.push_str(&format!("• {}x {}\n", item.quantity, item.name));
        text.push_str(&format!("  Subtotal: {}\n", money(item.subtotal())));
    }
    text.push_str(&format!("\nTotal: {}", money(cart.total())));

    Reply::with_buttons(
        text,
        vec![vec![
            Button::new("🗑️ Clear Cart", ButtonToken::ClearCart),
            Button::new("✅ Place Order", ButtonToken::PlaceOrder),
        ]],
    )
}

pub fn empty_cart() -> Reply {
    Reply::text("Your cart is empty!")
}

pub fn cart_cleared() -> Reply {
    Reply::text("Cart cleared! 🗑️")
}

pub fn ask_address() -> Reply {
    Reply::text("Please enter your delivery address:\n\n(Include complete address with landmark and PIN code)")
}

pub fn invalid_address() -> Reply {
    Reply::text("The delivery address can't be empty. Please enter your delivery address:")
}

pub fn order_placed(order: &PlacedOrder, address: &str) -> Reply {
    Reply::text(format!(
        "✅ Order placed successfully!\n\n\
         Order ID: {}\n\
         Total Amount: {}\n\
         Delivery Address: {}\n\n\
         Your order will be delivered to the provided address.\n\
         Search for another medicine to place a new order.",
        order.order_id,
        money(order.total),
        address
    ))
}

pub fn order_failed() -> Reply {
    Reply::text("Sorry, I couldn't place your order right now.\nPlease send your delivery address again to retry.")
}

pub fn stale_selection() -> Reply {
    Reply::text("Please search again to see medicine details.")
}

pub fn unknown_medicine() -> Reply {
    Reply::text("Sorry, I couldn't find the medicine details.")
}

pub fn malformed_input() -> Reply {
    Reply::text("Sorry, I didn't understand that button. Please search again.")
}

pub fn busy() -> Reply {
    Reply::text("I'm still working through your previous messages.\nPlease try again in a moment.")
}

pub fn generic_error() -> Reply {
    Reply::text("Sorry, I encountered an error processing your request.\nPlease try again or contact support.")
}

fn view_cart_button() -> Button {
    Button::new("🛒 View Cart", ButtonToken::ViewCart)
}
