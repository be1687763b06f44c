use crate::domain::{Cart, CatalogEntry};

/// Where a chat session is in the search-to-order flow.
///
/// Picking a quantity happens from the detail view's buttons, so there is no
/// separate state between viewing a medicine and adding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Browsing,
    ViewingDetail { index: usize },
    CartReview,
    AwaitingAddress,
}

/// Everything one chat remembers between messages. Lives only in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub state: SessionState,
    pub cart: Cart,
    /// Results of the last search that found anything, already filtered to
    /// available entries and truncated to the display limit.
    pub last_search: Vec<CatalogEntry>,
    /// When set, the next free-text message is the delivery address.
    pub awaiting_address: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self, index: usize) -> Option<&CatalogEntry> {
        self.last_search.get(index)
    }

    pub fn begin_checkout(&mut self) {
        self.awaiting_address = true;
        self.state = SessionState::AwaitingAddress;
    }

    /// Empties the cart and abandons any pending checkout.
    pub fn clear_cart(&mut self) {
        self.cart.clear();
        self.awaiting_address = false;
        self.state = SessionState::CartReview;
    }

    pub fn finish_order(&mut self) {
        self.cart.clear();
        self.awaiting_address = false;
        self.state = SessionState::Idle;
    }
}
