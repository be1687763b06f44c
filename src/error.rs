use thiserror::Error;

/// Errors raised by the catalog store and its service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Medicine not found: {0}")]
    NotFound(String),
    #[error("Catalog persistence error: {0}")]
    Persistence(String),
    #[error("Invalid stock range: min {min} is greater than max {max}")]
    InvalidStockRange { min: u32, max: u32 },
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<csv::Error> for CatalogError {
    fn from(e: csv::Error) -> Self {
        CatalogError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Persistence(e.to_string())
    }
}

/// Errors raised by cart mutations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Insufficient stock for {name}: requested {requested}, in cart {in_cart}, available {available}")]
    OutOfStock {
        name: String,
        requested: u32,
        in_cart: u32,
        available: u32,
    },
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
    #[error("Cart is empty")]
    EmptyCart,
}

/// Errors raised by the order ledger and the order service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Cannot place an order from an empty cart")]
    EmptyCart,
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),
    #[error("Order persistence error: {0}")]
    Persistence(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<csv::Error> for OrderError {
    fn from(e: csv::Error) -> Self {
        OrderError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for OrderError {
    fn from(e: std::io::Error) -> Self {
        OrderError::Persistence(e.to_string())
    }
}

/// Errors raised while driving a chat session. Every variant is turned into
/// a reply at the session boundary; none of them ends the session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Search results expired, search again")]
    StaleSelection,
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Errors raised by the Telegram Bot API client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TelegramError {
    #[error("Telegram HTTP error: {0}")]
    Http(String),
    #[error("Telegram API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest embeds the request URL (and with it the bot token) in its errors.
        TelegramError::Http(e.without_url().to_string())
    }
}

/// Process-level errors. Only these terminate the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("No Telegram bot token configured (set TELEGRAM_BOT_TOKEN or MEDISEARCH__TELEGRAM_TOKEN)")]
    MissingToken,
    #[error("Invalid dashboard address: {0}")]
    InvalidAddress(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Telegram(#[from] TelegramError),
}
