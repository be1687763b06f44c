use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// Callback payload carried by an inline button.
///
/// Indices refer to the session's last search-result list, so a token is
/// only meaningful to the session that rendered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonToken {
    Medicine(usize),
    Add { index: usize, quantity: u32 },
    ViewCart,
    ClearCart,
    PlaceOrder,
}

impl FromStr for ButtonToken {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SessionError::MalformedInput(format!("unknown button token '{}'", s));

        match s {
            "view_cart" => return Ok(ButtonToken::ViewCart),
            "clear_cart" => return Ok(ButtonToken::ClearCart),
            // older keyboards sent "checkout" for the same button
            "place_order" | "checkout" => return Ok(ButtonToken::PlaceOrder),
            _ => {}
        }

        let mut parts = s.split('_');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("med"), Some(index), None, None) => {
                let index = index.parse().map_err(|_| malformed())?;
                Ok(ButtonToken::Medicine(index))
            }
            (Some("add"), Some(index), Some(quantity), None) => {
                let index = index.parse().map_err(|_| malformed())?;
                let quantity = quantity.parse().map_err(|_| malformed())?;
                Ok(ButtonToken::Add { index, quantity })
            }
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for ButtonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonToken::Medicine(index) => write!(f, "med_{}", index),
            ButtonToken::Add { index, quantity } => write!(f, "add_{}_{}", index, quantity),
            ButtonToken::ViewCart => f.write_str("view_cart"),
            ButtonToken::ClearCart => f.write_str("clear_cart"),
            ButtonToken::PlaceOrder => f.write_str("place_order"),
        }
    }
}
