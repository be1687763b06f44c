pub mod cart;
pub mod catalog;
pub mod chat;
pub mod order;

pub use cart::*;
pub use catalog::*;
pub use chat::*;
pub use order::*;
