//! Bybit v5 [`ExchangeAdapter`](playcore_integration::exchange::ExchangeAdapter) implementation:
//! the live/demo half of C7's order executor (§6).

pub mod adapter;
pub mod parser;
pub mod requests;

pub use adapter::{BybitEnvironment, BybitExchangeAdapter};
