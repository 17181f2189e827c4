#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Low-level plumbing shared by every `playcore-*` crate that talks to Bybit: channels,
//! collections, rate limiting and the signed REST/WS framework, plus the [`exchange::ExchangeAdapter`]
//! trait the execution core is written against.

pub mod channel;
pub mod collection;
pub mod error;
pub mod exchange;
pub mod metric;
pub mod protocol;
pub mod rate_limit;
pub mod snapshot;

pub use error::{SocketError, Unrecoverable};
