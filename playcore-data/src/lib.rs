#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! The data-environment layer (C1, C4, §6): an env-isolated historical store (`store`), an
//! in-process realtime fan-out bus (`bus`), and the multi-timeframe data provider that feeds
//! C8's PlayEngine point-in-time candle/indicator/structure reads (`provider`).

pub mod bus;
pub mod provider;
pub mod store;

pub use bus::{BusEvent, Callback, RealtimeBus, Topic};
pub use provider::{DataProvider, ProviderError};
pub use store::{HistoricalStore, InMemoryHistoricalStore, StoreError};
