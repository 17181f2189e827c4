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

//! Shared instrument/market primitives for the Playcore execution core.
//!
//! This crate intentionally stays narrow: Playcore drives a single venue (Bybit v5
//! perpetuals), so there is no generic multi-exchange `Instrument<ExchangeKey, AssetKey>`
//! abstraction here — just the concrete types every other `playcore-*` crate shares
//! (`Bar`, `Timeframe`, `TfRole`, `Side`, `Symbol`, `Position`).

pub mod bar;
pub mod exchange;
pub mod instrument;
pub mod order;
pub mod position;
pub mod side;
pub mod signal;
pub mod symbol;
pub mod timeframe;

pub use bar::{Bar, InputSource};
pub use exchange::{Env, ExchangeId, ExchangeIndex};
pub use instrument::{Instrument, InstrumentSpec};
pub use order::{ConditionalOrderType, Order, OrderType, TimeInForce};
pub use position::Position;
pub use side::{Direction, Side};
pub use signal::Signal;
pub use symbol::{EngineId, Symbol};
pub use timeframe::{ParseTimeframeError, TfRole, Timeframe};
