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

//! The order executor (C7): idempotent, panic-latch- and mode-aware order submission against
//! either the live/demo Bybit v5 REST surface (`bybit`) or a local fill simulator
//! (`simulated`), both implementing `playcore_integration::exchange::ExchangeAdapter`.
//!
//! `executor` is the mode-agnostic core (`OrderExecutor`); `idempotency`/`pending` are its two
//! supporting data structures (bounded order-id dedup, and the in-flight order map);
//! `error` is this crate's REST/API error type.

pub mod bybit;
pub mod error;
pub mod executor;
pub mod idempotency;
pub mod pending;
pub mod simulated;

pub use error::{BybitApiError, ExecutionError};
pub use executor::{ExecutorDenial, OrderExecutor, TradingMode, validate_trading_mode_consistency};
pub use idempotency::IdempotencyCache;
pub use pending::{PendingOrder, PendingOrders, PendingStatus, DEFAULT_PENDING_MAX_AGE};
pub use simulated::SimulatedExchangeAdapter;
