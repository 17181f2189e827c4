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

//! Risk management for Playcore: per-signal sizing and caps (C6) and the safety/panic latch
//! (C11).
//!
//! `sizing`/`check` compute and cap a signal's notional; `global_risk`/`daily_loss` track the
//! account-wide gates (`global_risk_view`) consulted before an entry is admitted; `panic` is the
//! process-global fail-closed latch. `alert`/`correlation`/`drawdown`/`exposure`/
//! `position_tracker`/`volatility` are supporting exposure and portfolio-risk trackers.

pub mod alert;
pub mod check;
pub mod correlation;
pub mod daily_loss;
pub mod drawdown;
pub mod exposure;
pub mod global_risk;
pub mod panic;
pub mod position_tracker;
pub mod sizing;
pub mod volatility;

pub use alert::{RiskAlertHook, RiskViolation, VecAlertHook};
pub use check::{RiskConfigError, RiskDenial, RiskLimits, RiskManager, hard_max_leverage, hard_max_position_usdt, hard_min_balance_usdt};
pub use correlation::CorrelationMatrix;
pub use daily_loss::DailyLossTracker;
pub use drawdown::DrawdownTracker;
pub use exposure::ExposureTracker;
pub use global_risk::{AccountMarginSnapshot, GlobalRiskDenial, GlobalRiskView, WsHealth, DEFAULT_WS_STALE_THRESHOLD};
pub use panic::{PanicRecord, PanicState};
pub use position_tracker::PositionTracker;
pub use sizing::SizingModel;
pub use volatility::VolatilityScaler;
