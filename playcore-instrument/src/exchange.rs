use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Identifies the venue an [`Order`](crate::Order)/[`Position`](crate::Position) was booked
/// against.
///
/// Playcore targets a single live venue (Bybit v5 perpetuals); `Simulated` is the adapter used
/// by the backtest engine and by shadow mode, which never reaches a real venue.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename = "execution", rename_all = "snake_case")]
pub enum ExchangeId {
    BybitPerpetualsUsd,
    Simulated,
}

impl ExchangeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::BybitPerpetualsUsd => "bybit_perpetuals_usd",
            ExchangeId::Simulated => "simulated",
        }
    }
}

/// The two isolated data/account environments a [`crate::Symbol`] may be traded under (C1).
///
/// Every historical table, bar buffer, and ticker cache is keyed by `Env` so that `Live` and
/// `Demo` never share state, and a paper-money mistake can never touch a real position.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Env {
    Live,
    Demo,
}

impl Env {
    /// `BYBIT_USE_DEMO` must be `true` iff `Env::Demo` — see `TradingMode::is_consistent_with`.
    pub fn use_demo_flag(&self) -> bool {
        matches!(self, Env::Demo)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct ExchangeIndex(pub usize);

impl ExchangeIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ExchangeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeIndex({})", self.0)
    }
}
