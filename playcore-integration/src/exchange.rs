//! The exchange adapter surface consumed by C7 (order executor), C8 (PlayEngine) and C9 (live
//! runner) — §6 External interfaces. A single Bybit v5 implementation lives in
//! `playcore-execution`; this trait exists here so `playcore-data` (klines, tickers) and
//! `playcore-execution` (orders, positions) can share one adapter without a crate cycle.

use async_trait::async_trait;
use playcore_instrument::{Bar, Position, Side, Symbol, Timeframe};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Balance {
    pub total: Decimal,
    pub available: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ticker {
    pub symbol: Symbol,
    pub last_price: Decimal,
    pub mark_price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// A caller-constructed order, ready to submit. `client_order_id` is the idempotency key the
/// order executor (C7) tracks to dedupe REST/WS races (§9 design note).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub price: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub reduce_only: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderAck {
    pub client_order_id: String,
    pub exchange_order_id: String,
    pub status: OrderStatus,
}

/// The venue-facing interface every execution mode (backtest/demo/live/shadow) drives through
/// identical call sequences (§2 control flow, §6). A backtest/shadow implementation simulates
/// fills locally; demo/live implementations call Bybit v5's REST/WS surface.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self) -> Result<(), Self::Error>;
    async fn disconnect(&self) -> Result<(), Self::Error>;

    async fn get_balance(&self) -> Result<Balance, Self::Error>;
    async fn get_equity(&self) -> Result<Decimal, Self::Error>;
    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker, Self::Error>;
    async fn get_klines(&self, symbol: &Symbol, tf: Timeframe, limit: usize) -> Result<Vec<Bar>, Self::Error>;
    async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<OrderAck>, Self::Error>;
    /// `None` means flat — no open position for `symbol` (§6, C8 step 4 "fetch position").
    async fn get_position(&self, symbol: &Symbol) -> Result<Option<Position>, Self::Error>;

    async fn market_order(&self, request: OrderRequest) -> Result<OrderAck, Self::Error>;
    async fn limit_order(&self, request: OrderRequest) -> Result<OrderAck, Self::Error>;
    async fn cancel_order(&self, symbol: &Symbol, client_order_id: &str) -> Result<(), Self::Error>;
    async fn cancel_all_orders(&self, symbol: &Symbol) -> Result<(), Self::Error>;
    async fn close_position(&self, symbol: &Symbol) -> Result<(), Self::Error>;
    async fn set_leverage(&self, symbol: &Symbol, leverage: u8) -> Result<(), Self::Error>;

    async fn tick_size(&self, symbol: &Symbol) -> Result<Decimal, Self::Error>;
    async fn min_qty(&self, symbol: &Symbol) -> Result<Decimal, Self::Error>;
    async fn min_notional(&self, symbol: &Symbol) -> Result<Decimal, Self::Error>;
}
