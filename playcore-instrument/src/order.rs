use crate::side::Side;
use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    GoodTilCancel,
    ImmediateOrCancel,
    FillOrKill,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalOrderType {
    Market,
    Limit,
}

/// A post-risk order ready for the executor (C7, §3 Data Model). `client_order_id` is the
/// idempotency key (§4.7) — callers that don't supply one get one generated by the executor
/// before submission.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub symbol: Symbol,
    pub side: Side,
    pub size_usdt: Decimal,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub tif: TimeInForce,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub tp_order_type: ConditionalOrderType,
    pub sl_order_type: ConditionalOrderType,
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
