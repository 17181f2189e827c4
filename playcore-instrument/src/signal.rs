use crate::side::Direction;
use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A sizing/risk-free trading intent produced by the rule evaluator + PlayEngine (§3 Data
/// Model). `size_usdt` is the evaluator's raw notional request; C6 (risk & sizing) is what
/// turns it into an [`crate::order::Order`], adjusting or denying it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Signal {
    pub symbol: Symbol,
    pub direction: Direction,
    pub size_usdt: Decimal,
    pub strategy: String,
    pub confidence: f64,
    pub reference_price: Option<Decimal>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Signal {
    pub fn is_closing(&self) -> bool {
        matches!(self.direction, Direction::Flat)
    }
}
