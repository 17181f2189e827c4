use crate::side::Side;
use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Open position snapshot (§3 Data Model). `side` is always normalised via [`Side`], regardless
/// of the exchange's own lexicon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    pub size_qty: Decimal,
    pub size_usdt: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub leverage: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub liquidation_price: Option<Decimal>,
}

impl Position {
    /// Recompute `unrealized_pnl` from a new mark price, without mutating `mark_price` itself
    /// (callers decide whether to commit the refreshed mark alongside).
    pub fn unrealized_pnl_at(&self, mark_price: Decimal) -> Decimal {
        let diff = match self.side {
            Side::Long => mark_price - self.entry_price,
            Side::Short => self.entry_price - mark_price,
        };
        diff * self.size_qty
    }
}
