use crate::exchange::ExchangeId;
use crate::symbol::Symbol;
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Venue-reported trading rules for a [`Symbol`] (§6 External interfaces — instrument info).
///
/// Consumed by C6 (risk & sizing, to round/clamp order quantity and enforce the notional floor)
/// and C7 (order executor, to validate a request before submission).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct InstrumentSpec {
    pub tick_size: Decimal,
    pub min_qty: Decimal,
    pub min_notional: Decimal,
}

impl InstrumentSpec {
    /// Round `price` down to the nearest `tick_size`.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        if self.tick_size.is_zero() {
            return price;
        }
        (price / self.tick_size).floor() * self.tick_size
    }

    /// Round `qty` down to the nearest `min_qty` increment.
    pub fn round_qty(&self, qty: Decimal) -> Decimal {
        if self.min_qty.is_zero() {
            return qty;
        }
        (qty / self.min_qty).floor() * self.min_qty
    }
}

/// Identifies a tradeable perpetual contract within one [`Env`](crate::Env) for one
/// [`ExchangeId`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Instrument {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub spec: InstrumentSpec,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_price_and_qty() {
        let spec = InstrumentSpec::new(dec!(0.5), dec!(0.001), dec!(5));
        assert_eq!(spec.round_price(dec!(100.73)), dec!(100.5));
        assert_eq!(spec.round_qty(dec!(0.0019)), dec!(0.001));
    }
}
