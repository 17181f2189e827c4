use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three sizing models a Play's `sizing.model` may declare (§4.6). Pure and deterministic:
/// the same `(model, equity, stop_distance_pct)` always yields the same raw notional, before
/// [`crate::check::RiskManager`] applies caps.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SizingModel {
    /// A fixed USDT notional regardless of account equity.
    FixedUsdt { amount: Decimal },
    /// A fraction of current equity, eg/ `0.1` for 10% of equity notional.
    PercentEquity { pct: Decimal },
    /// Risk a fraction of equity over a given stop distance: `equity * risk_pct / stop_pct`.
    /// `stop_pct` is the fractional distance from entry to stop (eg/ `0.02` for 2%).
    PercentRisk { risk_pct: Decimal, stop_pct: Decimal },
}

impl SizingModel {
    /// Raw notional before any risk cap is applied (§4.6). Returns `Decimal::ZERO` for a
    /// `PercentRisk` model whose `stop_pct` is zero or negative, rather than dividing by zero.
    pub fn raw_notional(&self, equity_usdt: Decimal) -> Decimal {
        match self {
            SizingModel::FixedUsdt { amount } => *amount,
            SizingModel::PercentEquity { pct } => equity_usdt * *pct,
            SizingModel::PercentRisk { risk_pct, stop_pct } => {
                if *stop_pct <= Decimal::ZERO {
                    Decimal::ZERO
                } else {
                    (equity_usdt * *risk_pct) / *stop_pct
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_usdt_ignores_equity() {
        let model = SizingModel::FixedUsdt { amount: dec!(250) };
        assert_eq!(model.raw_notional(dec!(10_000)), dec!(250));
    }

    #[test]
    fn test_percent_equity() {
        let model = SizingModel::PercentEquity { pct: dec!(0.1) };
        assert_eq!(model.raw_notional(dec!(10_000)), dec!(1000));
    }

    #[test]
    fn test_percent_risk() {
        let model = SizingModel::PercentRisk { risk_pct: dec!(0.01), stop_pct: dec!(0.02) };
        assert_eq!(model.raw_notional(dec!(10_000)), dec!(5000));
    }

    #[test]
    fn test_percent_risk_zero_stop_distance_is_zero_not_panic() {
        let model = SizingModel::PercentRisk { risk_pct: dec!(0.01), stop_pct: dec!(0) };
        assert_eq!(model.raw_notional(dec!(10_000)), Decimal::ZERO);
    }
}
