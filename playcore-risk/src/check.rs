use crate::global_risk::{GlobalRiskDenial, GlobalRiskView};
use crate::sizing::SizingModel;
use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// Platform-wide hard ceilings from §6's configuration surface — independent of whatever a Play
/// declares, these can only ever shrink a Play's limits, never widen them.
pub fn hard_max_leverage() -> Decimal {
    Decimal::from(10)
}

pub fn hard_max_position_usdt() -> Decimal {
    Decimal::from(1000)
}

pub fn hard_min_balance_usdt() -> Decimal {
    Decimal::from(5)
}

#[derive(Debug, Error)]
pub enum RiskConfigError {
    #[error("max_leverage {0} exceeds the platform hard cap of {1}")]
    LeverageExceedsHardCap(Decimal, Decimal),
    #[error("min_balance_usdt {0} is below the platform floor of {1}")]
    MinBalanceBelowFloor(Decimal, Decimal),
}

/// Play-declared risk limits (§4.6): leverage cap, position cap as a fraction of equity,
/// per-trade fraction, global exposure fraction, and the absolute floors below which a signal
/// is refused outright.
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub max_leverage: Decimal,
    pub max_position_pct: Decimal,
    pub per_trade_pct: Decimal,
    pub max_exposure_pct: Decimal,
    pub min_trade_notional_usdt: Decimal,
    pub min_balance_usdt: Decimal,
}

impl RiskLimits {
    /// Validates against the platform hard caps (§6) — a Play that declares a looser limit
    /// than the platform allows fails to load (§7 Configuration error: "fail fast at startup").
    pub fn validated(self) -> Result<Self, RiskConfigError> {
        if self.max_leverage > hard_max_leverage() {
            return Err(RiskConfigError::LeverageExceedsHardCap(self.max_leverage, hard_max_leverage()));
        }
        if self.min_balance_usdt < hard_min_balance_usdt() {
            return Err(RiskConfigError::MinBalanceBelowFloor(self.min_balance_usdt, hard_min_balance_usdt()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RiskDenial {
    #[error("insufficient_balance")]
    InsufficientBalance,
    #[error("blocked_by_risk")]
    BelowMinNotional,
    #[error("blocked_by_risk")]
    Global(GlobalRiskDenial),
}

impl RiskDenial {
    pub fn code(&self) -> &'static str {
        match self {
            RiskDenial::InsufficientBalance => "insufficient_balance",
            RiskDenial::BelowMinNotional => "blocked_by_risk",
            RiskDenial::Global(inner) => inner.code(),
        }
    }
}

/// C6: computes a sized notional from a [`SizingModel`] and caps it against [`RiskLimits`] and
/// the platform hard caps, consulting the optional [`GlobalRiskView`] first (§4.6). Stateless
/// apart from the shared `global_view`'s daily-loss tracker.
pub struct RiskManager {
    pub limits: RiskLimits,
    pub global_view: Option<Arc<GlobalRiskView>>,
}

impl RiskManager {
    pub fn new(limits: RiskLimits, global_view: Option<Arc<GlobalRiskView>>) -> Result<Self, RiskConfigError> {
        Ok(Self { limits: limits.validated()?, global_view })
    }

    /// Size a new entry. `current_exposure_usdt` is the symbol/account's existing notional
    /// exposure before this signal. Returns the final, capped notional or the reason it was
    /// denied entirely (§4.6, §7).
    pub fn check_entry(
        &self,
        model: &SizingModel,
        equity_usdt: Decimal,
        balance_usdt: Decimal,
        current_exposure_usdt: Decimal,
        now_utc: DateTime<Utc>,
        now_local: DateTime<Local>,
    ) -> Result<Decimal, RiskDenial> {
        if let Some(view) = &self.global_view {
            view.evaluate(now_utc, now_local, false).map_err(RiskDenial::Global)?;
        }
        if balance_usdt < self.limits.min_balance_usdt {
            return Err(RiskDenial::InsufficientBalance);
        }

        let mut size = model.raw_notional(equity_usdt);
        size = size.min(equity_usdt * self.limits.max_leverage);
        size = size.min(equity_usdt * self.limits.max_position_pct);
        size = size.min(equity_usdt * self.limits.per_trade_pct);
        size = size.min(hard_max_position_usdt());
        let exposure_headroom = (equity_usdt * self.limits.max_exposure_pct - current_exposure_usdt).max(Decimal::ZERO);
        size = size.min(exposure_headroom);

        if size < self.limits.min_trade_notional_usdt {
            return Err(RiskDenial::BelowMinNotional);
        }
        Ok(size)
    }

    /// Position-closing signals are always allowed (§4.6, §8 invariant) — only the global view's
    /// WS-health gate is a pure pass-through here since closes skip sizing entirely.
    pub fn check_close(&self, now_utc: DateTime<Utc>, now_local: DateTime<Local>) -> Result<(), RiskDenial> {
        if let Some(view) = &self.global_view {
            view.evaluate(now_utc, now_local, true).map_err(RiskDenial::Global)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_leverage: dec!(5),
            max_position_pct: dec!(0.5),
            per_trade_pct: dec!(0.1),
            max_exposure_pct: dec!(0.8),
            min_trade_notional_usdt: dec!(10),
            min_balance_usdt: dec!(50),
        }
    }

    #[test]
    fn test_config_rejects_leverage_above_hard_cap() {
        let mut bad = limits();
        bad.max_leverage = dec!(20);
        assert!(bad.validated().is_err());
    }

    #[test]
    fn test_config_rejects_balance_floor_below_platform_floor() {
        let mut bad = limits();
        bad.min_balance_usdt = dec!(1);
        assert!(bad.validated().is_err());
    }

    #[test]
    fn test_per_trade_pct_caps_size() {
        let manager = RiskManager::new(limits(), None).unwrap();
        let size = manager
            .check_entry(
                &SizingModel::PercentEquity { pct: dec!(1.0) },
                dec!(10_000),
                dec!(10_000),
                Decimal::ZERO,
                Utc::now(),
                Local::now(),
            )
            .unwrap();
        // per_trade_pct (0.1) is the tightest cap here: 10_000 * 0.1 = 1000
        assert_eq!(size, dec!(1000));
    }

    #[test]
    fn test_insufficient_balance_denies() {
        let manager = RiskManager::new(limits(), None).unwrap();
        let err = manager
            .check_entry(
                &SizingModel::FixedUsdt { amount: dec!(100) },
                dec!(10_000),
                dec!(10),
                Decimal::ZERO,
                Utc::now(),
                Local::now(),
            )
            .unwrap_err();
        assert_eq!(err, RiskDenial::InsufficientBalance);
        assert_eq!(err.code(), "insufficient_balance");
    }

    #[test]
    fn test_below_min_notional_denies() {
        let manager = RiskManager::new(limits(), None).unwrap();
        let err = manager
            .check_entry(
                &SizingModel::FixedUsdt { amount: dec!(1) },
                dec!(10_000),
                dec!(10_000),
                Decimal::ZERO,
                Utc::now(),
                Local::now(),
            )
            .unwrap_err();
        assert_eq!(err, RiskDenial::BelowMinNotional);
    }

    #[test]
    fn test_exposure_cap_denies_when_no_headroom() {
        let manager = RiskManager::new(limits(), None).unwrap();
        let err = manager
            .check_entry(
                &SizingModel::FixedUsdt { amount: dec!(500) },
                dec!(10_000),
                dec!(10_000),
                dec!(8_000),
                Utc::now(),
                Local::now(),
            )
            .unwrap_err();
        assert_eq!(err, RiskDenial::BelowMinNotional);
    }
}
