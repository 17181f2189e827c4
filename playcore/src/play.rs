//! A Play (§2 GLOSSARY, §3 Data Model): the declarative strategy description every execution
//! mode drives through identical code paths (C8). Deserializable from YAML so the core can be
//! exercised directly in tests without the (out-of-scope) Play loader.

use crate::error::PlayValidationError;
use playcore_instrument::{Symbol, TfRole, Timeframe};
use playcore_risk::{RiskLimits, SizingModel};
use playcore_strategy::PlayRules;
use playcore_ta::{FeatureSpec, StructureSpec};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fully-specified Play (§3): feature/structure bindings per `TfRole`, the `tf -> role` map,
/// the executable role, the entry/exit rule trees, and the sizing/risk configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Play {
    pub id: String,
    pub symbol: Symbol,
    /// Concrete timeframe -> abstract role, eg/ `{"5m": low_tf, "1h": high_tf}` (§3 TF role).
    pub tf_roles: HashMap<Timeframe, TfRole>,
    pub exec_role: TfRole,
    /// Minimum closed bars per role before the provider reports `is_ready` (§4.4).
    pub warmup_target: usize,
    #[serde(default)]
    pub features_by_role: HashMap<TfRole, Vec<FeatureSpec>>,
    #[serde(default)]
    pub structures_by_role: HashMap<TfRole, Vec<StructureSpec>>,
    pub rules: PlayRules,
    pub sizing: SizingModel,
    pub risk_limits: RiskLimits,
    pub starting_equity_usdt: Decimal,
    #[serde(default = "default_persist_state")]
    pub persist_state: bool,
    #[serde(default = "default_state_save_interval")]
    pub state_save_interval: u64,
}

fn default_persist_state() -> bool {
    true
}

fn default_state_save_interval() -> u64 {
    20
}

impl Play {
    /// Load-time validation (§7 Validation: "Play schema, unknown indicator/structure, cyclic
    /// depends_on — refuse to load"). Structure-DAG validation itself happens when the
    /// `DataProvider` is constructed from this Play (it owns the `StructureCache`); this method
    /// covers the checks that belong to the Play shape itself rather than to one role's cache.
    pub fn validate(&self) -> Result<(), PlayValidationError> {
        if !self.tf_roles.values().any(|role| *role == self.exec_role) {
            return Err(PlayValidationError::MissingTfRoleMapping(self.exec_role));
        }
        if self.rules.entry_long.is_none() && self.rules.entry_short.is_none() {
            return Err(PlayValidationError::NoEntryRules);
        }
        self.risk_limits.validated().map_err(PlayValidationError::RiskConfig)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playcore_strategy::RuleNode;
    use rust_decimal_macros::dec;

    fn base_limits() -> RiskLimits {
        RiskLimits {
            max_leverage: dec!(5),
            max_position_pct: dec!(0.5),
            per_trade_pct: dec!(0.1),
            max_exposure_pct: dec!(0.8),
            min_trade_notional_usdt: dec!(10),
            min_balance_usdt: dec!(50),
        }
    }

    fn sample_play() -> Play {
        Play {
            id: "ema_cross".into(),
            symbol: Symbol::from("BTCUSDT"),
            tf_roles: HashMap::from([(Timeframe::M5, TfRole::LowTf)]),
            exec_role: TfRole::LowTf,
            warmup_target: 50,
            features_by_role: HashMap::new(),
            structures_by_role: HashMap::new(),
            rules: PlayRules::new(None, None, None),
            sizing: SizingModel::FixedUsdt { amount: dec!(100) },
            risk_limits: base_limits(),
            starting_equity_usdt: dec!(10_000),
            persist_state: true,
            state_save_interval: 20,
        }
    }

    #[test]
    fn test_missing_exec_role_mapping_fails() {
        let mut play = sample_play();
        play.exec_role = TfRole::HighTf;
        play.rules.entry_long = Some(RuleNode::All(vec![]));
        assert!(matches!(play.validate(), Err(PlayValidationError::MissingTfRoleMapping(_))));
    }

    #[test]
    fn test_no_entry_rules_fails() {
        let play = sample_play();
        assert!(matches!(play.validate(), Err(PlayValidationError::NoEntryRules)));
    }

    #[test]
    fn test_valid_play_passes() {
        let mut play = sample_play();
        play.rules.entry_long = Some(RuleNode::All(vec![]));
        assert!(play.validate().is_ok());
    }
}
