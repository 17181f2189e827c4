use playcore_instrument::{InputSource, TfRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which kind of engine a [`FeatureSpec`] is evaluated by — the incremental indicator cache
/// (C2) or the structure-state DAG (C3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Indicator,
    Structure,
}

/// The family of incremental indicator to compute. `Unknown` is never produced by a valid Play
/// compile — it exists so `IndicatorCache` can represent "an indicator_type string the loader
/// didn't recognise" without erroring (§4.2 Failure semantics).
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
    Sma,
    Ema,
    Rsi,
    #[serde(untagged)]
    Unknown(String),
}

/// A declarative feature binding (§3 Data Model). `id` is unique within a Play and is the key
/// the rule evaluator (C5) uses to reference a value — never a free-form string lookup at
/// evaluation time, only at Play-compile time (§9 design note).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeatureSpec {
    pub id: String,
    pub kind: FeatureKind,
    #[serde(default)]
    pub indicator_type: Option<IndicatorType>,
    #[serde(default)]
    pub structure_type: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, f64>,
    pub input_source: InputSource,
    pub tf_role: TfRole,
}

impl FeatureSpec {
    pub fn period(&self) -> usize {
        self.params.get("period").copied().unwrap_or(14.0).round() as usize
    }
}
