//! Incremental structure-state detectors (C3): swing, trend, rolling_window, fibonacci and
//! derived_zone, wired together via a dependency DAG validated at load time (§4.3).

use playcore_instrument::InputSource;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// A structure output field is either numeric or drawn from a closed enum alphabet (§4.3
/// invariant iii) — never a free-form string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Num(f64),
    Enum(&'static str),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Num(n) => *n,
            FieldValue::Enum(_) => f64::NAN,
        }
    }

    pub fn as_enum(&self) -> Option<&'static str> {
        match self {
            FieldValue::Enum(s) => Some(s),
            FieldValue::Num(_) => None,
        }
    }
}

pub type StructureFrame = HashMap<String, FieldValue>;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum StructureGraphError {
    #[error("cycle detected among structure ids: {0:?}")]
    Cycle(Vec<String>),
    #[error("structure {0} depends on unknown id {1}")]
    UnknownDependency(String, String),
    #[error("duplicate structure id: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    Swing,
    Trend,
    RollingWindow,
    Fibonacci,
    DerivedZone,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    Min,
    Max,
}

/// A declarative structure binding (§3 Data Model / §4.3).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StructureSpec {
    pub id: String,
    pub structure_type: StructureType,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub params: HashMap<String, f64>,
    #[serde(default)]
    pub source: Option<InputSource>,
    #[serde(default)]
    pub window_mode: Option<WindowMode>,
}

impl StructureSpec {
    fn param(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).copied().unwrap_or(default)
    }
}

/// Point-in-time read access for a detector: the current bar's resolved source values and the
/// latest frames of its declared dependencies, already computed this bar (§4.3 invariant i/ii).
///
/// `deps` is ordered to match the spec's own `depends_on` list, not hash order — detectors that
/// distinguish "first dependency" from "second dependency" (eg/ `fibonacci`'s high/low anchors)
/// rely on that position being stable across runs (§8 Determinism).
pub struct BarContext<'a> {
    pub index: usize,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub deps: &'a [(String, StructureFrame)],
}

impl<'a> BarContext<'a> {
    fn dep_at(&self, position: usize) -> Option<&StructureFrame> {
        self.deps.get(position).map(|(_, f)| f)
    }
}

pub trait StructureDetector: std::fmt::Debug {
    /// The fixed output field set this detector always emits (§4.3 invariant iii).
    fn fields(&self) -> &'static [&'static str];

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> StructureFrame;
}

/// Confirmed-pivot swing detector. A candidate at `index - right` is confirmed once `right`
/// further bars have closed, so every emitted value only reflects bars `<= index` (§4.3 ii).
#[derive(Debug)]
pub struct SwingDetector {
    left: usize,
    right: usize,
    window: VecDeque<(usize, f64, f64)>,
    high_level: f64,
    high_idx: i64,
    low_level: f64,
    low_idx: i64,
    version: u64,
}

impl SwingDetector {
    pub fn new(spec: &StructureSpec) -> Self {
        let left = spec.param("left", 2.0).max(1.0) as usize;
        let right = spec.param("right", 2.0).max(1.0) as usize;
        Self {
            left,
            right,
            window: VecDeque::with_capacity(left + right + 1),
            high_level: f64::NAN,
            high_idx: -1,
            low_level: f64::NAN,
            low_idx: -1,
            version: 0,
        }
    }
}

impl StructureDetector for SwingDetector {
    fn fields(&self) -> &'static [&'static str] {
        &["high_level", "high_idx", "low_level", "low_idx", "version"]
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> StructureFrame {
        self.window.push_back((ctx.index, ctx.high, ctx.low));
        let capacity = self.left + self.right + 1;
        if self.window.len() > capacity {
            self.window.pop_front();
        }
        if self.window.len() == capacity {
            let candidate_pos = self.left;
            let (candidate_idx, candidate_high, candidate_low) = self.window[candidate_pos];
            let is_pivot_high = self
                .window
                .iter()
                .enumerate()
                .all(|(i, (_, h, _))| i == candidate_pos || *h <= candidate_high);
            let is_pivot_low = self
                .window
                .iter()
                .enumerate()
                .all(|(i, (_, _, l))| i == candidate_pos || *l >= candidate_low);
            if is_pivot_high {
                self.high_level = candidate_high;
                self.high_idx = candidate_idx as i64;
                self.version += 1;
            }
            if is_pivot_low {
                self.low_level = candidate_low;
                self.low_idx = candidate_idx as i64;
                self.version += 1;
            }
        }

        StructureFrame::from([
            ("high_level".to_string(), FieldValue::Num(self.high_level)),
            ("high_idx".to_string(), FieldValue::Num(self.high_idx as f64)),
            ("low_level".to_string(), FieldValue::Num(self.low_level)),
            ("low_idx".to_string(), FieldValue::Num(self.low_idx as f64)),
            ("version".to_string(), FieldValue::Num(self.version as f64)),
        ])
    }
}

/// Trend direction/strength derived from the higher-highs/higher-lows sequence of a dependent
/// `swing` structure. Requires exactly one dependency.
#[derive(Debug)]
pub struct TrendDetector {
    prev_high: f64,
    prev_low: f64,
    direction: i8,
    bars_in_trend: u64,
}

impl TrendDetector {
    pub fn new(_spec: &StructureSpec) -> Self {
        Self {
            prev_high: f64::NAN,
            prev_low: f64::NAN,
            direction: 0,
            bars_in_trend: 0,
        }
    }
}

impl StructureDetector for TrendDetector {
    fn fields(&self) -> &'static [&'static str] {
        &["direction", "strength", "bars_in_trend"]
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> StructureFrame {
        let swing = ctx.dep_at(0);
        let (high, low) = match swing {
            Some(frame) => (
                frame.get("high_level").map(FieldValue::as_f64).unwrap_or(f64::NAN),
                frame.get("low_level").map(FieldValue::as_f64).unwrap_or(f64::NAN),
            ),
            None => (f64::NAN, f64::NAN),
        };

        if !high.is_nan() && !low.is_nan() && !self.prev_high.is_nan() && !self.prev_low.is_nan() {
            let new_direction = if high > self.prev_high && low > self.prev_low {
                1
            } else if high < self.prev_high && low < self.prev_low {
                -1
            } else {
                self.direction
            };
            if new_direction != self.direction {
                self.bars_in_trend = 0;
            }
            self.direction = new_direction;
        }
        self.bars_in_trend += 1;
        if !high.is_nan() {
            self.prev_high = high;
        }
        if !low.is_nan() {
            self.prev_low = low;
        }

        let strength = if high.is_nan() || low.is_nan() || (high + low) == 0.0 {
            0.0
        } else {
            ((high - low) / ((high + low) / 2.0)).abs()
        };

        StructureFrame::from([
            ("direction".to_string(), FieldValue::Num(self.direction as f64)),
            ("strength".to_string(), FieldValue::Num(strength)),
            ("bars_in_trend".to_string(), FieldValue::Num(self.bars_in_trend as f64)),
        ])
    }
}

/// Rolling min/max of `ctx`'s resolved source over the last `size` bars.
#[derive(Debug)]
pub struct RollingWindowDetector {
    size: usize,
    mode: WindowMode,
    source: InputSource,
    window: VecDeque<f64>,
}

impl RollingWindowDetector {
    pub fn new(spec: &StructureSpec) -> Self {
        Self {
            size: spec.param("size", 20.0).max(1.0) as usize,
            mode: spec.window_mode.unwrap_or(WindowMode::Max),
            source: spec.source.unwrap_or(InputSource::Close),
            window: VecDeque::new(),
        }
    }

    fn resolve(&self, ctx: &BarContext<'_>) -> f64 {
        match self.source {
            InputSource::Open => ctx.open,
            InputSource::High => ctx.high,
            InputSource::Low => ctx.low,
            InputSource::Close => ctx.close,
            InputSource::Volume => f64::NAN,
            InputSource::Hlc3 => (ctx.high + ctx.low + ctx.close) / 3.0,
            InputSource::Ohlc4 => (ctx.open + ctx.high + ctx.low + ctx.close) / 4.0,
        }
    }
}

impl StructureDetector for RollingWindowDetector {
    fn fields(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> StructureFrame {
        let value = self.resolve(ctx);
        self.window.push_back(value);
        if self.window.len() > self.size {
            self.window.pop_front();
        }
        let result = if self.window.len() < self.size {
            f64::NAN
        } else {
            match self.mode {
                WindowMode::Min => self.window.iter().cloned().fold(f64::INFINITY, f64::min),
                WindowMode::Max => self.window.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            }
        };
        StructureFrame::from([("value".to_string(), FieldValue::Num(result))])
    }
}

/// Fibonacci retracement levels anchored on a dependent swing (preferred) or a pair of
/// rolling_window high/low dependencies.
#[derive(Debug)]
pub struct FibonacciDetector {
    levels: Vec<(String, f64)>,
}

impl FibonacciDetector {
    pub fn new(spec: &StructureSpec) -> Self {
        let mut levels: Vec<(String, f64)> = spec
            .params
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("level_").map(|suffix| (format!("level_{suffix}"), *v)))
            .collect();
        levels.sort_by(|a, b| a.0.cmp(&b.0));
        if levels.is_empty() {
            levels = vec![
                ("level_236".to_string(), 0.236),
                ("level_382".to_string(), 0.382),
                ("level_500".to_string(), 0.5),
                ("level_618".to_string(), 0.618),
                ("level_786".to_string(), 0.786),
            ];
        }
        Self { levels }
    }

    /// First declared dependency is the high anchor, second is the low anchor (a single
    /// `swing` dependency instead supplies both from its own `high_level`/`low_level` fields).
    fn anchors(&self, ctx: &BarContext<'_>) -> (f64, f64) {
        if ctx.deps.len() == 1 {
            let frame = ctx.dep_at(0).expect("len checked above");
            (
                frame.get("high_level").map(FieldValue::as_f64).unwrap_or(f64::NAN),
                frame.get("low_level").map(FieldValue::as_f64).unwrap_or(f64::NAN),
            )
        } else if ctx.deps.len() >= 2 {
            (
                ctx.dep_at(0).and_then(|f| f.get("value")).map(FieldValue::as_f64).unwrap_or(f64::NAN),
                ctx.dep_at(1).and_then(|f| f.get("value")).map(FieldValue::as_f64).unwrap_or(f64::NAN),
            )
        } else {
            (f64::NAN, f64::NAN)
        }
    }
}

impl StructureDetector for FibonacciDetector {
    fn fields(&self) -> &'static [&'static str] {
        &["anchor_high", "anchor_low", "range"]
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> StructureFrame {
        let (high, low) = self.anchors(ctx);
        let range = high - low;
        let mut frame = StructureFrame::from([
            ("anchor_high".to_string(), FieldValue::Num(high)),
            ("anchor_low".to_string(), FieldValue::Num(low)),
            ("range".to_string(), FieldValue::Num(range)),
        ]);
        for (name, ratio) in &self.levels {
            frame.insert(name.clone(), FieldValue::Num(high - range * ratio));
        }
        frame
    }
}

/// The closed alphabet emitted on the `bos`/`choch` fields (§4.3 invariant iii).
#[derive(Debug, Clone, Copy, PartialEq, playcore_macro::FieldKey)]
enum BreakState {
    None,
    Bullish,
    Bearish,
}

/// Zones sliced between consecutive levels of a dependent `fibonacci` structure, each tracked
/// as inactive/active/touched, plus aggregate and simple break-of-structure flags.
#[derive(Debug)]
pub struct DerivedZoneDetector {
    touched: Vec<bool>,
    prev_close: Option<f64>,
    prev_direction: i8,
}

impl DerivedZoneDetector {
    pub fn new(_spec: &StructureSpec) -> Self {
        Self {
            touched: Vec::new(),
            prev_close: None,
            prev_direction: 0,
        }
    }
}

impl StructureDetector for DerivedZoneDetector {
    fn fields(&self) -> &'static [&'static str] {
        &[
            "active_count",
            "any_active",
            "any_touched",
            "any_inside",
            "closest_active_lower",
            "closest_active_upper",
            "bos",
            "choch",
        ]
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> StructureFrame {
        let Some(fib) = ctx.dep_at(0) else {
            return StructureFrame::from([
                ("active_count".to_string(), FieldValue::Num(0.0)),
                ("any_active".to_string(), FieldValue::Num(0.0)),
                ("any_touched".to_string(), FieldValue::Num(0.0)),
                ("any_inside".to_string(), FieldValue::Num(0.0)),
                ("closest_active_lower".to_string(), FieldValue::Num(f64::NAN)),
                ("closest_active_upper".to_string(), FieldValue::Num(f64::NAN)),
                ("bos".to_string(), FieldValue::Enum(BreakState::None.as_str())),
                ("choch".to_string(), FieldValue::Enum(BreakState::None.as_str())),
            ]);
        };

        let mut level_values: Vec<f64> = fib
            .iter()
            .filter(|(k, _)| k.starts_with("level_"))
            .map(|(_, v)| v.as_f64())
            .filter(|v| !v.is_nan())
            .collect();
        level_values.sort_by(|a, b| a.partial_cmp(b).unwrap());

        if self.touched.len() != level_values.len().saturating_sub(1) {
            self.touched = vec![false; level_values.len().saturating_sub(1)];
        }

        let close = ctx.close;
        let mut active_count = 0usize;
        let mut closest_active_lower = f64::NAN;
        let mut closest_active_upper = f64::NAN;
        let mut best_distance = f64::INFINITY;

        for (i, pair) in level_values.windows(2).enumerate() {
            let (lower, upper) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
            let inside = close >= lower && close <= upper;
            if inside {
                active_count += 1;
                self.touched[i] = true;
                let mid = (lower + upper) / 2.0;
                let distance = (close - mid).abs();
                if distance < best_distance {
                    best_distance = distance;
                    closest_active_lower = lower;
                    closest_active_upper = upper;
                }
            }
        }

        let any_active = active_count > 0;
        let any_touched = self.touched.iter().any(|t| *t);
        let any_inside = any_active;

        let anchor_high = fib.get("anchor_high").map(FieldValue::as_f64).unwrap_or(f64::NAN);
        let anchor_low = fib.get("anchor_low").map(FieldValue::as_f64).unwrap_or(f64::NAN);
        let bos = if !anchor_high.is_nan() && close > anchor_high {
            BreakState::Bullish
        } else if !anchor_low.is_nan() && close < anchor_low {
            BreakState::Bearish
        } else {
            BreakState::None
        };

        let direction = if let Some(prev) = self.prev_close {
            if close > prev {
                1
            } else if close < prev {
                -1
            } else {
                self.prev_direction
            }
        } else {
            0
        };
        let choch = if direction != 0 && self.prev_direction != 0 && direction != self.prev_direction {
            if direction > 0 {
                BreakState::Bullish
            } else {
                BreakState::Bearish
            }
        } else {
            BreakState::None
        };
        self.prev_direction = direction;
        self.prev_close = Some(close);

        StructureFrame::from([
            ("active_count".to_string(), FieldValue::Num(active_count as f64)),
            ("any_active".to_string(), FieldValue::Num(any_active as u8 as f64)),
            ("any_touched".to_string(), FieldValue::Num(any_touched as u8 as f64)),
            ("any_inside".to_string(), FieldValue::Num(any_inside as u8 as f64)),
            ("closest_active_lower".to_string(), FieldValue::Num(closest_active_lower)),
            ("closest_active_upper".to_string(), FieldValue::Num(closest_active_upper)),
            ("bos".to_string(), FieldValue::Enum(bos.as_str())),
            ("choch".to_string(), FieldValue::Enum(choch.as_str())),
        ])
    }
}

fn build_detector(spec: &StructureSpec) -> Box<dyn StructureDetector + Send> {
    match spec.structure_type {
        StructureType::Swing => Box::new(SwingDetector::new(spec)),
        StructureType::Trend => Box::new(TrendDetector::new(spec)),
        StructureType::RollingWindow => Box::new(RollingWindowDetector::new(spec)),
        StructureType::Fibonacci => Box::new(FibonacciDetector::new(spec)),
        StructureType::DerivedZone => Box::new(DerivedZoneDetector::new(spec)),
    }
}

/// Topologically sorts `specs` by `depends_on`, failing Play compilation on a cycle or an
/// unknown dependency id (§4.3 invariant i).
pub fn topological_order(specs: &[StructureSpec]) -> Result<Vec<usize>, StructureGraphError> {
    let mut seen_ids = HashSet::new();
    let index_of: HashMap<&str, usize> = specs
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if !seen_ids.insert(s.id.as_str()) {
                return Err(StructureGraphError::DuplicateId(s.id.clone()));
            }
            Ok((s.id.as_str(), i))
        })
        .collect::<Result<_, _>>()?;

    for spec in specs {
        for dep in &spec.depends_on {
            if !index_of.contains_key(dep.as_str()) {
                return Err(StructureGraphError::UnknownDependency(spec.id.clone(), dep.clone()));
            }
        }
    }

    let mut in_degree = vec![0usize; specs.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    for (i, spec) in specs.iter().enumerate() {
        for dep in &spec.depends_on {
            let dep_idx = index_of[dep.as_str()];
            dependents[dep_idx].push(i);
            in_degree[i] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..specs.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(specs.len());
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() != specs.len() {
        let remaining: Vec<String> = (0..specs.len())
            .filter(|i| !order.contains(i))
            .map(|i| specs[i].id.clone())
            .collect();
        return Err(StructureGraphError::Cycle(remaining));
    }
    Ok(order)
}

/// Per-timeframe structure-state cache (C3): builds detectors for each spec in dependency
/// order and feeds every closed bar through them, retaining full history for point-in-time
/// reads (§4.3 invariant ii).
#[derive(Debug)]
pub struct StructureCache {
    specs: Vec<StructureSpec>,
    order: Vec<usize>,
    detectors: Vec<Box<dyn StructureDetector + Send>>,
    history: HashMap<String, Vec<StructureFrame>>,
}

impl StructureCache {
    pub fn new(specs: Vec<StructureSpec>) -> Result<Self, StructureGraphError> {
        let order = topological_order(&specs)?;
        let detectors = specs.iter().map(build_detector).collect();
        let history = specs.iter().map(|s| (s.id.clone(), Vec::new())).collect();
        Ok(Self {
            specs,
            order,
            detectors,
            history,
        })
    }

    pub fn on_bar_closed(&mut self, index: usize, open: f64, high: f64, low: f64, close: f64) {
        let mut latest: HashMap<String, StructureFrame> = HashMap::new();
        for &i in &self.order {
            let spec = &self.specs[i];
            let deps: Vec<(String, StructureFrame)> = spec
                .depends_on
                .iter()
                .filter_map(|d| latest.get(d).map(|f| (d.clone(), f.clone())))
                .collect();
            let ctx = BarContext {
                index,
                open,
                high,
                low,
                close,
                deps: &deps,
            };
            let frame = self.detectors[i].on_bar(&ctx);
            self.history.get_mut(&spec.id).unwrap().push(frame.clone());
            latest.insert(spec.id.clone(), frame);
        }
    }

    pub fn get(&self, struct_id: &str, field: &str, index: i64) -> Option<FieldValue> {
        let frames = self.history.get(struct_id)?;
        let len = frames.len();
        if len == 0 {
            return None;
        }
        let idx = if index < 0 { len as i64 + index } else { index };
        if idx < 0 || idx as usize >= len {
            return None;
        }
        frames[idx as usize].get(field).copied()
    }

    pub fn latest(&self, struct_id: &str, field: &str) -> Option<FieldValue> {
        self.get(struct_id, field, -1)
    }

    pub fn len(&self, struct_id: &str) -> usize {
        self.history.get(struct_id).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, ty: StructureType, depends_on: &[&str]) -> StructureSpec {
        StructureSpec {
            id: id.to_string(),
            structure_type: ty,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            params: HashMap::new(),
            source: None,
            window_mode: None,
        }
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let specs = vec![
            spec("trend_1", StructureType::Trend, &["swing_1"]),
            spec("swing_1", StructureType::Swing, &[]),
        ];
        let order = topological_order(&specs).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let specs = vec![
            spec("a", StructureType::Trend, &["b"]),
            spec("b", StructureType::Trend, &["a"]),
        ];
        let err = topological_order(&specs).unwrap_err();
        assert!(matches!(err, StructureGraphError::Cycle(_)));
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let specs = vec![spec("a", StructureType::Trend, &["ghost"])];
        let err = topological_order(&specs).unwrap_err();
        assert!(matches!(err, StructureGraphError::UnknownDependency(_, _)));
    }

    #[test]
    fn test_swing_detector_confirms_pivot_with_lag() {
        let s = spec("swing_1", StructureType::Swing, &[]);
        let mut cache = StructureCache::new(vec![s]).unwrap();
        let highs = [1.0, 2.0, 5.0, 2.0, 1.0, 1.0, 1.0];
        for (i, h) in highs.iter().enumerate() {
            cache.on_bar_closed(i, *h, *h, *h, *h);
        }
        let high_level = cache.latest("swing_1", "high_level").unwrap().as_f64();
        assert_eq!(high_level, 5.0);
        let version = cache.latest("swing_1", "version").unwrap().as_f64();
        assert!(version >= 1.0);
    }

    #[test]
    fn test_rolling_window_min_max() {
        let s = StructureSpec {
            window_mode: Some(WindowMode::Max),
            params: HashMap::from([("size".to_string(), 3.0)]),
            ..spec("rw", StructureType::RollingWindow, &[])
        };
        let mut cache = StructureCache::new(vec![s]).unwrap();
        for v in [1.0, 5.0, 2.0, 1.0, 1.0] {
            cache.on_bar_closed(0, v, v, v, v);
        }
        assert_eq!(cache.latest("rw", "value").unwrap().as_f64(), 1.0);
    }

    #[test]
    fn test_fibonacci_depends_on_swing() {
        let specs = vec![
            spec("swing_1", StructureType::Swing, &[]),
            spec("fib_1", StructureType::Fibonacci, &["swing_1"]),
        ];
        let mut cache = StructureCache::new(specs).unwrap();
        for (i, h) in [1.0, 2.0, 10.0, 2.0, 1.0, 1.0, 1.0].iter().enumerate() {
            cache.on_bar_closed(i, *h, *h, 0.0, *h);
        }
        let range = cache.latest("fib_1", "range").unwrap().as_f64();
        assert!(range.is_finite());
    }

    #[test]
    fn test_fibonacci_dual_dependency_anchors_follow_declared_order() {
        // depends_on = [high_rw, low_rw]: the first dependency is always the high anchor and
        // the second always the low anchor, regardless of HashMap iteration order.
        let high_rw = StructureSpec {
            source: Some(InputSource::High),
            params: HashMap::from([("size".to_string(), 1.0)]),
            window_mode: Some(WindowMode::Max),
            ..spec("high_rw", StructureType::RollingWindow, &[])
        };
        let low_rw = StructureSpec {
            source: Some(InputSource::Low),
            params: HashMap::from([("size".to_string(), 1.0)]),
            window_mode: Some(WindowMode::Min),
            ..spec("low_rw", StructureType::RollingWindow, &[])
        };
        let fib = spec("fib_1", StructureType::Fibonacci, &["high_rw", "low_rw"]);
        let mut cache = StructureCache::new(vec![high_rw, low_rw, fib]).unwrap();

        for _ in 0..3 {
            cache.on_bar_closed(0, 50.0, 100.0, 20.0, 60.0);
        }

        assert_eq!(cache.latest("fib_1", "anchor_high").unwrap().as_f64(), 100.0);
        assert_eq!(cache.latest("fib_1", "anchor_low").unwrap().as_f64(), 20.0);
    }

    #[test]
    fn test_point_in_time_history_is_retained() {
        let s = spec("swing_1", StructureType::Swing, &[]);
        let mut cache = StructureCache::new(vec![s]).unwrap();
        for i in 0..5 {
            cache.on_bar_closed(i, 1.0, 1.0, 1.0, 1.0);
        }
        assert_eq!(cache.len("swing_1"), 5);
        assert!(cache.get("swing_1", "version", 0).is_some());
    }
}
