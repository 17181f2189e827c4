use crate::feature::{FeatureSpec, IndicatorType};
use crate::incremental::{Ema, IncrementalIndicator, Rsi, Sma};
use playcore_instrument::{Bar, InputSource};
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors the incremental indicator cache can surface (§4.2 Failure semantics). Parity
/// violations are deliberately not representable here — they are a test-only failure, not a
/// runtime one.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CacheError {
    #[error("bar rejected: ts_close {ts_close} is not strictly after the last bar's ts_close {last}")]
    NonMonotonicBar { ts_close: String, last: String },
    #[error("no such feature spec: {0}")]
    UnknownSpec(String),
}

/// Per-spec parity audit result (§4.2 `audit_incremental_parity`, §8 parity invariant).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParityReport {
    pub max_diff: f64,
    pub num_mismatches: usize,
    pub pass: bool,
}

fn build_indicator(spec: &FeatureSpec) -> Option<Box<dyn IncrementalIndicator + Send>> {
    let period = spec.period().max(1);
    match spec.indicator_type.as_ref()? {
        IndicatorType::Sma => Some(Box::new(Sma::new(period))),
        IndicatorType::Ema => Some(Box::new(Ema::new(period))),
        IndicatorType::Rsi => Some(Box::new(Rsi::new(period))),
        IndicatorType::Unknown(_) => None,
    }
}

/// Resolve an [`InputSource`] against a whole bar history at once. Must stay numerically
/// identical to [`Bar::resolve`] (§4.2 Input-source resolution) — exercised by
/// `test_array_and_candle_resolvers_agree`.
pub fn resolve_array(bars: &[Bar], source: InputSource) -> Vec<f64> {
    bars.iter()
        .map(|bar| { use rust_decimal::prelude::ToPrimitive; bar.resolve(source).to_f64().unwrap_or(f64::NAN) })
        .collect()
}

/// Per-timeframe incremental indicator cache (C2).
///
/// Invariant: every spec's array length always equals `bars.len()`. Reseeding via
/// [`IndicatorCache::initialize_from_history`] is idempotent given identical `bars`/`specs`.
#[derive(Debug)]
pub struct IndicatorCache {
    bars: Vec<Bar>,
    specs: Vec<FeatureSpec>,
    arrays: HashMap<String, Vec<f64>>,
    incrementals: HashMap<String, Box<dyn IncrementalIndicator + Send>>,
    warned_unknown: HashSet<String>,
    pub rejected_bar_count: u64,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self {
            bars: Vec::new(),
            specs: Vec::new(),
            arrays: HashMap::new(),
            incrementals: HashMap::new(),
            warned_unknown: HashSet::new(),
            rejected_bar_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Vector-compute every spec from a warmup slice. Specs with an unknown `indicator_type`
    /// yield an all-`NaN` array and a one-time warning, never an error (§4.2).
    ///
    /// Each spec's fresh incremental indicator is then replayed over the same warmup slice so
    /// its internal state lines up with the vectorized array it was just seeded from — without
    /// this, the first `on_bar_closed` after a non-empty warmup would re-warm from scratch and
    /// diverge from the array (§4.2 "warmup then append").
    ///
    /// Calling this twice with identical `bars`/`specs` is idempotent — state is fully
    /// replaced, not appended to.
    pub fn initialize_from_history(&mut self, bars: Vec<Bar>, specs: Vec<FeatureSpec>) {
        self.arrays.clear();
        self.incrementals.clear();

        for spec in &specs {
            let source_values = resolve_array(&bars, spec.input_source);
            match build_indicator(spec) {
                Some(mut indicator) => {
                    let array = indicator.vectorized(&source_values);
                    for value in &source_values {
                        indicator.update(*value);
                    }
                    self.arrays.insert(spec.id.clone(), array);
                    self.incrementals.insert(spec.id.clone(), indicator);
                }
                None => {
                    if self.warned_unknown.insert(spec.id.clone()) {
                        tracing::warn!(feature_id = %spec.id, "unknown indicator_type, emitting NaN array");
                    }
                    self.arrays.insert(spec.id.clone(), vec![f64::NAN; bars.len()]);
                }
            }
        }

        self.bars = bars;
        self.specs = specs;
    }

    /// Append a closed bar, then incrementally update every spec (§4.2).
    ///
    /// Rejects a bar whose `ts_close` is not strictly after the previous bar's `ts_close`,
    /// counting it rather than panicking (§7 Data errors are counted, never fatal).
    pub fn on_bar_closed(&mut self, bar: Bar) -> Result<(), CacheError> {
        if let Some(last) = self.bars.last() {
            if bar.ts_close <= last.ts_close {
                self.rejected_bar_count += 1;
                return Err(CacheError::NonMonotonicBar {
                    ts_close: bar.ts_close.to_string(),
                    last: last.ts_close.to_string(),
                });
            }
        }

        for spec in &self.specs {
            let value = { use rust_decimal::prelude::ToPrimitive; bar.resolve(spec.input_source).to_f64().unwrap_or(f64::NAN) };
            let array = self.arrays.get_mut(&spec.id).expect("array exists for every registered spec");
            if let Some(indicator) = self.incrementals.get_mut(&spec.id) {
                array.push(indicator.update(value));
            } else {
                array.push(f64::NAN);
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    fn resolve_index(&self, len: usize, index: i64) -> Option<usize> {
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

    /// Value of `spec_id` at `index` (negative counts from the end). `NaN` before warmup
    /// completes, and for any out-of-range index.
    pub fn get(&self, spec_id: &str, index: i64) -> f64 {
        let Some(array) = self.arrays.get(spec_id) else {
            return f64::NAN;
        };
        match self.resolve_index(array.len(), index) {
            Some(i) => array[i],
            None => f64::NAN,
        }
    }

    pub fn get_latest(&self, spec_id: &str) -> f64 {
        self.get(spec_id, -1)
    }

    /// Recompute every spec vectorially from the stored OHLCV and compare against the
    /// incremental array (§4.2, §8 Parity invariant).
    pub fn audit_incremental_parity(&self) -> HashMap<String, ParityReport> {
        let mut reports = HashMap::new();
        for spec in &self.specs {
            let Some(indicator) = self.incrementals.get(&spec.id) else {
                continue;
            };
            let source_values = resolve_array(&self.bars, spec.input_source);
            let recomputed = indicator.vectorized(&source_values);
            let incremental = self.arrays.get(&spec.id).expect("array exists");

            let tolerance = if indicator.is_oscillator() { 1e-6 } else { 1e-9 };
            let mut max_diff = 0.0_f64;
            let mut mismatches = 0usize;
            for (a, b) in incremental.iter().zip(recomputed.iter()) {
                if a.is_nan() && b.is_nan() {
                    continue;
                }
                let diff = (a - b).abs();
                if diff > max_diff {
                    max_diff = diff;
                }
                if diff > tolerance {
                    mismatches += 1;
                }
            }

            reports.insert(
                spec.id.clone(),
                ParityReport {
                    max_diff,
                    num_mismatches: mismatches,
                    pass: mismatches == 0,
                },
            );
        }
        reports
    }
}

impl Default for IndicatorCache {
    fn default() -> Self {
        Self::new()
    }
}
