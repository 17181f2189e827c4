use playcore_instrument::{InputSource, TfRole};

/// The pure, point-in-time read surface the rule evaluator (C5) is compiled against (§4.5).
///
/// A [`SnapshotView`] is never mutated by evaluation and never performs I/O — every getter
/// resolves a value already computed by C2/C3 for `index`, where `index` follows the same
/// negative-counts-from-the-end convention as [`playcore_ta::IndicatorCache::get`]. An index
/// with no value yet (not enough history, or a spec that never existed) resolves to `NaN`,
/// which the comparison operators below treat as "always false" rather than erroring.
pub trait SnapshotView {
    /// Resolve an OHLCV-derived value on `role`'s buffer at `index`.
    fn candle(&self, role: TfRole, source: InputSource, index: i64) -> f64;

    /// Resolve an indicator spec's value on `role`'s cache at `index`.
    fn indicator(&self, role: TfRole, spec_id: &str, index: i64) -> f64;

    /// Resolve a structure field on `role`'s cache at `index`. Enum-valued fields resolve to
    /// `NaN` here (they are compared as [`crate::node::RuleNode::Atom`] operands only through
    /// their numeric facets) — see `playcore_ta::FieldValue::as_f64`.
    fn structure(&self, role: TfRole, struct_id: &str, field: &str, index: i64) -> f64;
}
