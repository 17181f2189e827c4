//! The concrete [`SnapshotView`] adapter over a live [`DataProvider`] (§4.4, §4.5). Lives here
//! rather than in `playcore-strategy`/`playcore-data` because it is the one crate that already
//! depends on both without creating a cycle (see `DESIGN.md`).

use playcore_data::DataProvider;
use playcore_instrument::{InputSource, TfRole};
use playcore_strategy::SnapshotView;
use rust_decimal::prelude::ToPrimitive;

pub struct ProviderView<'a>(pub &'a DataProvider);

impl SnapshotView for ProviderView<'_> {
    fn candle(&self, role: TfRole, source: InputSource, index: i64) -> f64 {
        self.0
            .get_candle(role, index)
            .map(|bar| bar.resolve(source).to_f64().unwrap_or(f64::NAN))
            .unwrap_or(f64::NAN)
    }

    fn indicator(&self, role: TfRole, spec_id: &str, index: i64) -> f64 {
        self.0.get_indicator(role, spec_id, index)
    }

    fn structure(&self, role: TfRole, struct_id: &str, field: &str, index: i64) -> f64 {
        self.0
            .get_structure(role, struct_id, field, index)
            .map(|value| value.as_f64())
            .unwrap_or(f64::NAN)
    }
}
