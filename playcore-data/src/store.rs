//! Historical OHLCV store (§6 External interfaces): keyed by `env`, idempotent upserts,
//! process-local write locks, readers that never block a writer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playcore_instrument::{Bar, Env, Symbol, Timeframe};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error reading historical store: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
struct Key {
    symbol_rank: u64,
}

/// Keyed by `(env, symbol, tf)`; candles within a series are ordered by `ts_open` and upserts
/// are idempotent on that key (§6).
#[async_trait]
pub trait HistoricalStore: Send + Sync {
    async fn get_ohlcv(
        &self,
        symbol: &Symbol,
        tf: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        env: Env,
    ) -> Result<Vec<Bar>, StoreError>;

    async fn get_latest_ohlcv(
        &self,
        symbol: &Symbol,
        tf: Timeframe,
        limit: usize,
        env: Env,
    ) -> Result<Vec<Bar>, StoreError>;

    async fn upsert_candle(
        &self,
        symbol: &Symbol,
        tf: Timeframe,
        env: Env,
        bar: Bar,
    ) -> Result<(), StoreError>;

    async fn get_symbol_timeframe_ranges(
        &self,
        env: Env,
    ) -> Result<Vec<(Symbol, Timeframe, DateTime<Utc>, DateTime<Utc>)>, StoreError>;
}

type SeriesKey = (Env, Symbol, Timeframe);

/// Backtest-mode store: everything lives in process memory, guarded by a single `RwLock` so
/// concurrent readers never block each other and a writer never blocks a reader mid-read
/// (§6 "readers open read-only").
#[derive(Debug, Default)]
pub struct InMemoryHistoricalStore {
    series: Arc<RwLock<std::collections::HashMap<SeriesKey, BTreeMap<DateTime<Utc>, Bar>>>>,
}

impl InMemoryHistoricalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoricalStore for InMemoryHistoricalStore {
    async fn get_ohlcv(
        &self,
        symbol: &Symbol,
        tf: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        env: Env,
    ) -> Result<Vec<Bar>, StoreError> {
        let guard = self.series.read();
        let Some(series) = guard.get(&(env, symbol.clone(), tf)) else {
            return Ok(Vec::new());
        };
        Ok(series.range(start..=end).map(|(_, bar)| bar.clone()).collect())
    }

    async fn get_latest_ohlcv(
        &self,
        symbol: &Symbol,
        tf: Timeframe,
        limit: usize,
        env: Env,
    ) -> Result<Vec<Bar>, StoreError> {
        let guard = self.series.read();
        let Some(series) = guard.get(&(env, symbol.clone(), tf)) else {
            return Ok(Vec::new());
        };
        let mut bars: Vec<Bar> = series.values().rev().take(limit).cloned().collect();
        bars.reverse();
        Ok(bars)
    }

    async fn upsert_candle(
        &self,
        symbol: &Symbol,
        tf: Timeframe,
        env: Env,
        bar: Bar,
    ) -> Result<(), StoreError> {
        let mut guard = self.series.write();
        guard
            .entry((env, symbol.clone(), tf))
            .or_default()
            .insert(bar.ts_open, bar);
        Ok(())
    }

    async fn get_symbol_timeframe_ranges(
        &self,
        env: Env,
    ) -> Result<Vec<(Symbol, Timeframe, DateTime<Utc>, DateTime<Utc>)>, StoreError> {
        let guard = self.series.read();
        Ok(guard
            .iter()
            .filter(|((e, _, _), _)| *e == env)
            .filter_map(|((_, symbol, tf), series)| {
                let first = series.keys().next()?;
                let last = series.keys().next_back()?;
                Some((symbol.clone(), *tf, *first, *last))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn bar(open_secs: i64) -> Bar {
        Bar::new(
            Utc.timestamp_opt(open_secs, 0).unwrap(),
            Utc.timestamp_opt(open_secs + 60, 0).unwrap(),
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ONE,
        )
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = InMemoryHistoricalStore::new();
        let symbol = Symbol::from("BTCUSDT");
        store
            .upsert_candle(&symbol, Timeframe::M1, Env::Demo, bar(0))
            .await
            .unwrap();
        store
            .upsert_candle(&symbol, Timeframe::M1, Env::Demo, bar(0))
            .await
            .unwrap();
        let latest = store
            .get_latest_ohlcv(&symbol, Timeframe::M1, 10, Env::Demo)
            .await
            .unwrap();
        assert_eq!(latest.len(), 1);
    }

    #[tokio::test]
    async fn test_get_latest_respects_limit_and_order() {
        let store = InMemoryHistoricalStore::new();
        let symbol = Symbol::from("BTCUSDT");
        for i in 0..5 {
            store
                .upsert_candle(&symbol, Timeframe::M1, Env::Live, bar(i * 60))
                .await
                .unwrap();
        }
        let latest = store
            .get_latest_ohlcv(&symbol, Timeframe::M1, 2, Env::Live)
            .await
            .unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest[0].ts_open < latest[1].ts_open);
    }

    #[tokio::test]
    async fn test_envs_are_isolated() {
        let store = InMemoryHistoricalStore::new();
        let symbol = Symbol::from("BTCUSDT");
        store
            .upsert_candle(&symbol, Timeframe::M1, Env::Live, bar(0))
            .await
            .unwrap();
        let demo = store
            .get_latest_ohlcv(&symbol, Timeframe::M1, 10, Env::Demo)
            .await
            .unwrap();
        assert!(demo.is_empty());
    }
}
