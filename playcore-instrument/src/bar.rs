use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable OHLCV record (§3 Data Model).
///
/// `ts_open`/`ts_close` are UTC naive instants in every internal buffer — only the boundary
/// adapters (the exchange WS client, the historical store) convert to/from exchange-local
/// representations. A `Bar` is never mutated once appended to a buffer or indicator cache.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize, Display)]
#[display("Bar(close={ts_close}, o={open}, h={high}, l={low}, c={close}, v={volume})")]
pub struct Bar {
    pub ts_open: DateTime<Utc>,
    pub ts_close: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    pub fn new(
        ts_open: DateTime<Utc>,
        ts_close: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            ts_open,
            ts_close,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `(high + low + close) / 3` — one of the five input sources a [`crate::feature`] spec may
    /// bind to.
    pub fn hlc3(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }

    /// `(open + high + low + close) / 4`.
    pub fn ohlc4(&self) -> Decimal {
        (self.open + self.high + self.low + self.close) / Decimal::from(4)
    }

    /// Resolve one of the candle-level [`InputSource`]s against this bar.
    ///
    /// Must stay numerically identical to [`InputSource::resolve_array`] — both resolvers are
    /// exercised by the same property test in `playcore-ta`.
    pub fn resolve(&self, source: InputSource) -> Decimal {
        match source {
            InputSource::Open => self.open,
            InputSource::High => self.high,
            InputSource::Low => self.low,
            InputSource::Close => self.close,
            InputSource::Volume => self.volume,
            InputSource::Hlc3 => self.hlc3(),
            InputSource::Ohlc4 => self.ohlc4(),
        }
    }
}

/// The input source a [`crate::feature::FeatureSpec`] reads from a [`Bar`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Open,
    High,
    Low,
    Close,
    Volume,
    Hlc3,
    Ohlc4,
}
