use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An enumerated candle timeframe (§3 Data Model).
///
/// The canonical minute count exists only for ordering and freshness checks — it is never used
/// to derive wall-clock boundaries (that is the historical store / exchange adapter's job).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    #[serde(rename = "1m")]
    #[display("1m")]
    M1,
    #[serde(rename = "3m")]
    #[display("3m")]
    M3,
    #[serde(rename = "5m")]
    #[display("5m")]
    M5,
    #[serde(rename = "15m")]
    #[display("15m")]
    M15,
    #[serde(rename = "30m")]
    #[display("30m")]
    M30,
    #[serde(rename = "1h")]
    #[display("1h")]
    H1,
    #[serde(rename = "2h")]
    #[display("2h")]
    H2,
    #[serde(rename = "4h")]
    #[display("4h")]
    H4,
    #[serde(rename = "6h")]
    #[display("6h")]
    H6,
    #[serde(rename = "12h")]
    #[display("12h")]
    H12,
    D,
    W,
}

/// Unknown or malformed timeframe string (eg/ `"7m"`).
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("unrecognised timeframe: {0}")]
pub struct ParseTimeframeError(pub String);

impl Timeframe {
    /// Minute count used only for ordering/freshness comparisons between timeframes.
    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M3 => 3,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
            Timeframe::H4 => 240,
            Timeframe::H6 => 360,
            Timeframe::H12 => 720,
            Timeframe::D => 1_440,
            Timeframe::W => 10_080,
        }
    }

    pub fn all() -> &'static [Timeframe] {
        use Timeframe::*;
        &[M1, M3, M5, M15, M30, H1, H2, H4, H6, H12, D, W]
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Timeframe::*;
        Ok(match s {
            "1m" => M1,
            "3m" => M3,
            "5m" => M5,
            "15m" => M15,
            "30m" => M30,
            "1h" => H1,
            "2h" => H2,
            "4h" => H4,
            "6h" => H6,
            "12h" => H12,
            "D" | "1D" => D,
            "W" | "1W" => W,
            other => return Err(ParseTimeframeError(other.to_string())),
        })
    }
}

/// Abstract role a concrete [`Timeframe`] plays within a Play (§3 Data Model).
///
/// `Exec` is a pointer to whichever of `LowTf`/`MedTf`/`HighTf` the Play marks executable —
/// the timeframe whose bar-close drives rule evaluation.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TfRole {
    LowTf,
    MedTf,
    HighTf,
}

impl TfRole {
    pub fn all() -> [TfRole; 3] {
        [TfRole::LowTf, TfRole::MedTf, TfRole::HighTf]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_str() {
        for tf in Timeframe::all() {
            let s = tf.to_string();
            assert_eq!(&Timeframe::from_str(&s).unwrap(), tf);
        }
    }

    #[test]
    fn test_ordering_by_minutes() {
        assert!(Timeframe::M1.minutes() < Timeframe::H1.minutes());
        assert!(Timeframe::H1.minutes() < Timeframe::D.minutes());
    }

    #[test]
    fn test_unknown_timeframe() {
        assert_eq!(
            Timeframe::from_str("7m").unwrap_err(),
            ParseTimeframeError("7m".to_string())
        );
    }
}
