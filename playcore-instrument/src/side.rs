use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};

/// Position/order direction, normalised to `Long`/`Short` regardless of the source lexicon
/// (`Buy`/`Sell`, `long`/`short`, ...) used by the exchange adapter (§3 Data Model).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// Parse any of the lexicons the Bybit REST/WS payloads use for a position/order side.
    pub fn from_exchange_str(raw: &str) -> Option<Side> {
        match raw.to_ascii_lowercase().as_str() {
            "buy" | "long" => Some(Side::Long),
            "sell" | "short" => Some(Side::Short),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Side::from_exchange_str(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised Side: {raw}")))
    }
}

/// Trading direction a [`crate::Signal`] may carry, including the flat/no-position state that
/// `Side` alone cannot express.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Direction::Long,
            Side::Short => Direction::Short,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalises_lexicon() {
        assert_eq!(Side::from_exchange_str("Buy"), Some(Side::Long));
        assert_eq!(Side::from_exchange_str("SELL"), Some(Side::Short));
        assert_eq!(Side::from_exchange_str("long"), Some(Side::Long));
        assert_eq!(Side::from_exchange_str("short"), Some(Side::Short));
        assert_eq!(Side::from_exchange_str("unknown"), None);
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
    }
}
