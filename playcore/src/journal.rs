//! Journal (§6 Artifact files): one JSONL line per `signal | fill | error` event, appended to
//! `data/journal/{instance_id}.jsonl` for live/demo, or `events.jsonl` inside a backtest run's
//! artifact folder. Never blocks the engine loop on a write failure — a journal write error is
//! logged and swallowed, since losing a journal line must never stop trading (§7: the journal
//! is an audit trail, not a control-flow dependency).

use chrono::{DateTime, Utc};
use playcore_instrument::{EngineId, Symbol};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEvent {
    Signal { symbol: Symbol, direction: String, size_usdt: rust_decimal::Decimal, strategy: String },
    Fill { symbol: Symbol, side: String, qty: rust_decimal::Decimal, price: rust_decimal::Decimal, order_id: String },
    Error { reason: String, detail: String },
}

#[derive(Debug, Serialize)]
struct JournalLine<'a> {
    engine_id: &'a str,
    at: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a JournalEvent,
}

/// Appends newline-delimited JSON event records for one engine. `path` is computed once at
/// construction (§6: `data/journal/{instance_id}.jsonl`, or `events.jsonl` for a backtest run
/// artifact folder) and every write locks the same file handle so concurrent callers (the main
/// loop and the WS fill callback) never interleave partial lines.
#[derive(Debug)]
pub struct Journal {
    engine_id: EngineId,
    path: PathBuf,
    file: Mutex<()>,
}

impl Journal {
    pub fn new(engine_id: EngineId, path: impl Into<PathBuf>) -> Self {
        Self { engine_id, path: path.into(), file: Mutex::new(()) }
    }

    /// `data/journal/{instance_id}.jsonl` (§6).
    pub fn default_path(engine_id: &EngineId) -> PathBuf {
        Path::new("data").join("journal").join(format!("{}.jsonl", engine_id.sanitized()))
    }

    pub fn record(&self, event: JournalEvent) {
        let _guard = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let line = JournalLine { engine_id: self.engine_id.as_str(), at: Utc::now(), event: &event };
        let Ok(mut serialized) = serde_json::to_string(&line) else {
            warn!(engine_id = %self.engine_id, "failed to serialize journal event");
            return;
        };
        serialized.push('\n');

        if let Some(parent) = self.path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                warn!(engine_id = %self.engine_id, %error, "failed to create journal directory");
                return;
            }
        }
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(serialized.as_bytes()));
        if let Err(error) = result {
            warn!(engine_id = %self.engine_id, %error, "failed to append journal event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_appends_jsonl_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let journal = Journal::new(EngineId::generate("ema_cross", "backtest"), &path);

        journal.record(JournalEvent::Signal {
            symbol: Symbol::from("BTCUSDT"),
            direction: "long".into(),
            size_usdt: dec!(100),
            strategy: "ema_cross".into(),
        });
        journal.record(JournalEvent::Fill {
            symbol: Symbol::from("BTCUSDT"),
            side: "long".into(),
            qty: dec!(1),
            price: dec!(100),
            order_id: "1".into(),
        });

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"kind\":\"signal\""));
        assert!(lines[1].contains("\"kind\":\"fill\""));
    }

    #[test]
    fn test_default_path_uses_sanitized_engine_id() {
        let id = EngineId::generate("ema_cross", "live");
        let path = Journal::default_path(&id);
        assert_eq!(path, Path::new("data").join("journal").join(format!("{}.jsonl", id.sanitized())));
    }
}
