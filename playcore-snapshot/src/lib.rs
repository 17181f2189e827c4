#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! Engine state checkpointing (§3 Data Model "Engine state (checkpoint)", §6 "State store").
//!
//! A [`PlayEngine`](../playcore/struct.PlayEngine.html) periodically serializes an
//! [`EngineState`] through a [`StateStore`] so that a crashed or restarted process can resume
//! from its last-known position, pending orders, and equity rather than rediscovering them from
//! the exchange. Two implementations exist: [`InMemoryStateStore`] for backtests (no process
//! boundary to survive) and [`FileStateStore`] for live/demo, one JSON file per engine under
//! `~/.trade/state/`.

use chrono::{DateTime, Utc};
use playcore_instrument::{EngineId, Position, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// A single tracked order as it appears in the checkpoint (§3: `pending_orders[]`). Kept
/// independent of [`playcore_execution::PendingOrder`]'s internal representation so the
/// checkpoint schema doesn't churn with executor-internal refactors.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PendingOrderRecord {
    pub order_id: String,
    pub client_order_id: String,
    pub status: String,
    pub filled_price: Option<Decimal>,
    pub submitted_at: DateTime<Utc>,
}

/// Engine state (checkpoint), §3 Data Model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineState {
    pub engine_id: EngineId,
    pub play_id: String,
    pub mode: String,
    pub symbol: Symbol,
    pub position: Option<Position>,
    #[serde(default)]
    pub pending_orders: Vec<PendingOrderRecord>,
    pub equity_usdt: Decimal,
    pub realized_pnl: Decimal,
    pub total_trades: u64,
    pub last_bar_ts: Option<DateTime<Utc>>,
    pub last_signal_ts: Option<DateTime<Utc>>,
    /// Opaque incremental-cache state (C2/C3), carried as an already-serialized blob rather than
    /// a typed field so the checkpoint schema doesn't depend on any one Play's feature set.
    #[serde(default)]
    pub incremental_state_blob: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl EngineState {
    /// A fresh checkpoint for an engine that hasn't processed a bar yet.
    pub fn fresh(engine_id: EngineId, play_id: impl Into<String>, mode: impl Into<String>, symbol: Symbol, starting_equity: Decimal) -> Self {
        Self {
            engine_id,
            play_id: play_id.into(),
            mode: mode.into(),
            symbol,
            position: None,
            pending_orders: Vec::new(),
            equity_usdt: starting_equity,
            realized_pnl: Decimal::ZERO,
            total_trades: 0,
            last_bar_ts: None,
            last_signal_ts: None,
            incremental_state_blob: None,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("no checkpoint found for engine {0}")]
    NotFound(EngineId),
    #[error("failed to read checkpoint for engine {0}: {1}")]
    Read(EngineId, #[source] std::io::Error),
    #[error("failed to write checkpoint for engine {0}: {1}")]
    Write(EngineId, #[source] std::io::Error),
    #[error("failed to (de)serialize checkpoint for engine {0}: {1}")]
    Serde(EngineId, #[source] serde_json::Error),
}

/// State store (§6): in-memory for backtest, file-per-engine JSON for live/demo. Ownership
/// (§3): a state-store file is owned by the engine whose `engine_id` names it; other processes
/// may read it but must treat the owning PID as the sole writer.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug {
    async fn save(&self, state: &EngineState) -> Result<(), StateStoreError>;
    async fn load(&self, engine_id: &EngineId) -> Result<EngineState, StateStoreError>;
    async fn delete(&self, engine_id: &EngineId) -> Result<(), StateStoreError>;
}

/// Backtest state store: never touches disk, scoped to the process.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<EngineId, EngineState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(&self, state: &EngineState) -> Result<(), StateStoreError> {
        self.states.lock().await.insert(state.engine_id.clone(), state.clone());
        Ok(())
    }

    async fn load(&self, engine_id: &EngineId) -> Result<EngineState, StateStoreError> {
        self.states
            .lock()
            .await
            .get(engine_id)
            .cloned()
            .ok_or_else(|| StateStoreError::NotFound(engine_id.clone()))
    }

    async fn delete(&self, engine_id: &EngineId) -> Result<(), StateStoreError> {
        self.states.lock().await.remove(engine_id);
        Ok(())
    }
}

/// Live/demo state store: one JSON file per engine at `{root}/{engine_id.sanitized()}.json`
/// (§6, default root `~/.trade/state/`). Writes use LF line endings and are scoped behind an
/// async mutex so concurrent checkpoints from the same process serialize cleanly; cross-process
/// writers are prevented structurally, since only the owning engine process ever calls `save`
/// for its own `engine_id` (§3 Ownership).
#[derive(Debug)]
pub struct FileStateStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_lock: Mutex::new(()) }
    }

    /// `~/.trade/state`, falling back to `./.trade/state` if the home directory can't be
    /// resolved (headless CI containers, sandboxed test runners).
    pub fn default_root() -> PathBuf {
        dirs_home().join(".trade").join("state")
    }

    fn path_for(&self, engine_id: &EngineId) -> PathBuf {
        self.root.join(format!("{}.json", engine_id.sanitized()))
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
    async fn save(&self, state: &EngineState) -> Result<(), StateStoreError> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.root).map_err(|e| StateStoreError::Write(state.engine_id.clone(), e))?;
        let mut body =
            serde_json::to_string_pretty(state).map_err(|e| StateStoreError::Serde(state.engine_id.clone(), e))?;
        body.push('\n');
        let body = body.replace("\r\n", "\n");
        fs::write(self.path_for(&state.engine_id), body)
            .map_err(|e| StateStoreError::Write(state.engine_id.clone(), e))
    }

    async fn load(&self, engine_id: &EngineId) -> Result<EngineState, StateStoreError> {
        let path = self.path_for(engine_id);
        if !path.exists() {
            return Err(StateStoreError::NotFound(engine_id.clone()));
        }
        let body = fs::read_to_string(&path).map_err(|e| StateStoreError::Read(engine_id.clone(), e))?;
        serde_json::from_str(&body).map_err(|e| StateStoreError::Serde(engine_id.clone(), e))
    }

    async fn delete(&self, engine_id: &EngineId) -> Result<(), StateStoreError> {
        let path = self.path_for(engine_id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| StateStoreError::Write(engine_id.clone(), e))?;
        }
        Ok(())
    }
}

/// Picks the state store appropriate to a run mode: `backtest` never persists across process
/// boundaries, `demo`/`live` checkpoint to disk.
pub fn store_for_mode(mode: &str, root: impl Into<PathBuf>) -> Arc<dyn StateStore> {
    match mode {
        "backtest" => Arc::new(InMemoryStateStore::new()),
        _ => Arc::new(FileStateStore::new(root)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playcore_instrument::Side;
    use rust_decimal_macros::dec;

    fn sample(engine_id: EngineId) -> EngineState {
        EngineState::fresh(engine_id, "ema_cross", "live", Symbol::from("BTCUSDT"), dec!(1000))
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trips() {
        let store = InMemoryStateStore::new();
        let id = EngineId::generate("ema_cross", "live");
        let state = sample(id.clone());
        store.save(&state).await.unwrap();
        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_in_memory_store_missing_returns_not_found() {
        let store = InMemoryStateStore::new();
        let id = EngineId::generate("ema_cross", "live");
        let err = store.load(&id).await.unwrap_err();
        assert!(matches!(err, StateStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_file_store_round_trips_and_sanitizes_filename() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        let id = EngineId(smol_str::SmolStr::new("My Play!/live_ab12cd34"));
        let mut state = sample(id.clone());
        state.position = Some(Position {
            symbol: Symbol::from("BTCUSDT"),
            side: Side::Long,
            size_qty: dec!(1),
            size_usdt: dec!(100),
            entry_price: dec!(100),
            mark_price: dec!(105),
            unrealized_pnl: dec!(5),
            leverage: dec!(5),
            stop_loss: Some(dec!(95)),
            take_profit: Some(dec!(110)),
            liquidation_price: None,
        });
        store.save(&state).await.unwrap();

        let path = dir.path().join(format!("{}.json", id.sanitized()));
        assert!(path.exists());
        let body = fs::read_to_string(&path).unwrap();
        assert!(!body.contains('\r'));

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_file_store_delete_removes_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        let id = EngineId::generate("ema_cross", "demo");
        store.save(&sample(id.clone())).await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(matches!(store.load(&id).await.unwrap_err(), StateStoreError::NotFound(_)));
    }

    #[test]
    fn test_store_for_mode_picks_in_memory_for_backtest() {
        let store = store_for_mode("backtest", "/tmp/unused");
        assert_eq!(format!("{store:?}").contains("InMemoryStateStore"), true);
    }
}
