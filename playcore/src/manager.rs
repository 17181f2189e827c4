//! Engine manager (C10, §4.10): the process-wide (and, via the on-disk registry,
//! cross-process) singleton that enforces concurrency caps, tracks which instances are alive,
//! and implements the pause IPC the live runner polls each bar.

use crate::engine::EngineMode;
use crate::error::PlaycoreError;
use playcore_instrument::{EngineId, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::{Pid, System};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum InstanceStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

/// The on-disk shape of `~/.trade/instances/{instance_id}.json` (§6 Instance registry).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceRecord {
    pub instance_id: EngineId,
    pub play_id: String,
    pub mode: String,
    pub symbol: Symbol,
    pub pid: u32,
    pub status: InstanceStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// C10. Construct one per process and share it (wrapped in an `Arc`) between every engine the
/// process spawns — the concurrency caps are enforced across the whole process, not per call
/// site.
pub struct InstanceManager {
    root: PathBuf,
    instances: parking_lot::Mutex<HashMap<EngineId, InstanceRecord>>,
}

impl InstanceManager {
    pub fn new(root: PathBuf) -> Self {
        Self { root, instances: parking_lot::Mutex::new(HashMap::new()) }
    }

    /// `~/.trade/instances` (§6). Falls back to `./.trade/instances` if `$HOME` is unset, so
    /// tests and sandboxed environments never silently land in a path they don't expect.
    pub fn default_root() -> PathBuf {
        let base = dirs_home().unwrap_or_else(|| PathBuf::from("."));
        base.join(".trade").join("instances")
    }

    fn record_path(&self, instance_id: &EngineId) -> PathBuf {
        self.root.join(format!("{}.json", instance_id.sanitized()))
    }

    fn pause_path(&self, instance_id: &EngineId) -> PathBuf {
        self.root.join(format!("{}.pause", instance_id.sanitized()))
    }

    pub fn pause_path_for(&self, instance_id: &EngineId) -> PathBuf {
        self.pause_path(instance_id)
    }

    /// §4.10 concurrency caps, checked under the manager's lock before any resource is
    /// allocated: at most one live instance process-wide, at most one demo instance per symbol,
    /// at most one backtest instance process-wide; shadow is uncapped (it never touches real
    /// money or a shared historical-store handle).
    pub fn register(&self, play_id: &str, mode: EngineMode, symbol: &Symbol) -> Result<InstanceRecord, PlaycoreError> {
        let mut instances = self.instances.lock();
        self.check_concurrency_cap(&instances, mode, symbol)?;

        let instance_id = EngineId::generate(play_id, mode.as_str());
        let record = InstanceRecord {
            instance_id: instance_id.clone(),
            play_id: play_id.to_string(),
            mode: mode.as_str().to_string(),
            symbol: symbol.clone(),
            pid: std::process::id(),
            status: InstanceStatus::Starting,
            started_at: chrono::Utc::now(),
        };

        self.write_record(&record)?;
        instances.insert(instance_id, record.clone());
        info!(instance_id = %record.instance_id, mode = mode.as_str(), "instance registered");
        Ok(record)
    }

    fn check_concurrency_cap(
        &self,
        instances: &HashMap<EngineId, InstanceRecord>,
        mode: EngineMode,
        symbol: &Symbol,
    ) -> Result<(), PlaycoreError> {
        let alive = self.merge_alive(instances);
        match mode {
            EngineMode::Live => {
                if alive.iter().any(|record| record.mode == EngineMode::Live.as_str()) {
                    return Err(PlaycoreError::ConcurrencyLimit("at most one live instance may run at a time".into()));
                }
            }
            EngineMode::Demo => {
                if alive.iter().any(|record| record.mode == EngineMode::Demo.as_str() && &record.symbol == symbol) {
                    return Err(PlaycoreError::ConcurrencyLimit(format!("a demo instance for {} is already running", symbol.as_str())));
                }
            }
            EngineMode::Backtest => {
                if alive.iter().any(|record| record.mode == EngineMode::Backtest.as_str()) {
                    return Err(PlaycoreError::ConcurrencyLimit("at most one backtest instance may run at a time".into()));
                }
            }
            EngineMode::Shadow => {}
        }
        Ok(())
    }

    pub fn update_status(&self, instance_id: &EngineId, status: InstanceStatus) -> Result<(), PlaycoreError> {
        let mut instances = self.instances.lock();
        let record = instances.get_mut(instance_id).ok_or_else(|| PlaycoreError::InstanceNotFound(instance_id.as_str().to_string()))?;
        record.status = status;
        self.write_record(record)?;
        Ok(())
    }

    /// Idempotent: stopping an instance twice (or one the cross-process registry never saw
    /// reach this process) is not an error (§4.10 crash cleanup relies on this).
    pub fn unregister(&self, instance_id: &EngineId) {
        self.instances.lock().remove(instance_id);
        let _ = std::fs::remove_file(self.record_path(instance_id));
    }

    fn write_record(&self, record: &InstanceRecord) -> Result<(), PlaycoreError> {
        std::fs::create_dir_all(&self.root).map_err(|error| PlaycoreError::Internal(error.to_string()))?;
        let json = serde_json::to_string_pretty(record).map_err(|error| PlaycoreError::Internal(error.to_string()))?;
        std::fs::write(self.record_path(&record.instance_id), json).map_err(|error| PlaycoreError::Internal(error.to_string()))?;
        Ok(())
    }

    /// Every on-disk instance record in `root`, regardless of liveness — the raw input to
    /// [`Self::merge_alive`].
    fn read_all_on_disk(&self) -> Vec<InstanceRecord> {
        let Ok(entries) = std::fs::read_dir(&self.root) else { return Vec::new() };
        entries
            .flatten()
            .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("json"))
            .filter_map(|entry| std::fs::read(entry.path()).ok())
            .filter_map(|bytes| serde_json::from_slice::<InstanceRecord>(&bytes).ok())
            .collect()
    }

    /// §4.10 `list_all()`: merges this process's in-memory instances with every on-disk record,
    /// dropping any whose `pid` is no longer alive, and preferring the in-memory copy when both
    /// describe the same `instance_id` (it reflects this process's freshest status).
    fn merge_alive(&self, in_memory: &HashMap<EngineId, InstanceRecord>) -> Vec<InstanceRecord> {
        let mut system = System::new_all();
        system.refresh_all();

        let mut merged: HashMap<EngineId, InstanceRecord> = HashMap::new();
        for record in self.read_all_on_disk() {
            if pid_is_alive(&system, record.pid) {
                merged.insert(record.instance_id.clone(), record);
            }
        }
        for (id, record) in in_memory {
            merged.insert(id.clone(), record.clone());
        }
        merged.into_values().collect()
    }

    pub fn list_all(&self) -> Vec<InstanceRecord> {
        let instances = self.instances.lock();
        self.merge_alive(&instances)
    }

    pub fn pause(&self, instance_id: &EngineId) -> Result<(), PlaycoreError> {
        std::fs::create_dir_all(&self.root).map_err(|error| PlaycoreError::Internal(error.to_string()))?;
        std::fs::write(self.pause_path(instance_id), b"").map_err(|error| PlaycoreError::Internal(error.to_string()))?;
        Ok(())
    }

    pub fn resume(&self, instance_id: &EngineId) -> Result<(), PlaycoreError> {
        match std::fs::remove_file(self.pause_path(instance_id)) {
            Ok(()) | Err(_) if !self.pause_path(instance_id).exists() => Ok(()),
            Err(error) => Err(PlaycoreError::Internal(error.to_string())),
        }
    }

    pub fn is_paused(&self, instance_id: &EngineId) -> bool {
        self.pause_path(instance_id).exists()
    }

    /// §4.10 crash cleanup: spawns `task`, and if it panics or returns `Err`, removes the
    /// instance (and its on-disk record) so the concurrency slot is freed for the next start.
    /// On a clean `Ok(())` return the caller is expected to have already unregistered via its
    /// own shutdown path; this only guards the unexpected-exit case.
    pub async fn run_guarded<F>(self: Arc<Self>, instance_id: EngineId, task: F) -> Result<(), PlaycoreError>
    where
        F: std::future::Future<Output = Result<(), PlaycoreError>> + Send + 'static,
    {
        let manager = self.clone();
        let guarded_id = instance_id.clone();
        let joined = tokio::spawn(task).await;

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                warn!(instance_id = %guarded_id, %error, "instance exited with an error, freeing its slot");
                manager.unregister(&guarded_id);
                Err(error)
            }
            Err(join_error) => {
                warn!(instance_id = %guarded_id, %join_error, "instance task panicked, freeing its slot");
                manager.unregister(&guarded_id);
                Err(PlaycoreError::Internal(join_error.to_string()))
            }
        }
    }
}

fn pid_is_alive(system: &System, pid: u32) -> bool {
    system.process(Pid::from_u32(pid)).is_some()
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playcore_instrument::Symbol;

    fn manager(root: &Path) -> InstanceManager {
        InstanceManager::new(root.to_path_buf())
    }

    #[test]
    fn test_register_writes_on_disk_record() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let record = mgr.register("ema_cross", EngineMode::Demo, &Symbol::from("BTCUSDT")).unwrap();
        assert!(dir.path().join(format!("{}.json", record.instance_id.sanitized())).exists());
    }

    #[test]
    fn test_at_most_one_live_instance_process_wide() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        mgr.register("ema_cross", EngineMode::Live, &Symbol::from("BTCUSDT")).unwrap();
        let err = mgr.register("other_play", EngineMode::Live, &Symbol::from("ETHUSDT")).unwrap_err();
        assert!(matches!(err, PlaycoreError::ConcurrencyLimit(_)));
    }

    #[test]
    fn test_demo_cap_is_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        mgr.register("ema_cross", EngineMode::Demo, &Symbol::from("BTCUSDT")).unwrap();
        // Different symbol: allowed.
        mgr.register("ema_cross", EngineMode::Demo, &Symbol::from("ETHUSDT")).unwrap();
        // Same symbol again: denied.
        let err = mgr.register("other_play", EngineMode::Demo, &Symbol::from("BTCUSDT")).unwrap_err();
        assert!(matches!(err, PlaycoreError::ConcurrencyLimit(_)));
    }

    #[test]
    fn test_at_most_one_backtest_process_wide() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        mgr.register("ema_cross", EngineMode::Backtest, &Symbol::from("BTCUSDT")).unwrap();
        let err = mgr.register("ema_cross", EngineMode::Backtest, &Symbol::from("ETHUSDT")).unwrap_err();
        assert!(matches!(err, PlaycoreError::ConcurrencyLimit(_)));
    }

    #[test]
    fn test_shadow_mode_is_uncapped() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        mgr.register("ema_cross", EngineMode::Shadow, &Symbol::from("BTCUSDT")).unwrap();
        mgr.register("ema_cross", EngineMode::Shadow, &Symbol::from("BTCUSDT")).unwrap();
    }

    #[test]
    fn test_unregister_is_idempotent_and_frees_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let record = mgr.register("ema_cross", EngineMode::Live, &Symbol::from("BTCUSDT")).unwrap();
        mgr.unregister(&record.instance_id);
        mgr.unregister(&record.instance_id);
        mgr.register("ema_cross", EngineMode::Live, &Symbol::from("BTCUSDT")).unwrap();
    }

    #[test]
    fn test_stale_pid_record_is_dropped_from_list_all() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let stale = InstanceRecord {
            instance_id: EngineId::generate("stale_play", "demo"),
            play_id: "stale_play".into(),
            mode: "demo".into(),
            symbol: Symbol::from("BTCUSDT"),
            // PID 0 never corresponds to a user process sysinfo can observe as alive.
            pid: 0,
            status: InstanceStatus::Running,
            started_at: chrono::Utc::now(),
        };
        mgr.write_record(&stale).unwrap();
        assert!(mgr.list_all().is_empty());
    }

    #[test]
    fn test_pause_resume_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let record = mgr.register("ema_cross", EngineMode::Live, &Symbol::from("BTCUSDT")).unwrap();
        assert!(!mgr.is_paused(&record.instance_id));
        mgr.pause(&record.instance_id).unwrap();
        assert!(mgr.is_paused(&record.instance_id));
        mgr.resume(&record.instance_id).unwrap();
        assert!(!mgr.is_paused(&record.instance_id));
    }

    #[tokio::test]
    async fn test_run_guarded_frees_slot_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = Arc::new(manager(dir.path()));
        let record = mgr.register("ema_cross", EngineMode::Live, &Symbol::from("BTCUSDT")).unwrap();

        let result = mgr
            .clone()
            .run_guarded(record.instance_id.clone(), async { Err(PlaycoreError::Internal("boom".into())) })
            .await;
        assert!(result.is_err());
        assert!(mgr.list_all().is_empty());

        // The slot should be free again.
        mgr.register("ema_cross", EngineMode::Live, &Symbol::from("BTCUSDT")).unwrap();
    }

    #[tokio::test]
    async fn test_run_guarded_frees_slot_on_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = Arc::new(manager(dir.path()));
        let record = mgr.register("ema_cross", EngineMode::Backtest, &Symbol::from("BTCUSDT")).unwrap();

        let result = mgr
            .clone()
            .run_guarded(record.instance_id.clone(), async { panic!("simulated crash") })
            .await;
        assert!(result.is_err());
        mgr.register("ema_cross", EngineMode::Backtest, &Symbol::from("ETHUSDT")).unwrap();
    }
}
