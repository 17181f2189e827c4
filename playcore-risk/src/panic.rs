use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone)]
pub struct PanicRecord {
    pub reason: String,
    pub triggered_at: DateTime<Utc>,
}

type Callback = Arc<dyn Fn(&PanicRecord) + Send + Sync>;

struct Inner {
    record: Option<PanicRecord>,
    callbacks: Vec<Callback>,
}

/// The process-global fail-closed latch (§4.11, §7 Internal errors). `trigger` is idempotent —
/// re-triggering while already set just replaces the reason and re-fires callbacks — and
/// `reset` on an untriggered latch is a no-op, matching §4.11's stated contract.
///
/// The mutex guards only the record + callback list; it is always released before callbacks are
/// invoked (§5 locking discipline), and a panicking callback is isolated so it can't prevent
/// its siblings from running (§7 Callback error policy).
pub struct PanicState {
    inner: Mutex<Inner>,
}

impl Default for PanicState {
    fn default() -> Self {
        Self::new()
    }
}

impl PanicState {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { record: None, callbacks: Vec::new() }) }
    }

    /// Registered callbacks fire in registration order (§5 Ordering guarantees).
    pub fn register(&self, callback: Callback) {
        self.inner.lock().callbacks.push(callback);
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.lock().record.is_some()
    }

    /// Cheap read for the top of any trading path (§4.11 `check_panic_and_halt`).
    pub fn check_and_halt(&self) -> bool {
        self.is_triggered()
    }

    pub fn current(&self) -> Option<PanicRecord> {
        self.inner.lock().record.clone()
    }

    /// Sets the latch and fans callbacks out, each isolated in its own unwind boundary.
    pub fn trigger(&self, reason: impl Into<String>) {
        let record = PanicRecord { reason: reason.into(), triggered_at: Utc::now() };
        let callbacks = {
            let mut inner = self.inner.lock();
            inner.record = Some(record.clone());
            inner.callbacks.clone()
        };
        for callback in callbacks {
            let record_ref = &record;
            if catch_unwind(AssertUnwindSafe(|| callback(record_ref))).is_err() {
                error!(reason = %record.reason, "panic latch callback panicked, isolating");
            }
        }
    }

    /// No-op if the latch was never triggered (§4.11).
    pub fn reset(&self) {
        self.inner.lock().record = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_trigger_sets_latch_and_fans_out() {
        let state = PanicState::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        state.register(Arc::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!state.is_triggered());
        state.trigger("daily loss breached");
        assert!(state.is_triggered());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(state.current().unwrap().reason, "daily loss breached");
    }

    #[test]
    fn test_reset_is_noop_when_untriggered() {
        let state = PanicState::new();
        state.reset();
        assert!(!state.is_triggered());
    }

    #[test]
    fn test_panicking_callback_does_not_block_siblings() {
        let state = PanicState::new();
        let hits = Arc::new(AtomicUsize::new(0));
        state.register(Arc::new(|_| panic!("boom")));
        let h = hits.clone();
        state.register(Arc::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        state.trigger("test");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_after_trigger_clears_latch() {
        let state = PanicState::new();
        state.trigger("x");
        state.reset();
        assert!(!state.is_triggered());
    }
}
