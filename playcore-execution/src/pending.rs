use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl PendingStatus {
    /// Terminal states are removed from the pending map immediately (§4.7).
    pub fn is_terminal(self) -> bool {
        matches!(self, PendingStatus::Filled | PendingStatus::Cancelled | PendingStatus::Rejected)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PendingOrder {
    pub order_id: String,
    pub client_order_id: String,
    pub status: PendingStatus,
    pub filled_price: Option<Decimal>,
    pub submitted_at: DateTime<Utc>,
}

/// The single in-memory map behind §4.7's pending-order tracking: one lock, updated by both the
/// submit path and WS order-update/execution callbacks, swept of stale entries by
/// [`PendingOrders::cleanup_old`].
#[derive(Default)]
pub struct PendingOrders {
    inner: Mutex<HashMap<String, PendingOrder>>,
}

impl PendingOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, order: PendingOrder) {
        self.inner.lock().insert(order.order_id.clone(), order);
    }

    /// Applies a WS order-update/execution callback. Deletes the entry if the new status is
    /// terminal (§4.7); otherwise updates it in place. No-op if `order_id` isn't tracked (it may
    /// have already been resolved via REST fallback).
    pub fn apply_update(&self, order_id: &str, status: PendingStatus, filled_price: Option<Decimal>) -> Option<PendingOrder> {
        let mut map = self.inner.lock();
        let entry = map.get_mut(order_id)?;
        entry.status = status;
        if filled_price.is_some() {
            entry.filled_price = filled_price;
        }
        if status.is_terminal() {
            map.remove(order_id)
        } else {
            Some(entry.clone())
        }
    }

    pub fn get(&self, order_id: &str) -> Option<PendingOrder> {
        self.inner.lock().get(order_id).cloned()
    }

    /// §4.7: sweeps entries older than 300s, on the theory that the WS and REST fallback both
    /// would have already resolved a real order within that window and a lingering entry means
    /// the update was lost.
    pub fn cleanup_old(&self, now: DateTime<Utc>, max_age: Duration) {
        let mut map = self.inner.lock();
        map.retain(|_, order| {
            now.signed_duration_since(order.submitted_at).to_std().map(|age| age <= max_age).unwrap_or(true)
        });
    }

    /// A point-in-time copy of every tracked order, for checkpointing (§3 Engine state).
    pub fn snapshot(&self) -> Vec<PendingOrder> {
        self.inner.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

pub const DEFAULT_PENDING_MAX_AGE: Duration = Duration::from_secs(300);

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str, at: DateTime<Utc>) -> PendingOrder {
        PendingOrder {
            order_id: id.to_string(),
            client_order_id: format!("c-{id}"),
            status: PendingStatus::New,
            filled_price: None,
            submitted_at: at,
        }
    }

    #[test]
    fn test_register_and_get() {
        let pending = PendingOrders::new();
        pending.register(order("1", Utc::now()));
        assert!(pending.get("1").is_some());
    }

    #[test]
    fn test_terminal_update_removes_entry() {
        let pending = PendingOrders::new();
        pending.register(order("1", Utc::now()));
        pending.apply_update("1", PendingStatus::Filled, Some(dec!(100)));
        assert!(pending.get("1").is_none());
    }

    #[test]
    fn test_non_terminal_update_keeps_entry() {
        let pending = PendingOrders::new();
        pending.register(order("1", Utc::now()));
        pending.apply_update("1", PendingStatus::PartiallyFilled, None);
        assert_eq!(pending.get("1").unwrap().status, PendingStatus::PartiallyFilled);
    }

    #[test]
    fn test_cleanup_old_sweeps_stale_entries() {
        let pending = PendingOrders::new();
        let old = Utc::now() - chrono::Duration::seconds(400);
        pending.register(order("stale", old));
        pending.register(order("fresh", Utc::now()));
        pending.cleanup_old(Utc::now(), DEFAULT_PENDING_MAX_AGE);
        assert!(pending.get("stale").is_none());
        assert!(pending.get("fresh").is_some());
    }

    #[test]
    fn test_update_on_untracked_order_is_noop() {
        let pending = PendingOrders::new();
        assert!(pending.apply_update("missing", PendingStatus::Filled, None).is_none());
    }
}
