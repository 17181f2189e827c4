use std::collections::{HashMap, VecDeque};

/// Bounded FIFO dedup set for `order_id`s the executor has already recorded a fill for (§4.7
/// step 6: "insert id under a bounded LRU (max 10 000)"). Eviction is oldest-first rather than
/// true LRU-on-read — the executor only ever inserts and checks membership, it never "touches"
/// an existing entry to bump its recency, so a FIFO ring gives the same bounded-memory
/// guarantee with a simpler implementation.
pub struct IdempotencyCache {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashMap<String, ()>,
}

impl IdempotencyCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, order: VecDeque::with_capacity(capacity), seen: HashMap::with_capacity(capacity) }
    }

    /// Inserts `order_id`, evicting the oldest entry if at capacity. Returns `true` if this is
    /// the first time `order_id` has been seen (the caller should record the trade); `false` if
    /// it was already present (the caller must treat this as a duplicate, per §4.7's "at most
    /// one recorded trade per `order_id`" contract).
    pub fn insert_if_new(&mut self, order_id: impl Into<String>) -> bool {
        let order_id = order_id.into();
        if self.seen.contains_key(&order_id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        self.order.push_back(order_id.clone());
        self.seen.insert(order_id, ());
        true
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.seen.contains_key(order_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_is_new() {
        let mut cache = IdempotencyCache::new(2);
        assert!(cache.insert_if_new("a"));
    }

    #[test]
    fn test_duplicate_insert_is_not_new() {
        let mut cache = IdempotencyCache::new(2);
        cache.insert_if_new("a");
        assert!(!cache.insert_if_new("a"));
    }

    #[test]
    fn test_eviction_at_capacity() {
        let mut cache = IdempotencyCache::new(2);
        cache.insert_if_new("a");
        cache.insert_if_new("b");
        cache.insert_if_new("c");
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        // "a" was evicted, so it is new again if resubmitted
        assert!(cache.insert_if_new("a"));
    }
}
