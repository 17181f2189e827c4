//! Realtime bus (§6): in-memory, single-process, thread-safe fan-out of exchange events to
//! typed callbacks. A callback is never invoked while the bus holds its internal lock, and a
//! panicking callback is isolated from its siblings (§7 Callback error policy).

use parking_lot::RwLock;
use playcore_instrument::{Bar, Position, Symbol, Timeframe};
use rust_decimal::Decimal;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone)]
pub enum BusEvent {
    Ticker { symbol: Symbol, price: Decimal },
    /// A kline update. `is_closed` distinguishes an in-progress candle tick from a bar-close
    /// (§4.9: the live runner only ever enqueues `is_closed=true` klines).
    Kline { symbol: Symbol, tf: Timeframe, bar: Bar, is_closed: bool },
    Position(Position),
    Order { client_order_id: String },
    Execution { client_order_id: String, qty: Decimal },
    Wallet { equity: Decimal },
}

pub type Callback = Arc<dyn Fn(&BusEvent) + Send + Sync>;

/// A minimal topic discriminant, used only to route a publish to the callbacks registered for
/// it without requiring subscribers to filter every event variant themselves.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Topic {
    Ticker,
    Kline,
    Position,
    Order,
    Execution,
    Wallet,
}

impl BusEvent {
    fn topic(&self) -> Topic {
        match self {
            BusEvent::Ticker { .. } => Topic::Ticker,
            BusEvent::Kline { .. } => Topic::Kline,
            BusEvent::Position(_) => Topic::Position,
            BusEvent::Order { .. } => Topic::Order,
            BusEvent::Execution { .. } => Topic::Execution,
            BusEvent::Wallet { .. } => Topic::Wallet,
        }
    }
}

#[derive(Debug, Default)]
pub struct RealtimeBus {
    subscribers: RwLock<std::collections::HashMap<Topic, Vec<Callback>>>,
}

impl RealtimeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, topic: Topic, callback: Callback) {
        self.subscribers.write().entry(topic).or_default().push(callback);
    }

    /// Publish `event` to every subscriber of its topic. Snapshots the callback list under the
    /// lock, then releases the lock before invoking anything, and isolates a panicking
    /// subscriber so it can't take down its siblings.
    pub fn publish(&self, event: BusEvent) {
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .get(&event.topic())
            .cloned()
            .unwrap_or_default();

        for callback in callbacks {
            let event_ref = &event;
            if catch_unwind(AssertUnwindSafe(|| callback(event_ref))).is_err() {
                error!(topic = ?event.topic(), "realtime bus subscriber panicked, isolating");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playcore_instrument::Symbol;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_reaches_only_matching_topic() {
        let bus = RealtimeBus::new();
        let ticker_hits = Arc::new(AtomicUsize::new(0));
        let kline_hits = Arc::new(AtomicUsize::new(0));
        let t = ticker_hits.clone();
        bus.subscribe(Topic::Ticker, Arc::new(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        }));
        let k = kline_hits.clone();
        bus.subscribe(Topic::Kline, Arc::new(move |_| {
            k.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(BusEvent::Ticker {
            symbol: Symbol::from("BTCUSDT"),
            price: Decimal::ONE,
        });

        assert_eq!(ticker_hits.load(Ordering::SeqCst), 1);
        assert_eq!(kline_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let bus = RealtimeBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Topic::Wallet, Arc::new(|_| panic!("boom")));
        let h = hits.clone();
        bus.subscribe(Topic::Wallet, Arc::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(BusEvent::Wallet { equity: Decimal::ONE });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
