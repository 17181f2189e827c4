//! Live runner (C9, §4.9): the async glue between bar-close events arriving on the realtime
//! bus and the PlayEngine's synchronous-per-bar evaluation loop. `process_bar`/`execute_signal`
//! never block on I/O (§5); this module owns every suspension point C9 is allowed — the bounded
//! bar queue, and the periodic REST reconciliation/health ticks — plus the reconnect/backoff
//! state machine and the pause-IPC poll (§4.10).

use crate::engine::PlayEngine;
use crate::error::PlaycoreError;
use chrono::{DateTime, Utc};
use playcore_data::bus::{BusEvent, RealtimeBus, Topic};
use playcore_instrument::{Bar, Symbol, Timeframe};
use playcore_integration::exchange::ExchangeAdapter;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// §4.9's state machine: `Stopped -> Starting -> Running -> {Reconnecting -> Running}* ->
/// Stopping -> Stopped`, plus `Error` as a terminal sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Stopped,
    Starting,
    Running,
    Reconnecting,
    Stopping,
    Error,
}

/// Exponential backoff parameters for WS reconnection (§4.9).
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(60), max_attempts: 10 }
    }
}

/// Bounded FIFO that drops the oldest entry on overflow rather than blocking the producer
/// (§5 Backpressure: default capacity 200, "on overflow the oldest bar is dropped to preserve
/// liveness and a counter is incremented").
struct BarQueue {
    capacity: usize,
    inner: parking_lot::Mutex<VecDeque<Bar>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl BarQueue {
    fn new(capacity: usize) -> Self {
        Self { capacity, inner: parking_lot::Mutex::new(VecDeque::new()), notify: Notify::new(), dropped: AtomicU64::new(0) }
    }

    fn push(&self, bar: Bar) {
        let mut guard = self.inner.lock();
        if guard.len() >= self.capacity {
            guard.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        guard.push_back(bar);
        drop(guard);
        self.notify.notify_one();
    }

    async fn pop(&self) -> Bar {
        loop {
            let notified = self.notify.notified();
            if let Some(bar) = self.inner.lock().pop_front() {
                return bar;
            }
            notified.await;
        }
    }

    fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A cheap, cloneable handle onto a running [`LiveRunner`]: query its state, ask it to stop or
/// to reconnect, and read its counters — all without owning the engine itself.
#[derive(Clone)]
pub struct LiveRunnerHandle {
    state: Arc<parking_lot::Mutex<RunnerState>>,
    queue: Arc<BarQueue>,
    stop: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    reconnect: Arc<Notify>,
    reconnect_requested: Arc<AtomicBool>,
    health_warnings: Arc<AtomicU64>,
    stopped_at: Arc<parking_lot::Mutex<Option<DateTime<Utc>>>>,
}

impl LiveRunnerHandle {
    pub fn state(&self) -> RunnerState {
        *self.state.lock()
    }

    pub fn dropped_bar_count(&self) -> u64 {
        self.queue.dropped_count()
    }

    pub fn health_warning_count(&self) -> u64 {
        self.health_warnings.load(Ordering::Relaxed)
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        *self.stopped_at.lock()
    }

    /// Cooperative shutdown (§4.9, §5): sets the stop event; the main loop observes it at its
    /// next wakeup and unwinds through `Stopping -> Stopped`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop.notify_waiters();
    }

    /// Signals that the WS transport has failed (detected by whatever out-of-scope component
    /// owns the actual socket); the main loop picks this up at its next wakeup and runs the
    /// §4.9 reconnect/backoff state machine.
    pub fn notify_disconnected(&self) {
        self.reconnect_requested.store(true, Ordering::SeqCst);
        self.reconnect.notify_waiters();
    }
}

/// C9. Owns one [`PlayEngine`] and drives it from bar-close events published onto the
/// [`RealtimeBus`]'s `Kline` topic, filtered to `(symbol, exec_tf, is_closed=true)` (§4.9).
pub struct LiveRunner<A: ExchangeAdapter> {
    engine: PlayEngine<A>,
    bus: Arc<RealtimeBus>,
    symbol: Symbol,
    exec_tf: Timeframe,
    queue: Arc<BarQueue>,
    state: Arc<parking_lot::Mutex<RunnerState>>,
    stop: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    reconnect: Arc<Notify>,
    reconnect_requested: Arc<AtomicBool>,
    reconnect_policy: ReconnectPolicy,
    reconcile_interval: Duration,
    shutdown_timeout: Duration,
    health_warnings: Arc<AtomicU64>,
    last_bar_close: parking_lot::Mutex<Option<DateTime<Utc>>>,
    stopped_at: Arc<parking_lot::Mutex<Option<DateTime<Utc>>>>,
    pause_path: Option<PathBuf>,
}

impl<A: ExchangeAdapter> LiveRunner<A> {
    const DEFAULT_QUEUE_CAPACITY: usize = 200;
    const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(300);
    const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
    const HEALTH_TICK_INTERVAL: Duration = Duration::from_secs(15);
    /// §4.9: "if no bar in 2.5 x tf_minutes, emit a health warning".
    const HEALTH_MULTIPLE: f64 = 2.5;

    pub fn new(engine: PlayEngine<A>, bus: Arc<RealtimeBus>, symbol: Symbol, exec_tf: Timeframe) -> (Self, LiveRunnerHandle) {
        let state = Arc::new(parking_lot::Mutex::new(RunnerState::Stopped));
        let queue = Arc::new(BarQueue::new(Self::DEFAULT_QUEUE_CAPACITY));
        let stop = Arc::new(Notify::new());
        let stopped = Arc::new(AtomicBool::new(false));
        let reconnect = Arc::new(Notify::new());
        let reconnect_requested = Arc::new(AtomicBool::new(false));
        let health_warnings = Arc::new(AtomicU64::new(0));
        let stopped_at = Arc::new(parking_lot::Mutex::new(None));

        let handle = LiveRunnerHandle {
            state: state.clone(),
            queue: queue.clone(),
            stop: stop.clone(),
            stopped: stopped.clone(),
            reconnect: reconnect.clone(),
            reconnect_requested: reconnect_requested.clone(),
            health_warnings: health_warnings.clone(),
            stopped_at: stopped_at.clone(),
        };

        let runner = Self {
            engine,
            bus,
            symbol,
            exec_tf,
            queue,
            state,
            stop,
            stopped,
            reconnect,
            reconnect_requested,
            reconnect_policy: ReconnectPolicy::default(),
            reconcile_interval: Self::DEFAULT_RECONCILE_INTERVAL,
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
            health_warnings,
            last_bar_close: parking_lot::Mutex::new(None),
            stopped_at,
            pause_path: None,
        };
        (runner, handle)
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = policy;
        self
    }

    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// §4.10 pause IPC: when set, the main loop checks for this marker file's presence before
    /// acting on every entry signal (existing positions are never affected).
    pub fn with_pause_path(mut self, path: PathBuf) -> Self {
        self.pause_path = Some(path);
        self
    }

    fn is_paused(&self) -> bool {
        self.pause_path.as_ref().is_some_and(|path| path.exists())
    }

    fn subscribe(&self) {
        let queue = self.queue.clone();
        let symbol = self.symbol.clone();
        let exec_tf = self.exec_tf;
        self.bus.subscribe(
            Topic::Kline,
            Arc::new(move |event| {
                if let BusEvent::Kline { symbol: event_symbol, tf, bar, is_closed } = event {
                    if *is_closed && *event_symbol == symbol && *tf == exec_tf {
                        queue.push(bar.clone());
                    }
                }
            }),
        );
    }

    /// Consumes the runner and drives it to completion: connects, subscribes, runs the main
    /// loop until told to stop (or until the reconnect state machine gives up), then disconnects
    /// (§4.9 lifecycle). Intended to be handed to `tokio::spawn`.
    pub async fn run(mut self) -> Result<(), PlaycoreError> {
        *self.state.lock() = RunnerState::Starting;
        if let Err(error) = self.engine.adapter().connect().await {
            *self.state.lock() = RunnerState::Error;
            return Err(PlaycoreError::Internal(error.to_string()));
        }
        // Startup position sync (§4.9): a cold read so the first bar's reconciliation isn't the
        // first time this process has ever asked the adapter about its position.
        if let Err(error) = self.engine.adapter().get_position(&self.symbol).await {
            warn!(%error, "startup position sync failed");
        }
        self.subscribe();
        *self.state.lock() = RunnerState::Running;
        info!(symbol = %self.symbol, tf = %self.exec_tf, "live runner started");

        let health_deadline = Duration::from_secs_f64(self.exec_tf.minutes() as f64 * 60.0 * Self::HEALTH_MULTIPLE);
        let mut health_tick = tokio::time::interval(Self::HEALTH_TICK_INTERVAL);
        let mut reconcile_tick = tokio::time::interval(self.reconcile_interval);

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = self.stop.notified() => break,
                _ = self.reconnect.notified() => {
                    if self.reconnect_requested.swap(false, Ordering::SeqCst) && !self.reconnect().await {
                        break;
                    }
                }
                bar = self.queue.pop() => {
                    if let Err(error) = self.handle_bar(bar).await {
                        warn!(%error, "error processing bar");
                    }
                }
                _ = health_tick.tick() => self.check_health(health_deadline),
                _ = reconcile_tick.tick() => self.reconcile().await,
            }
        }

        *self.state.lock() = RunnerState::Stopping;
        let _ = tokio::time::timeout(self.shutdown_timeout, self.engine.adapter().disconnect()).await;
        *self.stopped_at.lock() = Some(Utc::now());
        if *self.state.lock() != RunnerState::Error {
            *self.state.lock() = RunnerState::Stopped;
        }
        info!(symbol = %self.symbol, "live runner stopped");
        Ok(())
    }

    async fn handle_bar(&mut self, bar: Bar) -> Result<(), PlaycoreError> {
        {
            let mut last = self.last_bar_close.lock();
            if let Some(previous) = *last {
                if bar.ts_close <= previous {
                    warn!(ts_close = %bar.ts_close, "discarding out-of-order bar");
                    return Ok(());
                }
            }
            *last = Some(bar.ts_close);
        }

        let signal = self.engine.process_bar(bar, self.exec_tf).await?;
        if let Some(signal) = signal {
            if !signal.is_closing() && self.is_paused() {
                debug!(symbol = %self.symbol, "entry signal suppressed: instance is paused");
            } else {
                self.engine.execute_signal(&signal).await?;
            }
        }
        Ok(())
    }

    fn check_health(&self, deadline: Duration) {
        let Some(last_ts) = *self.last_bar_close.lock() else { return };
        let elapsed = Utc::now().signed_duration_since(last_ts);
        if elapsed.to_std().map(|d| d > deadline).unwrap_or(false) {
            self.health_warnings.fetch_add(1, Ordering::Relaxed);
            warn!(symbol = %self.symbol, elapsed_secs = elapsed.num_seconds(), "no bar received within the health window");
        }
    }

    /// Periodic REST reconciliation (§4.9, default every 5 minutes): sweeps stale pending
    /// orders and re-reads the adapter's position, logging any drift for an operator to notice.
    async fn reconcile(&self) {
        self.engine.executor().cleanup_old_pending_orders(Utc::now());
        match self.engine.adapter().get_position(&self.symbol).await {
            Ok(position) => debug!(symbol = %self.symbol, ?position, "reconciliation snapshot"),
            Err(error) => warn!(symbol = %self.symbol, %error, "reconciliation failed to fetch position"),
        }
    }

    /// §4.9 reconnect: exponential backoff from `base_delay` to `max_delay`, resetting the
    /// attempt counter on success; after `max_attempts`, transitions to `Error` and stops.
    /// Returns `false` once the runner should give up entirely.
    async fn reconnect(&self) -> bool {
        *self.state.lock() = RunnerState::Reconnecting;
        let mut delay = self.reconnect_policy.base_delay;
        for attempt in 1..=self.reconnect_policy.max_attempts {
            let _ = self.engine.adapter().disconnect().await;
            match self.engine.adapter().connect().await {
                Ok(()) => {
                    info!(attempt, "reconnect succeeded");
                    *self.state.lock() = RunnerState::Running;
                    return true;
                }
                Err(error) => {
                    warn!(attempt, %error, "reconnect attempt failed");
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.reconnect_policy.max_delay);
                }
            }
        }
        warn!("reconnect attempts exhausted, transitioning to ERROR");
        *self.state.lock() = RunnerState::Error;
        self.stopped.store(true, Ordering::SeqCst);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineMode, PlayEngine};
    use crate::journal::Journal;
    use crate::play::Play;
    use async_trait::async_trait;
    use playcore_execution::{ExecutionError, OrderExecutor, SimulatedExchangeAdapter, TradingMode};
    use playcore_instrument::{EngineId, TfRole};
    use playcore_integration::exchange::{Balance, OrderAck, OrderRequest, Position, Ticker};
    use playcore_risk::{DailyLossTracker, GlobalRiskView, PanicState, RiskLimits, RiskManager, SizingModel};
    use playcore_snapshot::{InMemoryStateStore, StateStore};
    use playcore_strategy::{AtomNode, CompareOp, Operand, PlayRules, RuleNode};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::str::FromStr;
    use std::sync::atomic::AtomicUsize;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_leverage: dec!(5),
            max_position_pct: dec!(0.9),
            per_trade_pct: dec!(0.5),
            max_exposure_pct: dec!(0.9),
            min_trade_notional_usdt: dec!(10),
            min_balance_usdt: dec!(50),
        }
    }

    fn always_true_rule() -> RuleNode {
        RuleNode::Atom(AtomNode::Compare { lhs: Operand::Literal(1.0), op: CompareOp::Ge, rhs: Operand::Literal(0.0) })
    }

    fn ema_play() -> Play {
        Play {
            id: "ema_cross".into(),
            symbol: Symbol::from("BTCUSDT"),
            tf_roles: std::collections::HashMap::from([(Timeframe::M1, TfRole::LowTf)]),
            exec_role: TfRole::LowTf,
            warmup_target: 1,
            features_by_role: std::collections::HashMap::new(),
            structures_by_role: std::collections::HashMap::new(),
            rules: PlayRules::new(Some(always_true_rule()), None, Some(always_true_rule())),
            sizing: SizingModel::FixedUsdt { amount: dec!(100) },
            risk_limits: limits(),
            starting_equity_usdt: dec!(10_000),
            persist_state: false,
            state_save_interval: 20,
        }
    }

    fn bar(i: i64, close: &str) -> Bar {
        use chrono::TimeZone;
        Bar::new(
            Utc.timestamp_opt(i * 60, 0).unwrap(),
            Utc.timestamp_opt((i + 1) * 60, 0).unwrap(),
            Decimal::from_str(close).unwrap(),
            Decimal::from_str(close).unwrap(),
            Decimal::from_str(close).unwrap(),
            Decimal::from_str(close).unwrap(),
            Decimal::ONE,
        )
    }

    async fn simulated_engine() -> (PlayEngine<SimulatedExchangeAdapter>, Arc<SimulatedExchangeAdapter>) {
        let play = ema_play();
        let adapter = Arc::new(SimulatedExchangeAdapter::new(play.starting_equity_usdt, dec!(0)));
        adapter.set_price(&play.symbol, dec!(100));
        let panic = Arc::new(PanicState::new());
        let daily_loss = Arc::new(DailyLossTracker::new(dec!(1_000_000), chrono::Local::now()));
        let global_view = Arc::new(GlobalRiskView::new(daily_loss.clone()));
        global_view.record_ws_event(Utc::now());
        let risk = Arc::new(RiskManager::new(play.risk_limits, Some(global_view)).unwrap());
        let executor = Arc::new(OrderExecutor::new(adapter.clone(), risk, panic.clone(), TradingMode::Paper, true));
        let state_store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let engine = PlayEngine::new(
            EngineId::generate("ema_cross", "live"),
            play,
            EngineMode::Live,
            executor,
            adapter.clone(),
            panic,
            daily_loss,
            state_store,
            None::<Arc<Journal>>,
        )
        .unwrap();
        (engine, adapter)
    }

    #[test]
    fn test_bar_queue_drops_oldest_on_overflow() {
        let queue = BarQueue::new(2);
        queue.push(bar(0, "100"));
        queue.push(bar(1, "101"));
        queue.push(bar(2, "102"));
        assert_eq!(queue.dropped_count(), 1);
        let inner = queue.inner.lock();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner[0].close, dec!(101));
    }

    #[tokio::test]
    async fn test_runner_processes_bar_from_bus_and_stops_cleanly() {
        let (engine, _adapter) = simulated_engine().await;
        let bus = Arc::new(RealtimeBus::new());
        let (runner, handle) = LiveRunner::new(engine, bus.clone(), Symbol::from("BTCUSDT"), Timeframe::M1);

        let join = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.state(), RunnerState::Running);

        bus.publish(BusEvent::Kline { symbol: Symbol::from("BTCUSDT"), tf: Timeframe::M1, bar: bar(0, "100"), is_closed: true });
        tokio::time::sleep(Duration::from_millis(20)).await;

        handle.stop();
        join.await.unwrap().unwrap();
        assert_eq!(handle.state(), RunnerState::Stopped);
        assert!(handle.stopped_at().is_some());
    }

    #[tokio::test]
    async fn test_runner_ignores_klines_for_other_symbol_or_unclosed() {
        let (engine, adapter) = simulated_engine().await;
        let bus = Arc::new(RealtimeBus::new());
        let (runner, handle) = LiveRunner::new(engine, bus.clone(), Symbol::from("BTCUSDT"), Timeframe::M1);
        let join = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_millis(20)).await;

        bus.publish(BusEvent::Kline { symbol: Symbol::from("ETHUSDT"), tf: Timeframe::M1, bar: bar(0, "100"), is_closed: true });
        bus.publish(BusEvent::Kline { symbol: Symbol::from("BTCUSDT"), tf: Timeframe::M1, bar: bar(0, "100"), is_closed: false });
        tokio::time::sleep(Duration::from_millis(20)).await;

        handle.stop();
        join.await.unwrap().unwrap();
        // Neither event should have produced a position: wrong symbol / not yet closed.
        assert!(adapter.get_position(&Symbol::from("BTCUSDT")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pause_marker_suppresses_entry_but_not_exit() {
        let (engine, adapter) = simulated_engine().await;
        let bus = Arc::new(RealtimeBus::new());
        let dir = tempfile::tempdir().unwrap();
        let pause_path = dir.path().join("inst.pause");
        std::fs::write(&pause_path, b"").unwrap();

        let (runner, handle) = LiveRunner::new(engine, bus.clone(), Symbol::from("BTCUSDT"), Timeframe::M1).with_pause_path(pause_path);
        let join = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_millis(20)).await;

        bus.publish(BusEvent::Kline { symbol: Symbol::from("BTCUSDT"), tf: Timeframe::M1, bar: bar(0, "100"), is_closed: true });
        tokio::time::sleep(Duration::from_millis(20)).await;

        handle.stop();
        join.await.unwrap().unwrap();
        // The rule fired (process_bar produced a signal) but the pause marker suppressed
        // execution, so no position should have opened.
        assert!(adapter.get_position(&Symbol::from("BTCUSDT")).await.unwrap().is_none());
    }

    /// A thin wrapper adapter whose `connect` fails a configurable number of times before
    /// delegating to an inner [`SimulatedExchangeAdapter`] — exists only to exercise the
    /// reconnect/backoff state machine, which the simulated adapter's always-succeeds `connect`
    /// can't exercise on its own.
    #[derive(Debug)]
    struct FlakyConnectAdapter {
        inner: SimulatedExchangeAdapter,
        fail_connects_remaining: AtomicUsize,
    }

    #[async_trait]
    impl ExchangeAdapter for FlakyConnectAdapter {
        type Error = ExecutionError;

        async fn connect(&self) -> Result<(), Self::Error> {
            if self.fail_connects_remaining.load(Ordering::SeqCst) > 0 {
                self.fail_connects_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(ExecutionError::Api { code: -1, message: "simulated connect failure".into() });
            }
            self.inner.connect().await
        }

        async fn disconnect(&self) -> Result<(), Self::Error> {
            self.inner.disconnect().await
        }

        async fn get_balance(&self) -> Result<Balance, Self::Error> {
            self.inner.get_balance().await
        }

        async fn get_equity(&self) -> Result<Decimal, Self::Error> {
            self.inner.get_equity().await
        }

        async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker, Self::Error> {
            self.inner.get_ticker(symbol).await
        }

        async fn get_klines(&self, symbol: &Symbol, tf: Timeframe, limit: usize) -> Result<Vec<Bar>, Self::Error> {
            self.inner.get_klines(symbol, tf, limit).await
        }

        async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<OrderAck>, Self::Error> {
            self.inner.get_open_orders(symbol).await
        }

        async fn get_position(&self, symbol: &Symbol) -> Result<Option<Position>, Self::Error> {
            self.inner.get_position(symbol).await
        }

        async fn market_order(&self, request: OrderRequest) -> Result<OrderAck, Self::Error> {
            self.inner.market_order(request).await
        }

        async fn limit_order(&self, request: OrderRequest) -> Result<OrderAck, Self::Error> {
            self.inner.limit_order(request).await
        }

        async fn cancel_order(&self, symbol: &Symbol, client_order_id: &str) -> Result<(), Self::Error> {
            self.inner.cancel_order(symbol, client_order_id).await
        }

        async fn cancel_all_orders(&self, symbol: &Symbol) -> Result<(), Self::Error> {
            self.inner.cancel_all_orders(symbol).await
        }

        async fn close_position(&self, symbol: &Symbol) -> Result<(), Self::Error> {
            self.inner.close_position(symbol).await
        }

        async fn set_leverage(&self, symbol: &Symbol, leverage: u8) -> Result<(), Self::Error> {
            self.inner.set_leverage(symbol, leverage).await
        }

        async fn tick_size(&self, symbol: &Symbol) -> Result<Decimal, Self::Error> {
            self.inner.tick_size(symbol).await
        }

        async fn min_qty(&self, symbol: &Symbol) -> Result<Decimal, Self::Error> {
            self.inner.min_qty(symbol).await
        }

        async fn min_notional(&self, symbol: &Symbol) -> Result<Decimal, Self::Error> {
            self.inner.min_notional(symbol).await
        }
    }

    async fn flaky_engine(fail_connects: usize) -> PlayEngine<FlakyConnectAdapter> {
        let play = ema_play();
        let adapter = Arc::new(FlakyConnectAdapter {
            inner: SimulatedExchangeAdapter::new(play.starting_equity_usdt, dec!(0)),
            fail_connects_remaining: AtomicUsize::new(fail_connects),
        });
        adapter.inner.set_price(&play.symbol, dec!(100));
        let panic = Arc::new(PanicState::new());
        let daily_loss = Arc::new(DailyLossTracker::new(dec!(1_000_000), chrono::Local::now()));
        let global_view = Arc::new(GlobalRiskView::new(daily_loss.clone()));
        global_view.record_ws_event(Utc::now());
        let risk = Arc::new(RiskManager::new(play.risk_limits, Some(global_view)).unwrap());
        let executor = Arc::new(OrderExecutor::new(adapter.clone(), risk, panic.clone(), TradingMode::Paper, true));
        let state_store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        PlayEngine::new(
            EngineId::generate("ema_cross", "live"),
            play,
            EngineMode::Live,
            executor,
            adapter,
            panic,
            daily_loss,
            state_store,
            None::<Arc<Journal>>,
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_succeeds_after_transient_failures() {
        let engine = flaky_engine(2).await;
        let bus = Arc::new(RealtimeBus::new());
        let (runner, handle) = LiveRunner::new(engine, bus, Symbol::from("BTCUSDT"), Timeframe::M1)
            .with_reconnect_policy(ReconnectPolicy { base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(10), max_attempts: 5 });

        let join = tokio::spawn(runner.run());
        tokio::time::advance(Duration::from_millis(5)).await;
        handle.notify_disconnected();
        tokio::time::advance(Duration::from_millis(50)).await;

        assert_eq!(handle.state(), RunnerState::Running);
        handle.stop();
        join.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_exhausts_attempts_and_errors_out() {
        let engine = flaky_engine(100).await;
        let bus = Arc::new(RealtimeBus::new());
        let (runner, handle) = LiveRunner::new(engine, bus, Symbol::from("BTCUSDT"), Timeframe::M1)
            .with_reconnect_policy(ReconnectPolicy { base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2), max_attempts: 3 });

        let join = tokio::spawn(runner.run());
        tokio::time::advance(Duration::from_millis(5)).await;
        handle.notify_disconnected();
        tokio::time::advance(Duration::from_millis(50)).await;

        join.await.unwrap().unwrap();
        assert_eq!(handle.state(), RunnerState::Error);
    }
}
