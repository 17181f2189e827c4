//! The PlayEngine (C8, §4.8): drives one closed bar through the full C2 -> C3 -> C5 -> C6 -> C7
//! sequence, identically regardless of which [`EngineMode`] is running it. `process_bar` is the
//! only place that sequence is spelled out; every other mode-specific concern (how bars arrive,
//! how orders reach a venue, how many engines run at once) lives in `runner`/`manager` and the
//! concrete [`ExchangeAdapter`] the caller wires in.

use crate::error::PlaycoreError;
use crate::journal::{Journal, JournalEvent};
use crate::play::Play;
use crate::view::ProviderView;
use chrono::{DateTime, Local, Utc};
use playcore_data::DataProvider;
use playcore_execution::OrderExecutor;
use playcore_instrument::{Bar, Direction, EngineId, Side, Signal, Timeframe};
use playcore_integration::exchange::{ExchangeAdapter, OrderAck};
use playcore_risk::{DailyLossTracker, PanicState};
use playcore_snapshot::{EngineState, PendingOrderRecord, StateStore};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The four ways a Play can be run (§2 GLOSSARY). All four drive the exact same
/// `process_bar`/`execute_signal` call sequence; only the [`ExchangeAdapter`] and whether
/// `execute_signal` actually reaches it differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Backtest,
    Demo,
    Live,
    /// Signals are generated and journaled exactly as in live/demo, but never submitted
    /// (§2 GLOSSARY "shadow").
    Shadow,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Backtest => "backtest",
            EngineMode::Demo => "demo",
            EngineMode::Live => "live",
            EngineMode::Shadow => "shadow",
        }
    }
}

/// The result of asking the engine to act on a signal `process_bar` produced.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Executed(OrderAck),
    /// Shadow mode's short-circuit: recorded in the journal, never submitted anywhere.
    Shadowed,
}

/// C8. Owns one Play's data provider, its current position snapshot, its running equity/pnl
/// ledger, and the plumbing (executor, state store, journal) every mode needs. `A` is whichever
/// [`ExchangeAdapter`] backs this engine's mode.
pub struct PlayEngine<A: ExchangeAdapter> {
    pub engine_id: EngineId,
    play: Play,
    mode: EngineMode,
    provider: DataProvider,
    executor: Arc<OrderExecutor<A>>,
    adapter: Arc<A>,
    panic: Arc<PanicState>,
    daily_loss: Arc<DailyLossTracker>,
    state_store: Arc<dyn StateStore>,
    journal: Option<Arc<Journal>>,
    position: Option<playcore_instrument::Position>,
    equity_usdt: Decimal,
    realized_pnl: Decimal,
    total_trades: u64,
    bars_processed: u64,
    last_bar_ts: Option<DateTime<Utc>>,
    last_signal_ts: Option<DateTime<Utc>>,
}

impl<A: ExchangeAdapter> PlayEngine<A> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine_id: EngineId,
        play: Play,
        mode: EngineMode,
        executor: Arc<OrderExecutor<A>>,
        adapter: Arc<A>,
        panic: Arc<PanicState>,
        daily_loss: Arc<DailyLossTracker>,
        state_store: Arc<dyn StateStore>,
        journal: Option<Arc<Journal>>,
    ) -> Result<Self, PlaycoreError> {
        play.validate()?;
        let provider = DataProvider::new(
            play.tf_roles.clone(),
            play.warmup_target,
            play.features_by_role.clone(),
            play.structures_by_role.clone(),
            play.exec_role,
        )?;
        let equity_usdt = play.starting_equity_usdt;
        Ok(Self {
            engine_id,
            play,
            mode,
            provider,
            executor,
            adapter,
            panic,
            daily_loss,
            state_store,
            journal,
            position: None,
            equity_usdt,
            realized_pnl: Decimal::ZERO,
            total_trades: 0,
            bars_processed: 0,
            last_bar_ts: None,
            last_signal_ts: None,
        })
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn equity_usdt(&self) -> Decimal {
        self.equity_usdt
    }

    pub fn position(&self) -> Option<&playcore_instrument::Position> {
        self.position.as_ref()
    }

    pub fn bars_processed(&self) -> u64 {
        self.bars_processed
    }

    pub fn play(&self) -> &Play {
        &self.play
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn executor(&self) -> &Arc<OrderExecutor<A>> {
        &self.executor
    }

    pub fn panic_state(&self) -> &Arc<PanicState> {
        &self.panic
    }

    /// Cheap top-of-loop check the live runner (C9) can use to stop feeding bars once the
    /// panic latch has tripped, rather than discovering it only when `execute_signal` denies.
    pub fn is_halted(&self) -> bool {
        self.panic.check_and_halt()
    }

    /// §4.8's numbered sequence. Returns the signal (if any) the rule evaluator produced;
    /// does not submit it. The caller decides whether/when to call [`Self::execute_signal`] —
    /// a backtest driver does so immediately, a live runner may add its own guards first.
    pub async fn process_bar(&mut self, bar: Bar, concrete_tf: Timeframe) -> Result<Option<Signal>, PlaycoreError> {
        // 1. update incremental state for all roles this bar advances.
        self.provider.on_bar_closed(bar, concrete_tf)?;
        self.last_bar_ts = Some(bar.ts_close);

        // 2. not ready yet (still warming up) -> no signal this bar.
        if !self.provider.is_ready() {
            return Ok(None);
        }

        // 3. step exchange: backtest only, since demo/live SL/TP are native exchange orders.
        if matches!(self.mode, EngineMode::Backtest) {
            self.step_backtest_stops(&bar).await?;
        }

        // 4. fetch position.
        let position = self
            .adapter
            .get_position(&self.play.symbol)
            .await
            .map_err(|error| PlaycoreError::Internal(error.to_string()))?;
        self.position = position.clone();

        // 5. evaluate entry rules if flat, else exit rules if positioned.
        let exec_role = self.play.exec_role;
        let bar_count = self.provider.bar_count(exec_role);
        let view = ProviderView(&self.provider);
        let index: i64 = -1;

        let signal = if position.is_none() {
            self.play
                .rules
                .entry_long
                .as_ref()
                .filter(|rule| rule.eval(&view, index, bar_count))
                .map(|_| self.build_signal(Direction::Long, self.play.sizing.raw_notional(self.equity_usdt)))
                .or_else(|| {
                    self.play
                        .rules
                        .entry_short
                        .as_ref()
                        .filter(|rule| rule.eval(&view, index, bar_count))
                        .map(|_| self.build_signal(Direction::Short, self.play.sizing.raw_notional(self.equity_usdt)))
                })
        } else {
            self.play
                .rules
                .exit
                .as_ref()
                .filter(|rule| rule.eval(&view, index, bar_count))
                .map(|_| self.build_signal(Direction::Flat, Decimal::ZERO))
        };

        // 6. a signal was produced: stamp last_signal_ts, journal it.
        self.bars_processed += 1;
        if let Some(signal) = &signal {
            self.last_signal_ts = Some(bar.ts_close);
            self.journal_signal(signal);
            debug!(engine_id = %self.engine_id, direction = %signal.direction, "signal produced");
        }

        // 7. periodic checkpoint.
        if self.play.persist_state && self.play.state_save_interval > 0 && self.bars_processed % self.play.state_save_interval == 0 {
            self.checkpoint().await?;
        }

        Ok(signal)
    }

    /// Acts on a signal `process_bar` returned: shadow mode short-circuits to a recorded but
    /// unexecuted result; every other mode routes through C7 (§4.7), updates the running
    /// equity/pnl ledger on a successful close, and journals the fill or the denial reason.
    pub async fn execute_signal(&mut self, signal: &Signal) -> Result<ExecutionOutcome, PlaycoreError> {
        if matches!(self.mode, EngineMode::Shadow) {
            self.journal_signal(signal);
            return Ok(ExecutionOutcome::Shadowed);
        }

        let closing_pnl = if signal.is_closing() {
            self.position.as_ref().map(|position| position.unrealized_pnl)
        } else {
            None
        };

        let ack = self.submit(signal).await?;

        if let Some(pnl) = closing_pnl {
            self.apply_realized_pnl(pnl);
            self.position = None;
        }

        Ok(ExecutionOutcome::Executed(ack))
    }

    /// Backtest-only same-bar SL/TP touch simulation (§8 Scenario 3, §9 Open Question: the
    /// stop loss is checked before the take profit, the conservative/worst-case path). Live and
    /// demo never call this: their stop-loss/take-profit are conditional orders placed with the
    /// entry and resolved exchange-side.
    async fn step_backtest_stops(&mut self, bar: &Bar) -> Result<(), PlaycoreError> {
        let Some(position) = self
            .adapter
            .get_position(&self.play.symbol)
            .await
            .map_err(|error| PlaycoreError::Internal(error.to_string()))?
        else {
            return Ok(());
        };

        let sl_hit = position.stop_loss.is_some_and(|sl| match position.side {
            Side::Long => bar.low <= sl,
            Side::Short => bar.high >= sl,
        });
        let tp_hit = position.take_profit.is_some_and(|tp| match position.side {
            Side::Long => bar.high >= tp,
            Side::Short => bar.low <= tp,
        });

        let touched = if sl_hit {
            position.stop_loss
        } else if tp_hit {
            position.take_profit
        } else {
            None
        };

        let Some(exit_price) = touched else {
            return Ok(());
        };

        let pnl = position.unrealized_pnl_at(exit_price);
        let signal = self.build_signal(Direction::Flat, Decimal::ZERO);
        self.submit(&signal).await?;
        self.apply_realized_pnl(pnl);
        self.position = None;
        info!(engine_id = %self.engine_id, %exit_price, stop_loss_hit = sl_hit, "backtest stop triggered");
        Ok(())
    }

    /// The shared low-level submit path both `execute_signal` and `step_backtest_stops` funnel
    /// through. Never touches the equity ledger itself — callers apply realized pnl using
    /// whichever exit price is correct for their caller (current mark vs. the touched SL/TP
    /// level).
    async fn submit(&mut self, signal: &Signal) -> Result<OrderAck, PlaycoreError> {
        let balance = self
            .adapter
            .get_balance()
            .await
            .map_err(|error| PlaycoreError::Internal(error.to_string()))?;
        let current_exposure = self.position.as_ref().map(|position| position.size_usdt).unwrap_or(Decimal::ZERO);
        let now_utc = Utc::now();
        let now_local = Local::now();

        match self
            .executor
            .execute(signal, self.equity_usdt, balance.available, current_exposure, now_utc, now_local)
            .await
        {
            Ok(ack) => {
                self.total_trades += 1;
                if let Some(journal) = &self.journal {
                    journal.record(JournalEvent::Fill {
                        symbol: signal.symbol.clone(),
                        side: signal.direction.to_string(),
                        qty: Decimal::ZERO,
                        price: signal.reference_price.unwrap_or(Decimal::ZERO),
                        order_id: ack.exchange_order_id.clone(),
                    });
                }
                Ok(ack)
            }
            Err(denial) => {
                if let Some(journal) = &self.journal {
                    journal.record(JournalEvent::Error { reason: denial.code().to_string(), detail: denial.to_string() });
                }
                Err(PlaycoreError::Execution(denial))
            }
        }
    }

    fn apply_realized_pnl(&mut self, pnl: Decimal) {
        self.equity_usdt += pnl;
        self.realized_pnl += pnl;
        self.daily_loss.record_pnl(pnl, Local::now());
    }

    fn build_signal(&self, direction: Direction, size_usdt: Decimal) -> Signal {
        Signal {
            symbol: self.play.symbol.clone(),
            direction,
            size_usdt,
            strategy: self.play.id.clone(),
            confidence: 1.0,
            reference_price: self.provider.get_candle_exec(-1).map(|bar| bar.close),
            metadata: HashMap::new(),
        }
    }

    fn journal_signal(&self, signal: &Signal) {
        if let Some(journal) = &self.journal {
            journal.record(JournalEvent::Signal {
                symbol: signal.symbol.clone(),
                direction: signal.direction.to_string(),
                size_usdt: signal.size_usdt,
                strategy: signal.strategy.clone(),
            });
        }
    }

    /// Serializes the engine's checkpoint through its [`StateStore`] (§3 Engine state, §4.8
    /// step 7).
    pub async fn checkpoint(&self) -> Result<(), PlaycoreError> {
        let pending_orders = self
            .executor
            .pending_snapshot()
            .into_iter()
            .map(|order| PendingOrderRecord {
                order_id: order.order_id,
                client_order_id: order.client_order_id,
                status: format!("{:?}", order.status).to_lowercase(),
                filled_price: order.filled_price,
                submitted_at: order.submitted_at,
            })
            .collect();

        let state = EngineState {
            engine_id: self.engine_id.clone(),
            play_id: self.play.id.clone(),
            mode: self.mode.as_str().to_string(),
            symbol: self.play.symbol.clone(),
            position: self.position.clone(),
            pending_orders,
            equity_usdt: self.equity_usdt,
            realized_pnl: self.realized_pnl,
            total_trades: self.total_trades,
            last_bar_ts: self.last_bar_ts,
            last_signal_ts: self.last_signal_ts,
            incremental_state_blob: None,
            metadata: HashMap::new(),
        };
        self.state_store.save(&state).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playcore_execution::{OrderExecutor, SimulatedExchangeAdapter, TradingMode};
    use playcore_instrument::{Symbol, TfRole};
    use playcore_risk::{GlobalRiskView, RiskLimits, RiskManager, SizingModel};
    use playcore_snapshot::InMemoryStateStore;
    use playcore_strategy::{AtomNode, CompareOp, Operand, PlayRules, RuleNode};
    use rust_decimal_macros::dec;
    use std::str::FromStr;

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
        RuleNode::Atom(AtomNode::Compare {
            lhs: Operand::Literal(1.0),
            op: CompareOp::Ge,
            rhs: Operand::Literal(0.0),
        })
    }

    fn ema_play() -> Play {
        Play {
            id: "ema_cross".into(),
            symbol: Symbol::from("BTCUSDT"),
            tf_roles: std::collections::HashMap::from([(playcore_instrument::Timeframe::M1, TfRole::LowTf)]),
            exec_role: TfRole::LowTf,
            warmup_target: 2,
            features_by_role: std::collections::HashMap::new(),
            structures_by_role: std::collections::HashMap::new(),
            rules: PlayRules::new(Some(always_true_rule()), None, Some(always_true_rule())),
            sizing: SizingModel::FixedUsdt { amount: dec!(100) },
            risk_limits: limits(),
            starting_equity_usdt: dec!(10_000),
            persist_state: true,
            state_save_interval: 2,
        }
    }

    fn bar(i: i64, open: &str, high: &str, low: &str, close: &str) -> Bar {
        use chrono::TimeZone;
        Bar::new(
            Utc.timestamp_opt(i * 60, 0).unwrap(),
            Utc.timestamp_opt((i + 1) * 60, 0).unwrap(),
            Decimal::from_str(open).unwrap(),
            Decimal::from_str(high).unwrap(),
            Decimal::from_str(low).unwrap(),
            Decimal::from_str(close).unwrap(),
            Decimal::ONE,
        )
    }

    async fn backtest_engine() -> (PlayEngine<SimulatedExchangeAdapter>, Arc<SimulatedExchangeAdapter>) {
        let play = ema_play();
        let adapter = Arc::new(SimulatedExchangeAdapter::new(play.starting_equity_usdt, dec!(0)));
        let panic = Arc::new(PanicState::new());
        let daily_loss = Arc::new(DailyLossTracker::new(dec!(1_000_000), Local::now()));
        let global_view = Arc::new(GlobalRiskView::new(daily_loss.clone()));
        global_view.record_ws_event(Utc::now());
        let risk = Arc::new(RiskManager::new(play.risk_limits, Some(global_view)).unwrap());
        let executor = Arc::new(OrderExecutor::new(adapter.clone(), risk, panic.clone(), TradingMode::Paper, true));
        let state_store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let engine = PlayEngine::new(
            EngineId::generate("ema_cross", "backtest"),
            play,
            EngineMode::Backtest,
            executor,
            adapter.clone(),
            panic,
            daily_loss,
            state_store,
            None,
        )
        .unwrap();
        (engine, adapter)
    }

    #[tokio::test]
    async fn test_not_ready_returns_no_signal() {
        let (mut engine, adapter) = backtest_engine().await;
        adapter.set_price(&Symbol::from("BTCUSDT"), dec!(100));
        let signal = engine
            .process_bar(bar(0, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1)
            .await
            .unwrap();
        assert!(signal.is_none());
    }

    #[tokio::test]
    async fn test_entry_signal_produced_once_warmed_and_flat() {
        let (mut engine, adapter) = backtest_engine().await;
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        engine.process_bar(bar(0, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1).await.unwrap();
        let signal = engine
            .process_bar(bar(1, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1)
            .await
            .unwrap()
            .expect("warmed up and flat: entry rule should fire");
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.size_usdt, dec!(100));
    }

    #[tokio::test]
    async fn test_execute_signal_opens_and_exit_rule_closes_with_pnl() {
        let (mut engine, adapter) = backtest_engine().await;
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        engine.process_bar(bar(0, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1).await.unwrap();
        let signal = engine
            .process_bar(bar(1, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1)
            .await
            .unwrap()
            .unwrap();
        engine.execute_signal(&signal).await.unwrap();
        assert!(engine.position().is_some());

        adapter.set_price(&symbol, dec!(110));
        let exit_signal = engine
            .process_bar(bar(2, "110", "111", "109", "110"), playcore_instrument::Timeframe::M1)
            .await
            .unwrap()
            .expect("positioned: exit rule should fire");
        assert!(exit_signal.is_closing());
        engine.execute_signal(&exit_signal).await.unwrap();
        assert!(engine.position().is_none());
        assert!(engine.equity_usdt() > dec!(10_000));
    }

    #[tokio::test]
    async fn test_shadow_mode_never_submits() {
        let (mut engine, adapter) = backtest_engine().await;
        engine_set_mode_shadow(&mut engine);
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        engine.process_bar(bar(0, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1).await.unwrap();
        let signal = engine
            .process_bar(bar(1, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1)
            .await
            .unwrap()
            .unwrap();
        let outcome = engine.execute_signal(&signal).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Shadowed));
        assert!(adapter.get_position(&symbol).await.unwrap().is_none());
    }

    fn engine_set_mode_shadow(engine: &mut PlayEngine<SimulatedExchangeAdapter>) {
        // Test-only override: EngineMode has no public setter by design (§4.8 a mode is fixed
        // at construction), so tests that need shadow mode reach in via this helper.
        engine.mode = EngineMode::Shadow;
    }

    #[tokio::test]
    async fn test_backtest_stop_loss_closes_position_automatically() {
        let (mut engine, adapter) = backtest_engine().await;
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        engine.process_bar(bar(0, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1).await.unwrap();
        engine.process_bar(bar(1, "100", "101", "99", "100"), playcore_instrument::Timeframe::M1).await.unwrap();

        // Enter directly through the executor (bypassing the rule evaluator) so the fill
        // carries a stop_loss, the way a real entry signal's metadata would.
        let mut entry = Signal {
            symbol: symbol.clone(),
            direction: Direction::Long,
            size_usdt: dec!(100),
            strategy: "ema_cross".into(),
            confidence: 1.0,
            reference_price: None,
            metadata: HashMap::new(),
        };
        entry.metadata.insert("stop_loss".into(), "90".to_string());
        engine.submit(&entry).await.unwrap();
        assert!(adapter.get_position(&symbol).await.unwrap().is_some());

        // Bar 2's low pierces the stop: step_backtest_stops should close it before rules run.
        adapter.set_price(&symbol, dec!(80));
        engine.process_bar(bar(2, "95", "96", "80", "85"), playcore_instrument::Timeframe::M1).await.unwrap();
        assert!(adapter.get_position(&symbol).await.unwrap().is_none());
        assert!(engine.equity_usdt() < dec!(10_000));
    }
}
