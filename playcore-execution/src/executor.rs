use crate::idempotency::IdempotencyCache;
use crate::pending::{PendingOrder, PendingOrders, PendingStatus, DEFAULT_PENDING_MAX_AGE};
use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use playcore_instrument::order::{ConditionalOrderType, Order, OrderType as CoreOrderType, TimeInForce};
use playcore_instrument::{Direction, Side, Signal, Symbol};
use playcore_integration::exchange::{ExchangeAdapter, OrderAck, OrderRequest, OrderType as AdapterOrderType};
use playcore_risk::{PanicState, RiskDenial, RiskManager, SizingModel};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// `TRADING_MODE` (§6): the PlayEngine's declared money-at-risk dimension, independent of the
/// engine's own backtest/demo/live/shadow run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingMode {
    Paper,
    Real,
}

/// `(mode, use_demo)` must be `(paper, true)` or `(real, false)` — any other combination fails
/// closed (§4.7 step 2, §6, §8 "Mode-mismatch block").
pub fn validate_trading_mode_consistency(mode: TradingMode, use_demo: bool) -> bool {
    matches!((mode, use_demo), (TradingMode::Paper, true) | (TradingMode::Real, false))
}

const PRICE_DEVIATION_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutorDenial {
    #[error("panic_active")]
    PanicActive,
    #[error("mode_mismatch")]
    ModeMismatch,
    #[error("price_deviation")]
    PriceDeviation,
    #[error(transparent)]
    Risk(#[from] RiskDenial),
    #[error("submit failed: {0}")]
    SubmitFailed(String),
}

impl ExecutorDenial {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorDenial::PanicActive => "panic_active",
            ExecutorDenial::ModeMismatch => "mode_mismatch",
            ExecutorDenial::PriceDeviation => "price_deviation",
            ExecutorDenial::Risk(inner) => inner.code(),
            ExecutorDenial::SubmitFailed(_) => "submit_failed",
        }
    }
}

type FillCallback = Arc<dyn Fn(&OrderAck) + Send + Sync>;

/// C7: the order executor every execution mode drives identically (§4.7). `A` is whichever
/// [`ExchangeAdapter`] backs the engine's current mode — [`crate::bybit::BybitExchangeAdapter`]
/// for demo/live, [`crate::simulated::SimulatedExchangeAdapter`] for backtest/shadow.
pub struct OrderExecutor<A: ExchangeAdapter> {
    adapter: Arc<A>,
    risk: Arc<RiskManager>,
    panic: Arc<PanicState>,
    trading_mode: TradingMode,
    use_demo: bool,
    idempotency: Mutex<IdempotencyCache>,
    pending: PendingOrders,
    fill_callbacks: Mutex<Vec<FillCallback>>,
}

impl<A: ExchangeAdapter> OrderExecutor<A> {
    pub fn new(adapter: Arc<A>, risk: Arc<RiskManager>, panic: Arc<PanicState>, trading_mode: TradingMode, use_demo: bool) -> Self {
        Self {
            adapter,
            risk,
            panic,
            trading_mode,
            use_demo,
            idempotency: Mutex::new(IdempotencyCache::new(10_000)),
            pending: PendingOrders::new(),
            fill_callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Fires in registration order, copy-under-lock then invoke-without-lock (§4.7, §5).
    pub fn register_fill_callback(&self, callback: FillCallback) {
        self.fill_callbacks.lock().push(callback);
    }

    fn fire_fill_callbacks(&self, ack: &OrderAck) {
        let callbacks = self.fill_callbacks.lock().clone();
        for callback in callbacks {
            callback(ack);
        }
    }

    /// §4.7's full flow. `equity_usdt`/`balance_usdt`/`current_exposure_usdt` are supplied by
    /// the caller (C8) from its own account/position state — this executor holds no account
    /// state of its own beyond the idempotency cache and pending-order map.
    pub async fn execute(
        &self,
        signal: &Signal,
        equity_usdt: Decimal,
        balance_usdt: Decimal,
        current_exposure_usdt: Decimal,
        now_utc: DateTime<Utc>,
        now_local: DateTime<Local>,
    ) -> Result<OrderAck, ExecutorDenial> {
        if self.panic.check_and_halt() {
            return Err(ExecutorDenial::PanicActive);
        }
        if !validate_trading_mode_consistency(self.trading_mode, self.use_demo) {
            return Err(ExecutorDenial::ModeMismatch);
        }

        if signal.is_closing() {
            self.risk.check_close(now_utc, now_local)?;
            return self.submit_close(&signal.symbol).await;
        }

        let capped_notional = self
            .risk
            .check_entry(&SizingModel::FixedUsdt { amount: signal.size_usdt }, equity_usdt, balance_usdt, current_exposure_usdt, now_utc, now_local)?;

        let ticker = self
            .adapter
            .get_ticker(&signal.symbol)
            .await
            .map_err(|e| ExecutorDenial::SubmitFailed(e.to_string()))?;
        let last_price = ticker.last_price;
        if last_price <= Decimal::ZERO {
            return Err(ExecutorDenial::PriceDeviation);
        }
        if let Some(reference) = signal.reference_price {
            if reference > Decimal::ZERO {
                let deviation = (last_price - reference).abs() / reference;
                if deviation > PRICE_DEVIATION_THRESHOLD {
                    return Err(ExecutorDenial::PriceDeviation);
                }
            }
        }

        let side = match signal.direction {
            Direction::Long => Side::Long,
            Direction::Short => Side::Short,
            Direction::Flat => unreachable!("closing signals return earlier"),
        };

        let order = Order {
            symbol: signal.symbol.clone(),
            side,
            size_usdt: capped_notional,
            order_type: CoreOrderType::Market,
            limit_price: None,
            tif: TimeInForce::ImmediateOrCancel,
            stop_loss: parse_metadata_decimal(signal, "stop_loss"),
            take_profit: parse_metadata_decimal(signal, "take_profit"),
            tp_order_type: ConditionalOrderType::Market,
            sl_order_type: ConditionalOrderType::Market,
            client_order_id: Some(format!("{}-{}", signal.strategy, now_utc.timestamp_millis())),
            metadata: signal.metadata.clone(),
        };

        self.submit(order, last_price).await
    }

    async fn submit_close(&self, symbol: &Symbol) -> Result<OrderAck, ExecutorDenial> {
        self.adapter.close_position(symbol).await.map_err(|e| ExecutorDenial::SubmitFailed(e.to_string()))?;
        Ok(OrderAck {
            client_order_id: format!("close-{}", Utc::now().timestamp_millis()),
            exchange_order_id: "close".to_string(),
            status: playcore_integration::exchange::OrderStatus::Filled,
        })
    }

    async fn submit(&self, order: Order, last_price: Decimal) -> Result<OrderAck, ExecutorDenial> {
        let qty = order.size_usdt / last_price;
        let client_order_id = order.client_order_id.clone().unwrap_or_default();
        let request = OrderRequest {
            client_order_id: client_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: match order.order_type {
                CoreOrderType::Market => AdapterOrderType::Market,
                CoreOrderType::Limit => AdapterOrderType::Limit,
            },
            qty,
            price: order.limit_price,
            take_profit: order.take_profit,
            stop_loss: order.stop_loss,
            reduce_only: false,
        };

        self.pending.register(PendingOrder {
            order_id: client_order_id.clone(),
            client_order_id: client_order_id.clone(),
            status: PendingStatus::New,
            filled_price: None,
            submitted_at: Utc::now(),
        });

        let result = match order.order_type {
            CoreOrderType::Market => self.adapter.market_order(request).await,
            CoreOrderType::Limit => self.adapter.limit_order(request).await,
        };

        let ack = match result {
            Ok(ack) => ack,
            Err(error) => {
                warn!(%error, "order submit failed");
                self.pending.apply_update(&client_order_id, PendingStatus::Rejected, None);
                return Err(ExecutorDenial::SubmitFailed(error.to_string()));
            }
        };

        if matches!(order.order_type, CoreOrderType::Market) {
            let is_new = self.idempotency.lock().insert_if_new(ack.exchange_order_id.clone());
            if is_new {
                self.pending.apply_update(&client_order_id, PendingStatus::Filled, Some(last_price));
                self.fire_fill_callbacks(&ack);
            }
        } else {
            info!(order_id = %ack.exchange_order_id, "limit order resting, awaiting WS fill");
        }

        Ok(ack)
    }

    /// Applied by the realtime bus's order-update/execution callback (§4.7). Fires fill
    /// callbacks when the update resolves the order to a terminal state.
    pub fn apply_ws_update(&self, order_id: &str, status: PendingStatus, filled_price: Option<Decimal>) {
        if let Some(resolved) = self.pending.apply_update(order_id, status, filled_price) {
            if status.is_terminal() && status == PendingStatus::Filled {
                let is_new = self.idempotency.lock().insert_if_new(order_id.to_string());
                if is_new {
                    self.fire_fill_callbacks(&OrderAck {
                        client_order_id: resolved.client_order_id,
                        exchange_order_id: resolved.order_id,
                        status: playcore_integration::exchange::OrderStatus::Filled,
                    });
                }
            }
        }
    }

    pub fn cleanup_old_pending_orders(&self, now: DateTime<Utc>) {
        self.pending.cleanup_old(now, DEFAULT_PENDING_MAX_AGE);
    }

    /// A point-in-time copy of every order this executor is still tracking, for the engine's
    /// checkpoint (§3 Engine state `pending_orders[]`).
    pub fn pending_snapshot(&self) -> Vec<PendingOrder> {
        self.pending.snapshot()
    }

    /// §4.7/§5: awaits a WS-confirmed fill up to `timeout`, polling every `poll` interval; on
    /// timeout, falls back once to a REST open-orders query to resolve the order's status.
    pub async fn wait_for_fill(&self, order_id: &str, timeout: Duration, poll: Duration) -> Option<PendingOrder> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.pending.get(order_id) {
                Some(order) if order.status.is_terminal() => return Some(order),
                None => return None,
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(poll).await;
        }

        if let Ok(open_orders) = self.adapter.get_open_orders(None).await {
            if !open_orders.iter().any(|ack| ack.exchange_order_id == order_id) {
                self.pending.apply_update(order_id, PendingStatus::Filled, None);
            }
        }
        self.pending.get(order_id)
    }
}

fn parse_metadata_decimal(signal: &Signal, key: &str) -> Option<Decimal> {
    signal.metadata.get(key).and_then(|raw| raw.parse::<Decimal>().ok())
}
