use crate::error::ExecutionError;
use async_trait::async_trait;
use parking_lot::RwLock;
use playcore_instrument::{Bar, Position, Side, Symbol, Timeframe};
use playcore_integration::exchange::{Balance, ExchangeAdapter, OrderAck, OrderRequest, OrderStatus, Ticker};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The backtest/shadow half of C7 (§4.10 "C7 calls a simulated exchange; everything else is
/// identical code paths"). Market orders fill immediately against whatever price was last
/// pushed via [`SimulatedExchangeAdapter::set_price`] — the backtest stepper (C8) is
/// responsible for advancing that price bar-by-bar and for the "fills at bar n+1 open"
/// timing rule; this adapter only ever knows "the current reference price".
///
/// Limit orders are rejected outright (`ExecutionError::Api`) — the spec's backtest fill model
/// only exercises market entries with conditional TP/SL, which C8 evaluates itself rather than
/// routing through this adapter as resting limit orders.
pub struct SimulatedExchangeAdapter {
    equity_usdt: RwLock<Decimal>,
    prices: RwLock<HashMap<Symbol, Decimal>>,
    positions: RwLock<HashMap<Symbol, Position>>,
    slippage_bps: Decimal,
    next_order_id: RwLock<u64>,
}

impl SimulatedExchangeAdapter {
    pub fn new(starting_equity_usdt: Decimal, slippage_bps: Decimal) -> Self {
        Self {
            equity_usdt: RwLock::new(starting_equity_usdt),
            prices: RwLock::new(HashMap::new()),
            positions: RwLock::new(HashMap::new()),
            slippage_bps,
            next_order_id: RwLock::new(1),
        }
    }

    pub fn set_price(&self, symbol: &Symbol, price: Decimal) {
        self.prices.write().insert(symbol.clone(), price);
    }

    pub fn set_equity(&self, equity_usdt: Decimal) {
        *self.equity_usdt.write() = equity_usdt;
    }

    fn next_id(&self) -> String {
        let mut counter = self.next_order_id.write();
        let id = *counter;
        *counter += 1;
        format!("sim-{id}")
    }

    fn slipped_price(&self, reference: Decimal, side: Side) -> Decimal {
        let adjustment = reference * self.slippage_bps / Decimal::from(10_000);
        match side {
            Side::Long => reference + adjustment,
            Side::Short => reference - adjustment,
        }
    }

    /// Apply a simulated fill to the tracked position for `symbol` (§4.10: the simulated
    /// adapter owns just enough position state for C8 to read back what it just submitted).
    /// Same-side fills average into the existing position; opposite-side fills reduce it and,
    /// once `qty` exceeds the existing size, flip the remainder into the new side unless the
    /// order is `reduce_only`.
    fn apply_fill(&self, request: &OrderRequest, fill_price: Decimal) {
        let mut positions = self.positions.write();
        match positions.get(&request.symbol).cloned() {
            None => {
                if !request.reduce_only {
                    positions.insert(request.symbol.clone(), new_position(request, fill_price));
                }
            }
            Some(mut pos) if pos.side == request.side => {
                let total_qty = pos.size_qty + request.qty;
                pos.entry_price = (pos.entry_price * pos.size_qty + fill_price * request.qty) / total_qty;
                pos.size_qty = total_qty;
                pos.size_usdt = pos.size_qty * pos.entry_price;
                pos.mark_price = fill_price;
                pos.unrealized_pnl = pos.unrealized_pnl_at(fill_price);
                if let Some(sl) = request.stop_loss {
                    pos.stop_loss = Some(sl);
                }
                if let Some(tp) = request.take_profit {
                    pos.take_profit = Some(tp);
                }
                positions.insert(request.symbol.clone(), pos);
            }
            Some(pos) => {
                if request.qty >= pos.size_qty {
                    let remaining = request.qty - pos.size_qty;
                    if remaining > Decimal::ZERO && !request.reduce_only {
                        positions.insert(request.symbol.clone(), new_position(request, fill_price));
                    } else {
                        positions.remove(&request.symbol);
                    }
                } else {
                    let mut pos = pos;
                    pos.size_qty -= request.qty;
                    pos.size_usdt = pos.size_qty * pos.entry_price;
                    pos.mark_price = fill_price;
                    pos.unrealized_pnl = pos.unrealized_pnl_at(fill_price);
                    positions.insert(request.symbol.clone(), pos);
                }
            }
        }
    }
}

fn new_position(request: &OrderRequest, fill_price: Decimal) -> Position {
    Position {
        symbol: request.symbol.clone(),
        side: request.side,
        size_qty: request.qty,
        size_usdt: request.qty * fill_price,
        entry_price: fill_price,
        mark_price: fill_price,
        unrealized_pnl: Decimal::ZERO,
        leverage: Decimal::ONE,
        stop_loss: request.stop_loss,
        take_profit: request.take_profit,
        liquidation_price: None,
    }
}

#[async_trait]
impl ExchangeAdapter for SimulatedExchangeAdapter {
    type Error = ExecutionError;

    async fn connect(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn get_balance(&self) -> Result<Balance, Self::Error> {
        let equity = *self.equity_usdt.read();
        Ok(Balance { total: equity, available: equity })
    }

    async fn get_equity(&self) -> Result<Decimal, Self::Error> {
        Ok(*self.equity_usdt.read())
    }

    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker, Self::Error> {
        let price = self.reference_price(symbol)?;
        Ok(Ticker { symbol: symbol.clone(), last_price: price, mark_price: price, bid: price, ask: price })
    }

    async fn get_klines(&self, _symbol: &Symbol, _tf: Timeframe, _limit: usize) -> Result<Vec<Bar>, Self::Error> {
        Ok(Vec::new())
    }

    async fn get_open_orders(&self, _symbol: Option<&Symbol>) -> Result<Vec<OrderAck>, Self::Error> {
        Ok(Vec::new())
    }

    async fn get_position(&self, symbol: &Symbol) -> Result<Option<Position>, Self::Error> {
        let mut position = self.positions.read().get(symbol).cloned();
        if let (Some(pos), Some(&price)) = (position.as_mut(), self.prices.read().get(symbol)) {
            pos.mark_price = price;
            pos.unrealized_pnl = pos.unrealized_pnl_at(price);
        }
        Ok(position)
    }

    async fn market_order(&self, request: OrderRequest) -> Result<OrderAck, Self::Error> {
        let reference = self.reference_price(&request.symbol)?;
        let fill_price = self.slipped_price(reference, request.side);
        self.apply_fill(&request, fill_price);
        Ok(OrderAck {
            client_order_id: request.client_order_id,
            exchange_order_id: self.next_id(),
            status: OrderStatus::Filled,
        })
    }

    async fn limit_order(&self, _request: OrderRequest) -> Result<OrderAck, Self::Error> {
        Err(ExecutionError::Api { code: -1, message: "simulated adapter does not support resting limit orders".into() })
    }

    async fn cancel_order(&self, _symbol: &Symbol, _client_order_id: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn cancel_all_orders(&self, _symbol: &Symbol) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn close_position(&self, symbol: &Symbol) -> Result<(), Self::Error> {
        self.positions.write().remove(symbol);
        Ok(())
    }

    async fn set_leverage(&self, _symbol: &Symbol, _leverage: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn tick_size(&self, _symbol: &Symbol) -> Result<Decimal, Self::Error> {
        Ok(Decimal::new(1, 1))
    }

    async fn min_qty(&self, _symbol: &Symbol) -> Result<Decimal, Self::Error> {
        Ok(Decimal::new(1, 3))
    }

    async fn min_notional(&self, _symbol: &Symbol) -> Result<Decimal, Self::Error> {
        Ok(Decimal::from(5))
    }
}

impl SimulatedExchangeAdapter {
    fn reference_price(&self, symbol: &Symbol) -> Result<Decimal, ExecutionError> {
        self.prices
            .read()
            .get(symbol)
            .copied()
            .ok_or_else(|| ExecutionError::Api { code: -1, message: format!("no simulated price set for {symbol}") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn adapter() -> SimulatedExchangeAdapter {
        SimulatedExchangeAdapter::new(dec!(10_000), dec!(0))
    }

    #[tokio::test]
    async fn test_market_order_fills_immediately() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        let request = OrderRequest {
            client_order_id: "c1".into(),
            symbol: symbol.clone(),
            side: Side::Long,
            order_type: playcore_integration::exchange::OrderType::Market,
            qty: dec!(1),
            price: None,
            take_profit: None,
            stop_loss: None,
            reduce_only: false,
        };
        let ack = adapter.market_order(request).await.unwrap();
        assert_eq!(ack.status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn test_market_order_without_price_errors() {
        let adapter = adapter();
        let symbol = Symbol::from("ETHUSDT");
        let request = OrderRequest {
            client_order_id: "c1".into(),
            symbol,
            side: Side::Long,
            order_type: playcore_integration::exchange::OrderType::Market,
            qty: dec!(1),
            price: None,
            take_profit: None,
            stop_loss: None,
            reduce_only: false,
        };
        assert!(adapter.market_order(request).await.is_err());
    }

    #[tokio::test]
    async fn test_limit_order_unsupported() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        let request = OrderRequest {
            client_order_id: "c1".into(),
            symbol,
            side: Side::Long,
            order_type: playcore_integration::exchange::OrderType::Limit,
            qty: dec!(1),
            price: Some(dec!(99)),
            take_profit: None,
            stop_loss: None,
            reduce_only: false,
        };
        assert!(adapter.limit_order(request).await.is_err());
    }

    fn order(symbol: &Symbol, side: Side, qty: Decimal, reduce_only: bool) -> OrderRequest {
        OrderRequest {
            client_order_id: "c1".into(),
            symbol: symbol.clone(),
            side,
            order_type: playcore_integration::exchange::OrderType::Market,
            qty,
            price: None,
            take_profit: None,
            stop_loss: None,
            reduce_only,
        }
    }

    #[tokio::test]
    async fn test_market_order_opens_position() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        adapter.market_order(order(&symbol, Side::Long, dec!(2), false)).await.unwrap();
        let pos = adapter.get_position(&symbol).await.unwrap().unwrap();
        assert_eq!(pos.side, Side::Long);
        assert_eq!(pos.size_qty, dec!(2));
        assert_eq!(pos.entry_price, dec!(100));
    }

    #[tokio::test]
    async fn test_same_side_fill_averages_entry() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        adapter.market_order(order(&symbol, Side::Long, dec!(1), false)).await.unwrap();
        adapter.set_price(&symbol, dec!(110));
        adapter.market_order(order(&symbol, Side::Long, dec!(1), false)).await.unwrap();
        let pos = adapter.get_position(&symbol).await.unwrap().unwrap();
        assert_eq!(pos.size_qty, dec!(2));
        assert_eq!(pos.entry_price, dec!(105));
    }

    #[tokio::test]
    async fn test_opposite_side_fill_reduces_then_closes() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        adapter.market_order(order(&symbol, Side::Long, dec!(2), false)).await.unwrap();
        adapter.market_order(order(&symbol, Side::Short, dec!(1), true)).await.unwrap();
        let pos = adapter.get_position(&symbol).await.unwrap().unwrap();
        assert_eq!(pos.size_qty, dec!(1));
        adapter.market_order(order(&symbol, Side::Short, dec!(1), true)).await.unwrap();
        assert!(adapter.get_position(&symbol).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_opposite_side_fill_flips_when_not_reduce_only() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        adapter.market_order(order(&symbol, Side::Long, dec!(1), false)).await.unwrap();
        adapter.market_order(order(&symbol, Side::Short, dec!(3), false)).await.unwrap();
        let pos = adapter.get_position(&symbol).await.unwrap().unwrap();
        assert_eq!(pos.side, Side::Short);
        assert_eq!(pos.size_qty, dec!(2));
    }

    #[tokio::test]
    async fn test_close_position_clears_state() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        adapter.set_price(&symbol, dec!(100));
        adapter.market_order(order(&symbol, Side::Long, dec!(1), false)).await.unwrap();
        adapter.close_position(&symbol).await.unwrap();
        assert!(adapter.get_position(&symbol).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flat_symbol_has_no_position() {
        let adapter = adapter();
        let symbol = Symbol::from("BTCUSDT");
        assert!(adapter.get_position(&symbol).await.unwrap().is_none());
    }
}
