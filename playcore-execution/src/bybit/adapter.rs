use crate::bybit::parser::BybitHttpParser;
use crate::bybit::requests::*;
use crate::error::ExecutionError;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use playcore_instrument::{Bar, Position, Side, Symbol, Timeframe};
use playcore_integration::exchange::{Balance, ExchangeAdapter, OrderAck, OrderRequest, OrderStatus, OrderType, Ticker};
use playcore_integration::protocol::http::private::BybitV5Signer;
use playcore_integration::protocol::http::rest::RestClient;
use playcore_integration::rate_limit::RateLimiter;
use rust_decimal::Decimal;
use std::time::Duration;
use url::Url;

const CATEGORY: &str = "linear";
const ACCOUNT_TYPE: &str = "UNIFIED";

/// Which Bybit v5 REST/WS host this adapter talks to — the execution-side half of C1's
/// data/demo isolation (§4.1, §6). Live and demo credentials and base URLs are never mixed
/// within one adapter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BybitEnvironment {
    Live,
    Demo,
}

impl BybitEnvironment {
    pub fn base_url(self) -> &'static str {
        match self {
            BybitEnvironment::Live => "https://api.bybit.com",
            BybitEnvironment::Demo => "https://api-demo.bybit.com",
        }
    }
}

/// Bybit v5 implementation of [`ExchangeAdapter`], driving USDT perpetuals (`category=linear`)
/// through the signed REST surface (§6). `connect`/`disconnect` are no-ops here since this
/// adapter is purely REST — the realtime bus (`playcore-data::bus`) owns the WS connection
/// lifecycle separately.
pub struct BybitExchangeAdapter {
    client: RestClient<BybitV5Signer, BybitHttpParser>,
}

impl BybitExchangeAdapter {
    pub fn new(environment: BybitEnvironment, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        let base_url = Url::parse(environment.base_url()).expect("static bybit base url is valid");
        let signer = BybitV5Signer::new(api_key, api_secret);
        let limiter = RateLimiter::new(10, Duration::from_secs(1));
        Self { client: RestClient::new(base_url, signer, BybitHttpParser, limiter) }
    }

    fn side_str(side: Side) -> &'static str {
        match side {
            Side::Long => "Buy",
            Side::Short => "Sell",
        }
    }

    async fn submit_order(&self, request: OrderRequest, order_type: &'static str) -> Result<OrderAck, ExecutionError> {
        let body = PlaceOrderBody {
            category: CATEGORY,
            symbol: request.symbol.to_string(),
            side: Self::side_str(request.side),
            order_type,
            qty: request.qty.to_string(),
            price: request.price.map(|p| p.to_string()),
            time_in_force: if order_type == "Market" { "IOC" } else { "GTC" },
            order_link_id: request.client_order_id.clone(),
            reduce_only: request.reduce_only.then_some(true),
            take_profit: request.take_profit.map(|p| p.to_string()),
            stop_loss: request.stop_loss.map(|p| p.to_string()),
        };
        let response = self.client.execute(PlaceOrder(body)).await?;
        Ok(OrderAck {
            client_order_id: response.result.order_link_id,
            exchange_order_id: response.result.order_id,
            status: OrderStatus::New,
        })
    }
}

#[async_trait]
impl ExchangeAdapter for BybitExchangeAdapter {
    type Error = ExecutionError;

    async fn connect(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn get_balance(&self) -> Result<Balance, Self::Error> {
        let params = GetWalletBalanceParams { account_type: ACCOUNT_TYPE };
        let response = self.client.execute(GetWalletBalance(params)).await?;
        let account = response.result.list.into_iter().next().ok_or(ExecutionError::Api {
            code: -1,
            message: "wallet-balance response had no accounts".into(),
        })?;
        Ok(Balance { total: account.total_equity, available: account.total_available_balance })
    }

    async fn get_equity(&self) -> Result<Decimal, Self::Error> {
        Ok(self.get_balance().await?.total)
    }

    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker, Self::Error> {
        let params = GetTickerParams { category: CATEGORY, symbol: symbol.to_string() };
        let response = self.client.execute(GetTicker(params)).await?;
        let entry = response.result.list.into_iter().next().ok_or(ExecutionError::Api {
            code: -1,
            message: format!("no ticker returned for {symbol}"),
        })?;
        Ok(Ticker {
            symbol: symbol.clone(),
            last_price: entry.last_price,
            mark_price: entry.mark_price,
            bid: entry.bid_price,
            ask: entry.ask_price,
        })
    }

    async fn get_klines(&self, symbol: &Symbol, tf: Timeframe, limit: usize) -> Result<Vec<Bar>, Self::Error> {
        let params = GetKlineParams {
            category: CATEGORY,
            symbol: symbol.to_string(),
            interval: bybit_interval(tf),
            limit: limit as u32,
        };
        let response = self.client.execute(GetKline(params)).await?;
        Ok(response.result.list.into_iter().filter_map(|row| row_to_bar(tf, &row)).collect())
    }

    async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<OrderAck>, Self::Error> {
        let params = GetOpenOrdersParams { category: CATEGORY, symbol: symbol.map(|s| s.to_string()) };
        let response = self.client.execute(GetOpenOrders(params)).await?;
        Ok(response
            .result
            .list
            .into_iter()
            .map(|entry| OrderAck {
                client_order_id: entry.order_link_id,
                exchange_order_id: entry.order_id,
                status: parse_order_status(&entry.order_status),
            })
            .collect())
    }

    async fn get_position(&self, symbol: &Symbol) -> Result<Option<Position>, Self::Error> {
        let params = GetPositionListParams { category: CATEGORY, symbol: symbol.to_string() };
        let response = self.client.execute(GetPositionList(params)).await?;
        let Some(entry) = response.result.list.into_iter().find(|e| e.size > Decimal::ZERO) else {
            return Ok(None);
        };
        let side = match entry.side.as_str() {
            "Buy" => Side::Long,
            _ => Side::Short,
        };
        Ok(Some(Position {
            symbol: symbol.clone(),
            side,
            size_qty: entry.size,
            size_usdt: entry.position_value,
            entry_price: entry.avg_price,
            mark_price: entry.mark_price,
            unrealized_pnl: entry.unrealised_pnl,
            leverage: entry.leverage,
            stop_loss: (entry.stop_loss > Decimal::ZERO).then_some(entry.stop_loss),
            take_profit: (entry.take_profit > Decimal::ZERO).then_some(entry.take_profit),
            liquidation_price: (entry.liq_price > Decimal::ZERO).then_some(entry.liq_price),
        }))
    }

    async fn market_order(&self, request: OrderRequest) -> Result<OrderAck, Self::Error> {
        self.submit_order(request, "Market").await
    }

    async fn limit_order(&self, request: OrderRequest) -> Result<OrderAck, Self::Error> {
        self.submit_order(request, "Limit").await
    }

    async fn cancel_order(&self, symbol: &Symbol, client_order_id: &str) -> Result<(), Self::Error> {
        let body = CancelOrderBody {
            category: CATEGORY,
            symbol: symbol.to_string(),
            order_link_id: Some(client_order_id.to_string()),
        };
        self.client.execute(CancelOrder(body)).await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, symbol: &Symbol) -> Result<(), Self::Error> {
        let body = CancelAllOrdersBody { category: CATEGORY, symbol: symbol.to_string() };
        self.client.execute(CancelAllOrders(body)).await?;
        Ok(())
    }

    async fn close_position(&self, symbol: &Symbol) -> Result<(), Self::Error> {
        self.cancel_all_orders(symbol).await
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u8) -> Result<(), Self::Error> {
        let body = SetLeverageBody {
            category: CATEGORY,
            symbol: symbol.to_string(),
            buy_leverage: leverage.to_string(),
            sell_leverage: leverage.to_string(),
        };
        self.client.execute(SetLeverage(body)).await?;
        Ok(())
    }

    async fn tick_size(&self, symbol: &Symbol) -> Result<Decimal, Self::Error> {
        Ok(self.instruments_info(symbol).await?.price_filter.tick_size)
    }

    async fn min_qty(&self, symbol: &Symbol) -> Result<Decimal, Self::Error> {
        Ok(self.instruments_info(symbol).await?.lot_size_filter.min_order_qty)
    }

    async fn min_notional(&self, symbol: &Symbol) -> Result<Decimal, Self::Error> {
        Ok(self.instruments_info(symbol).await?.lot_size_filter.min_notional_value.unwrap_or(Decimal::ZERO))
    }
}

impl BybitExchangeAdapter {
    async fn instruments_info(&self, symbol: &Symbol) -> Result<InstrumentInfoEntry, ExecutionError> {
        let params = GetInstrumentsInfoParams { category: CATEGORY, symbol: symbol.to_string() };
        let response = self.client.execute(GetInstrumentsInfo(params)).await?;
        response.result.list.into_iter().next().ok_or(ExecutionError::Api {
            code: -1,
            message: format!("no instrument info returned for {symbol}"),
        })
    }
}

fn parse_order_status(raw: &str) -> OrderStatus {
    match raw {
        "New" | "Created" | "Untriggered" => OrderStatus::New,
        "PartiallyFilled" => OrderStatus::PartiallyFilled,
        "Filled" => OrderStatus::Filled,
        "Cancelled" | "Deactivated" => OrderStatus::Cancelled,
        "Rejected" => OrderStatus::Rejected,
        _ => OrderStatus::New,
    }
}

/// Bybit v5 kline intervals: minute counts for sub-day timeframes, else `D`/`W`.
fn bybit_interval(tf: Timeframe) -> String {
    match tf {
        Timeframe::D => "D".to_string(),
        Timeframe::W => "W".to_string(),
        other => other.minutes().to_string(),
    }
}

fn row_to_bar(tf: Timeframe, row: &[String; 7]) -> Option<Bar> {
    let open_time_ms: i64 = row[0].parse().ok()?;
    let ts_open = chrono::DateTime::from_timestamp_millis(open_time_ms)?;
    let ts_close = ts_open + ChronoDuration::minutes(tf.minutes() as i64);
    Some(Bar::new(
        ts_open,
        ts_close,
        row[1].parse().ok()?,
        row[2].parse().ok()?,
        row[3].parse().ok()?,
        row[4].parse().ok()?,
        row[5].parse().ok()?,
    ))
}
