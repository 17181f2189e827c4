use playcore_integration::protocol::http::rest::RestRequest;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `GET /v5/market/kline` — public, unauthenticated.
#[derive(Debug, Clone, Serialize)]
pub struct GetKlineParams {
    pub category: &'static str,
    pub symbol: String,
    pub interval: String,
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlineResponse {
    pub result: KlineResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlineResult {
    pub list: Vec<[String; 7]>,
}

pub struct GetKline(pub GetKlineParams);

impl RestRequest for GetKline {
    type Response = KlineResponse;
    type QueryParams = GetKlineParams;
    type Body = ();

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/market/kline".into()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}

/// `GET /v5/market/tickers` — public, unauthenticated.
#[derive(Debug, Clone, Serialize)]
pub struct GetTickerParams {
    pub category: &'static str,
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerResponse {
    pub result: TickerResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerResult {
    pub list: Vec<TickerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerEntry {
    #[serde(rename = "lastPrice")]
    pub last_price: Decimal,
    #[serde(rename = "markPrice")]
    pub mark_price: Decimal,
    #[serde(rename = "bid1Price")]
    pub bid_price: Decimal,
    #[serde(rename = "ask1Price")]
    pub ask_price: Decimal,
}

pub struct GetTicker(pub GetTickerParams);

impl RestRequest for GetTicker {
    type Response = TickerResponse;
    type QueryParams = GetTickerParams;
    type Body = ();

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/market/tickers".into()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}

/// `GET /v5/account/wallet-balance` — authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct GetWalletBalanceParams {
    #[serde(rename = "accountType")]
    pub account_type: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResponse {
    pub result: WalletBalanceResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResult {
    pub list: Vec<WalletBalanceAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceAccount {
    #[serde(rename = "totalEquity")]
    pub total_equity: Decimal,
    #[serde(rename = "totalAvailableBalance")]
    pub total_available_balance: Decimal,
}

pub struct GetWalletBalance(pub GetWalletBalanceParams);

impl RestRequest for GetWalletBalance {
    type Response = WalletBalanceResponse;
    type QueryParams = GetWalletBalanceParams;
    type Body = ();

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/account/wallet-balance".into()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}

/// `POST /v5/order/create` — authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderBody {
    pub category: &'static str,
    pub symbol: String,
    pub side: &'static str,
    #[serde(rename = "orderType")]
    pub order_type: &'static str,
    pub qty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(rename = "timeInForce")]
    pub time_in_force: &'static str,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
    #[serde(rename = "reduceOnly", skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<bool>,
    #[serde(rename = "takeProfit", skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<String>,
    #[serde(rename = "stopLoss", skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderResponse {
    pub result: PlaceOrderResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderResult {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
}

pub struct PlaceOrder(pub PlaceOrderBody);

impl RestRequest for PlaceOrder {
    type Response = PlaceOrderResponse;
    type QueryParams = ();
    type Body = PlaceOrderBody;

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/order/create".into()
    }

    fn method() -> Method {
        Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.0)
    }
}

/// `POST /v5/order/cancel` — authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderBody {
    pub category: &'static str,
    pub symbol: String,
    #[serde(rename = "orderLinkId", skip_serializing_if = "Option::is_none")]
    pub order_link_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderResponse {
    pub result: serde_json::Value,
}

pub struct CancelOrder(pub CancelOrderBody);

impl RestRequest for CancelOrder {
    type Response = CancelOrderResponse;
    type QueryParams = ();
    type Body = CancelOrderBody;

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/order/cancel".into()
    }

    fn method() -> Method {
        Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.0)
    }
}

/// `POST /v5/order/cancel-all` — authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct CancelAllOrdersBody {
    pub category: &'static str,
    pub symbol: String,
}

pub struct CancelAllOrders(pub CancelAllOrdersBody);

impl RestRequest for CancelAllOrders {
    type Response = CancelOrderResponse;
    type QueryParams = ();
    type Body = CancelAllOrdersBody;

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/order/cancel-all".into()
    }

    fn method() -> Method {
        Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.0)
    }
}

/// `GET /v5/order/realtime` — authenticated, open orders.
#[derive(Debug, Clone, Serialize)]
pub struct GetOpenOrdersParams {
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrdersResponse {
    pub result: OpenOrdersResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrdersResult {
    pub list: Vec<OpenOrderEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrderEntry {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
    #[serde(rename = "orderStatus")]
    pub order_status: String,
}

pub struct GetOpenOrders(pub GetOpenOrdersParams);

impl RestRequest for GetOpenOrders {
    type Response = OpenOrdersResponse;
    type QueryParams = GetOpenOrdersParams;
    type Body = ();

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/order/realtime".into()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}

/// `POST /v5/position/set-leverage` — authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct SetLeverageBody {
    pub category: &'static str,
    pub symbol: String,
    #[serde(rename = "buyLeverage")]
    pub buy_leverage: String,
    #[serde(rename = "sellLeverage")]
    pub sell_leverage: String,
}

pub struct SetLeverage(pub SetLeverageBody);

impl RestRequest for SetLeverage {
    type Response = CancelOrderResponse;
    type QueryParams = ();
    type Body = SetLeverageBody;

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/position/set-leverage".into()
    }

    fn method() -> Method {
        Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.0)
    }
}

/// `GET /v5/position/list` — authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct GetPositionListParams {
    pub category: &'static str,
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionListResponse {
    pub result: PositionListResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionListResult {
    pub list: Vec<PositionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionEntry {
    pub side: String,
    pub size: Decimal,
    #[serde(rename = "positionValue")]
    pub position_value: Decimal,
    #[serde(rename = "avgPrice")]
    pub avg_price: Decimal,
    #[serde(rename = "markPrice")]
    pub mark_price: Decimal,
    #[serde(rename = "unrealisedPnl")]
    pub unrealised_pnl: Decimal,
    pub leverage: Decimal,
    #[serde(rename = "stopLoss")]
    pub stop_loss: Decimal,
    #[serde(rename = "takeProfit")]
    pub take_profit: Decimal,
    #[serde(rename = "liqPrice")]
    pub liq_price: Decimal,
}

pub struct GetPositionList(pub GetPositionListParams);

impl RestRequest for GetPositionList {
    type Response = PositionListResponse;
    type QueryParams = GetPositionListParams;
    type Body = ();

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/position/list".into()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}

/// `GET /v5/market/instruments-info` — public, used for `tick_size`/`min_qty`/`min_notional`.
#[derive(Debug, Clone, Serialize)]
pub struct GetInstrumentsInfoParams {
    pub category: &'static str,
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentsInfoResponse {
    pub result: InstrumentsInfoResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentsInfoResult {
    pub list: Vec<InstrumentInfoEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentInfoEntry {
    #[serde(rename = "lotSizeFilter")]
    pub lot_size_filter: LotSizeFilter,
    #[serde(rename = "priceFilter")]
    pub price_filter: PriceFilter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LotSizeFilter {
    #[serde(rename = "minOrderQty")]
    pub min_order_qty: Decimal,
    #[serde(rename = "minNotionalValue", default)]
    pub min_notional_value: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceFilter {
    #[serde(rename = "tickSize")]
    pub tick_size: Decimal,
}

pub struct GetInstrumentsInfo(pub GetInstrumentsInfoParams);

impl RestRequest for GetInstrumentsInfo {
    type Response = InstrumentsInfoResponse;
    type QueryParams = GetInstrumentsInfoParams;
    type Body = ();

    fn path(&self) -> std::borrow::Cow<'static, str> {
        "/v5/market/instruments-info".into()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}
