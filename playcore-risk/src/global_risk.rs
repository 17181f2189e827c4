use crate::daily_loss::DailyLossTracker;
use chrono::{DateTime, Local, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Account-level facts the global risk view consults before admitting a new entry (§4.6). These
/// come from the realtime bus's wallet/position streams under a cache TTL, not a synchronous
/// REST call — the view only ever reads whatever was last published.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountMarginSnapshot {
    pub margin_ratio: f64,
    pub is_liquidating: bool,
    pub reduce_only: bool,
}

/// Freshness state of the realtime bus (§4.6, §5 fail-closed timers). `last_event_at = None`
/// means no event has ever been observed, which is treated as maximally stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsHealth {
    pub last_event_at: Option<DateTime<Utc>>,
}

impl WsHealth {
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.last_event_at {
            None => true,
            Some(last) => {
                let age = now.signed_duration_since(last);
                age.to_std().map(|d| d > threshold).unwrap_or(true)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GlobalRiskDenial {
    #[error("ws_unhealthy")]
    WsUnhealthy,
    #[error("blocked_by_risk")]
    DailyLossBudgetExceeded,
    #[error("blocked_by_risk")]
    Liquidating,
    #[error("blocked_by_risk")]
    ReduceOnly,
}

impl GlobalRiskDenial {
    /// The short machine-readable reason carried back to the caller (§7).
    pub fn code(&self) -> &'static str {
        match self {
            GlobalRiskDenial::WsUnhealthy => "ws_unhealthy",
            GlobalRiskDenial::DailyLossBudgetExceeded
            | GlobalRiskDenial::Liquidating
            | GlobalRiskDenial::ReduceOnly => "blocked_by_risk",
        }
    }
}

/// Default realtime-bus staleness threshold before the view fails closed (§4.6, §5).
pub const DEFAULT_WS_STALE_THRESHOLD: Duration = Duration::from_secs(30);

/// Consulted first by C6 when `global_risk_view` is enabled (§4.6). Position-closing signals
/// always bypass every check here — only new entries can be denied (§4.6, §8 Panic-latch
/// invariant applies the same "closes always pass" shape).
pub struct GlobalRiskView {
    daily_loss: Arc<DailyLossTracker>,
    ws_health: RwLock<WsHealth>,
    margin: RwLock<AccountMarginSnapshot>,
    ws_stale_threshold: Duration,
}

impl GlobalRiskView {
    pub fn new(daily_loss: Arc<DailyLossTracker>) -> Self {
        Self {
            daily_loss,
            ws_health: RwLock::new(WsHealth::default()),
            margin: RwLock::new(AccountMarginSnapshot::default()),
            ws_stale_threshold: DEFAULT_WS_STALE_THRESHOLD,
        }
    }

    pub fn record_ws_event(&self, at: DateTime<Utc>) {
        self.ws_health.write().last_event_at = Some(at);
    }

    pub fn update_margin(&self, snapshot: AccountMarginSnapshot) {
        *self.margin.write() = snapshot;
    }

    /// `is_closing` signals (flattening an existing position) always pass (§4.6).
    pub fn evaluate(&self, now_utc: DateTime<Utc>, now_local: DateTime<Local>, is_closing: bool) -> Result<(), GlobalRiskDenial> {
        if is_closing {
            return Ok(());
        }
        if self.ws_health.read().is_stale(now_utc, self.ws_stale_threshold) {
            return Err(GlobalRiskDenial::WsUnhealthy);
        }
        if self.daily_loss.budget_exceeded(now_local) {
            return Err(GlobalRiskDenial::DailyLossBudgetExceeded);
        }
        let margin = *self.margin.read();
        if margin.is_liquidating {
            return Err(GlobalRiskDenial::Liquidating);
        }
        if margin.reduce_only {
            return Err(GlobalRiskDenial::ReduceOnly);
        }
        Ok(())
    }
}
