use chrono::{DateTime, Local, NaiveDate};
use parking_lot::Mutex;
use rust_decimal::Decimal;

struct State {
    day: NaiveDate,
    realized_today: Decimal,
}

/// The single canonical daily-loss tracker consulted by both C6 (per-signal risk check) and
/// the global risk view (§4.11). Rollover is midnight **local** time, not UTC (§4.11) — a
/// deliberate choice so the daily budget lines up with the operator's trading day.
pub struct DailyLossTracker {
    limit_usdt: Decimal,
    state: Mutex<State>,
}

impl DailyLossTracker {
    pub fn new(limit_usdt: Decimal, now: DateTime<Local>) -> Self {
        Self {
            limit_usdt,
            state: Mutex::new(State { day: now.date_naive(), realized_today: Decimal::ZERO }),
        }
    }

    fn rollover_if_needed(&self, state: &mut State, now: DateTime<Local>) {
        let today = now.date_naive();
        if state.day != today {
            state.day = today;
            state.realized_today = Decimal::ZERO;
        }
    }

    /// Record a realized PnL delta (negative for a loss) against today's budget.
    pub fn record_pnl(&self, pnl_usdt: Decimal, now: DateTime<Local>) {
        let mut state = self.state.lock();
        self.rollover_if_needed(&mut state, now);
        state.realized_today += pnl_usdt;
    }

    /// Realized loss booked so far today, expressed as a non-negative number (zero if the day
    /// is net positive).
    pub fn realized_loss_today(&self, now: DateTime<Local>) -> Decimal {
        let mut state = self.state.lock();
        self.rollover_if_needed(&mut state, now);
        (-state.realized_today).max(Decimal::ZERO)
    }

    pub fn budget_exceeded(&self, now: DateTime<Local>) -> bool {
        self.realized_loss_today(now) >= self.limit_usdt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 7, 28, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_budget_exceeded_after_losses() {
        let tracker = DailyLossTracker::new(dec!(100), at(9));
        tracker.record_pnl(dec!(-60), at(10));
        assert!(!tracker.budget_exceeded(at(10)));
        tracker.record_pnl(dec!(-50), at(11));
        assert!(tracker.budget_exceeded(at(11)));
    }

    #[test]
    fn test_profit_does_not_count_as_loss() {
        let tracker = DailyLossTracker::new(dec!(100), at(9));
        tracker.record_pnl(dec!(500), at(10));
        assert_eq!(tracker.realized_loss_today(at(10)), Decimal::ZERO);
    }

    #[test]
    fn test_rollover_resets_budget_next_day() {
        let tracker = DailyLossTracker::new(dec!(100), at(9));
        tracker.record_pnl(dec!(-100), at(23));
        assert!(tracker.budget_exceeded(at(23)));
        let next_day = at(9) + chrono::Duration::days(1);
        assert!(!tracker.budget_exceeded(next_day));
    }
}
