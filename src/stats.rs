//! Lock-free statistics accumulator.
//!
//! Every counter is an independent atomic; there is no cross-counter
//! serialisation, so readers may observe transient skew between, say,
//! `total_trade_count` and `total_notional` but never a lost update on
//! any single counter.

use crate::order::Trade;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// `total_notional`/`daily_notional` are kept as a fixed-point `i64`
/// (ticks × quantity, saturating) rather than floating point, matching
/// the tick-native prices carried by [`crate::order::Order`].
#[derive(Default)]
pub struct StatsAccumulator {
    daily_trade_count: AtomicU64,
    daily_notional: AtomicI64,
    total_trade_count: AtomicU64,
    total_notional: AtomicI64,
    matching_attempts: AtomicU64,
    successful_matches: AtomicU64,
    last_daily_reset_ts: Mutex<Option<SystemTime>>,
}

/// Point-in-time read of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub daily_trade_count: u64,
    pub daily_notional: i64,
    pub total_trade_count: u64,
    pub total_notional: i64,
    pub matching_attempts: u64,
    pub successful_matches: u64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        let acc = Self::default();
        *acc.last_daily_reset_ts.lock() = Some(SystemTime::now());
        acc
    }

    /// Applies one produced trade: bumps trade counts and notional,
    /// daily and lifetime, and `successful_matches`.
    pub fn record_trade(&self, trade: &Trade) {
        let notional = trade.notional().clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        self.daily_trade_count.fetch_add(1, Ordering::Relaxed);
        self.daily_notional.fetch_add(notional, Ordering::Relaxed);
        self.total_trade_count.fetch_add(1, Ordering::Relaxed);
        self.total_notional.fetch_add(notional, Ordering::Relaxed);
        self.successful_matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments `matching_attempts`. Called once per background
    /// sweep, regardless of how many trades (if any) it produced.
    pub fn record_matching_attempt(&self) {
        self.matching_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// `true` once `now - last_daily_reset_ts >= interval`.
    pub fn daily_reset_due(&self, interval: std::time::Duration) -> bool {
        let last = (*self.last_daily_reset_ts.lock()).unwrap_or(UNIX_EPOCH);
        SystemTime::now().duration_since(last).unwrap_or_default() >= interval
    }

    /// Zeroes the daily fields and the per-window attempt/success
    /// counters, and stamps `last_daily_reset_ts = now`. Lifetime
    /// counters (`total_trade_count`, `total_notional`) are untouched.
    pub fn reset_daily(&self) {
        self.daily_trade_count.store(0, Ordering::Relaxed);
        self.daily_notional.store(0, Ordering::Relaxed);
        self.matching_attempts.store(0, Ordering::Relaxed);
        self.successful_matches.store(0, Ordering::Relaxed);
        *self.last_daily_reset_ts.lock() = Some(SystemTime::now());
    }

    /// Zeroes every counter, daily and lifetime alike, and stamps
    /// `last_daily_reset_ts = now`. Called by the engine on `start()`,
    /// so a restart after `stop()` never carries over stale lifetime
    /// statistics from a previous run.
    pub fn reset(&self) {
        self.total_trade_count.store(0, Ordering::Relaxed);
        self.total_notional.store(0, Ordering::Relaxed);
        self.reset_daily();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            daily_trade_count: self.daily_trade_count.load(Ordering::Relaxed),
            daily_notional: self.daily_notional.load(Ordering::Relaxed),
            total_trade_count: self.total_trade_count.load(Ordering::Relaxed),
            total_notional: self.total_notional.load(Ordering::Relaxed),
            matching_attempts: self.matching_attempts.load(Ordering::Relaxed),
            successful_matches: self.successful_matches.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Trade;
    use chrono::Utc;

    fn trade(price: i64, qty: u64) -> Trade {
        Trade {
            trade_id: 1,
            buy_order_id: 1,
            sell_order_id: 2,
            market_code: "XPAR".to_string(),
            currency: "EUR".to_string(),
            price,
            quantity: qty,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn record_trade_updates_both_daily_and_lifetime_counters() {
        let stats = StatsAccumulator::new();
        stats.record_trade(&trade(14800, 200));
        let snap = stats.snapshot();
        assert_eq!(snap.daily_trade_count, 1);
        assert_eq!(snap.total_trade_count, 1);
        assert_eq!(snap.daily_notional, 14800 * 200);
        assert_eq!(snap.total_notional, 14800 * 200);
        assert_eq!(snap.successful_matches, 1);
    }

    #[test]
    fn matching_attempts_counts_sweeps_not_trades() {
        let stats = StatsAccumulator::new();
        stats.record_matching_attempt();
        stats.record_matching_attempt();
        stats.record_trade(&trade(100, 1));
        let snap = stats.snapshot();
        assert_eq!(snap.matching_attempts, 2);
        assert_eq!(snap.successful_matches, 1);
    }

    #[test]
    fn reset_daily_zeroes_daily_and_window_counters_but_not_lifetime_p8() {
        let stats = StatsAccumulator::new();
        stats.record_matching_attempt();
        stats.record_trade(&trade(100, 10));
        stats.reset_daily();
        let snap = stats.snapshot();
        assert_eq!(snap.daily_trade_count, 0);
        assert_eq!(snap.daily_notional, 0);
        assert_eq!(snap.matching_attempts, 0);
        assert_eq!(snap.successful_matches, 0);
        assert_eq!(snap.total_trade_count, 1);
        assert_eq!(snap.total_notional, 1000);
    }

    #[test]
    fn reset_zeroes_every_counter_including_lifetime() {
        let stats = StatsAccumulator::new();
        stats.record_matching_attempt();
        stats.record_trade(&trade(100, 10));
        stats.reset();
        let snap = stats.snapshot();
        assert_eq!(snap.daily_trade_count, 0);
        assert_eq!(snap.daily_notional, 0);
        assert_eq!(snap.matching_attempts, 0);
        assert_eq!(snap.successful_matches, 0);
        assert_eq!(snap.total_trade_count, 0);
        assert_eq!(snap.total_notional, 0);
    }

    #[test]
    fn daily_reset_due_after_interval_elapses() {
        let stats = StatsAccumulator::new();
        assert!(!stats.daily_reset_due(std::time::Duration::from_secs(3600)));
        assert!(stats.daily_reset_due(std::time::Duration::from_nanos(0)));
    }
}
